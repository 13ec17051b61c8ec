//! Integration tests for the validation engine
//!
//! Covers the end-to-end table checks and the suite runner over an
//! in-memory row source.
//!
//! ```bash
//! cargo test -p rowrefly-engine --test integration_tests
//! ```

use pretty_assertions::assert_eq;
use rowrefly_core::{
    fixture_rows, CaseStatus, CheckCode, CheckStatus, ColumnRule, ExpectedSet, GlobalErrorKind, JsonValidateMode,
    LookupConfig, ReportStatus, RetryExpectation, Row, Scenario, SchemaRegistry, SkipRules, TableExpectation, TableSchema,
    ValidationReport, Value,
};
use rowrefly_engine::{FetchPolicy, SuiteRunner, TableCheck, TableValidator};
use rowrefly_source::{FetchError, MemoryRowSource};
use std::sync::Arc;
use std::time::Duration;

fn rows(json: &str) -> Vec<Row> {
    fixture_rows(&Value::parse_json(json).unwrap()).unwrap()
}

fn validate(schema: &TableSchema, expected: &[Row], actual: &[Row]) -> ValidationReport {
    TableValidator::default().validate(&TableCheck::new("orders", Some(schema), expected, actual))
}

fn failures(report: &ValidationReport) -> Vec<(String, Option<String>)> {
    report.failures().map(|r| (r.column.clone(), r.reason.clone())).collect()
}

// =============================================================================
// Table validation
// =============================================================================

#[test]
fn null_expected_matches_absent_actual() {
    let report = validate(
        &TableSchema::default(),
        &rows(r#"[{"status": null}]"#),
        &rows(r#"[{"other": 1}]"#),
    );
    assert_eq!(report.status, ReportStatus::Pass);
    assert_eq!(report.results[0].status, CheckStatus::Pass);
}

#[test]
fn numeric_text_matches_number() {
    let report = validate(
        &TableSchema::default(),
        &rows(r#"[{"amount": "100.00"}]"#),
        &rows(r#"[{"amount": 100}]"#),
    );
    assert_eq!(report.status, ReportStatus::Pass);
}

#[test]
fn missing_required_json_path_fails_once() {
    let schema = TableSchema::default()
        .with_primary_lookup("order_id")
        .with_column_rule("order", ColumnRule::json().with_required_paths(["items[0].sku"]));
    let expected = rows(r#"[{"order_id": 1, "order": {"id": 7, "items": [{"sku": "A-1", "qty": 2}]}}]"#);
    let actual = rows(r#"[{"order_id": 1, "order": "{\"id\": 7, \"items\": [{\"qty\": 2}]}"}]"#);

    let report = validate(&schema, &expected, &actual);
    assert_eq!(report.status, ReportStatus::Fail);
    assert_eq!(
        failures(&report),
        vec![("order.items[0].sku".to_string(), Some("Required JSON path missing".to_string()))]
    );
}

#[test]
fn duplicate_composite_key_reported_once() {
    let schema = TableSchema::default().with_unique_constraint(["order_id", "line_no"]);
    let lines = rows(
        r#"[
            {"order_id": 42, "line_no": 1},
            {"order_id": 42, "line_no": 2},
            {"order_id": 42, "line_no": 1}
        ]"#,
    );

    let report = validate(&schema, &lines, &lines);
    let unique: Vec<_> = report.results.iter().filter(|r| r.code == CheckCode::UniqueConstraint).collect();
    assert_eq!(unique.len(), 1);
    assert_eq!(unique[0].actual.as_deref(), Some("[42, 1]"));
    assert_eq!(report.status, ReportStatus::Fail);
}

#[test]
fn retry_count_above_expectation_fails() {
    let schema = TableSchema::default().with_primary_lookup("attempt");
    let attempts = rows(
        r#"[
            {"attempt": 1, "operation": "RETRY"},
            {"attempt": 2, "operation": "RETRY"},
            {"attempt": 3, "operation": "RETRY"}
        ]"#,
    );
    let retries = vec![RetryExpectation {
        operation: "RETRY".to_string(),
        count: 2,
    }];

    let check = TableCheck::new("orders", Some(&schema), &attempts, &attempts).with_retries(&retries);
    let report = TableValidator::default().validate(&check);

    let retry = report.results.iter().find(|r| r.code == CheckCode::RetryCount).unwrap();
    assert_eq!(retry.status, CheckStatus::Fail);
    assert_eq!(retry.reason.as_deref(), Some("RETRY_COUNT"));
    assert_eq!(retry.expected.as_deref(), Some("2"));
    assert_eq!(retry.actual.as_deref(), Some("3"));
}

#[test]
fn row_count_mismatch_fails_even_when_rows_match() {
    let schema = TableSchema::default().with_primary_lookup("id");
    let expected = rows(r#"[{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}, {"id": 5}]"#);
    let actual = rows(r#"[{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}]"#);

    let report = validate(&schema, &expected, &actual);
    assert_eq!(report.status, ReportStatus::Fail);
    assert_eq!(report.global_errors[0].kind, GlobalErrorKind::RowCountMismatch);
    assert_eq!(report.global_errors[0].message, "Row count mismatch. expected=5 actual=4");

    // Every actual row still gets compared
    let matched = report.results.iter().filter(|r| r.code == CheckCode::ValueMatch).count();
    assert_eq!(matched, 4);
    assert!(report.results.iter().all(|r| r.code != CheckCode::ValueMatch || !r.is_fail()));
}

#[test]
fn all_columns_checked_despite_failures() {
    let expected = rows(r#"[{"a": 1, "b": 2, "c": 3}]"#);
    let actual = rows(r#"[{"a": 9, "b": 2, "c": 9}]"#);

    let report = validate(&TableSchema::default(), &expected, &actual);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.count(CheckStatus::Fail), 2);
}

#[test]
fn declared_columns_limit_the_check() {
    let schema: TableSchema = serde_json::from_str(
        r#"{"primaryLookup": "id", "mandatoryColumns": ["id", "status"], "generatedColumns": ["created_at"]}"#,
    )
    .unwrap();
    let expected = rows(r#"[{"id": 1, "status": "NEW", "created_at": "x", "noise": "a"}]"#);
    let actual = rows(r#"[{"id": 1, "status": "NEW", "created_at": "2024-01-01 00:00:00", "noise": "b"}]"#);

    let report = validate(&schema, &expected, &actual);
    assert_eq!(report.status, ReportStatus::Pass);
    let columns: Vec<&str> = report.results.iter().map(|r| r.column.as_str()).collect();
    assert_eq!(columns, vec!["id", "status", "created_at"]);
}

// =============================================================================
// JSON path comparator properties
// =============================================================================

#[test]
fn ignored_path_does_not_hide_siblings() {
    let schema = TableSchema::default().with_column_rule("payload", ColumnRule::json().with_ignore_paths(["meta.ts"]));
    let expected = rows(r#"[{"payload": {"meta": {"ts": 1, "other": "a"}}}]"#);
    let actual = rows(r#"[{"payload": {"meta": {"ts": 2, "other": "b"}}}]"#);

    let report = validate(&schema, &expected, &actual);
    assert_eq!(
        failures(&report),
        vec![("payload.meta.other".to_string(), Some("JSON value mismatch".to_string()))]
    );
    assert!(report
        .results
        .iter()
        .any(|r| r.column == "payload.meta.ts" && r.status == CheckStatus::Skipped));
}

#[test]
fn required_only_mode_ignores_undeclared_changes() {
    let schema = TableSchema::default().with_column_rule(
        "payload",
        ColumnRule::json()
            .with_required_paths(["customer.id"])
            .with_mode(JsonValidateMode::RequiredOnly),
    );
    let expected = rows(r#"[{"payload": {"customer": {"id": 5, "name": "Ann"}, "total": 10}}]"#);
    let actual = rows(r#"[{"payload": {"customer": {"id": 5, "name": "Bob"}, "total": 99, "extra": true}}]"#);

    let report = validate(&schema, &expected, &actual);
    assert_eq!(report.status, ReportStatus::Pass);
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].column, "payload.customer.id");
}

#[test]
fn array_size_mismatch_only_fails_when_required() {
    let expected = rows(r#"[{"payload": {"tags": ["a", "b"], "id": 1}}]"#);
    let actual = rows(r#"[{"payload": {"tags": ["a"], "id": 1}}]"#);

    let optional = TableSchema::default().with_column_rule("payload", ColumnRule::json().with_required_paths(["id"]));
    let report = validate(&optional, &expected, &actual);
    assert_eq!(report.status, ReportStatus::Pass);
    assert!(report
        .results
        .iter()
        .any(|r| r.code == CheckCode::JsonArraySize && r.status == CheckStatus::Skipped));

    let required = TableSchema::default().with_column_rule("payload", ColumnRule::json().with_required_paths(["tags"]));
    let report = validate(&required, &expected, &actual);
    let size = report.results.iter().find(|r| r.code == CheckCode::JsonArraySize).unwrap();
    assert_eq!(size.status, CheckStatus::Fail);
    assert_eq!(size.expected.as_deref(), Some("array size=2"));
    assert_eq!(size.actual.as_deref(), Some("array size=1"));
}

#[test]
fn malformed_actual_json_fails() {
    let schema = TableSchema::default().with_column_rule("payload", ColumnRule::json());
    let report = validate(
        &schema,
        &rows(r#"[{"payload": {"a": 1}}]"#),
        &rows(r#"[{"payload": "{not json"}]"#),
    );
    assert_eq!(report.results[0].code, CheckCode::JsonInvalid);
    assert_eq!(report.status, ReportStatus::Fail);
}

#[test]
fn validation_leaves_inputs_untouched() {
    let schema = TableSchema::default().with_column_rule("payload", ColumnRule::json().with_ignore_paths(["ts"]));
    let expected = rows(r#"[{"payload": {"ts": 1, "a": 1}}]"#);
    let actual = rows(r#"[{"payload": {"ts": 2, "a": 1}}]"#);
    let (expected_before, actual_before) = (expected.clone(), actual.clone());

    validate(&schema, &expected, &actual);
    assert_eq!(expected, expected_before);
    assert_eq!(actual, actual_before);
}

// =============================================================================
// Suite runner
// =============================================================================

fn order_registry() -> Arc<SchemaRegistry> {
    let registry = SchemaRegistry::builder()
        .with_table("orders", TableSchema::default().with_primary_lookup("order_id"))
        .with_table("audit", TableSchema::default())
        .build()
        .unwrap();
    Arc::new(registry)
}

fn order_fixtures() -> Arc<ExpectedSet> {
    let expected = ExpectedSet::new().with_rows(
        "orders",
        rows(
            r#"[
                {"order_id": 42, "status": "NEW"},
                {"order_id": 43, "status": "PAID"}
            ]"#,
        ),
    );
    Arc::new(expected)
}

fn fast_policy() -> FetchPolicy {
    FetchPolicy {
        timeout: Duration::from_millis(500),
        interval: Duration::from_millis(5),
    }
}

#[tokio::test]
async fn suite_waits_for_rows_to_land() {
    let source = MemoryRowSource::new();
    source.add_rows("orders", rows(r#"[{"order_id": 42, "status": "NEW"}]"#)).await;
    source.delay_visibility("orders", 2).await;

    let runner = SuiteRunner::new(order_registry(), order_fixtures(), Arc::new(source.clone())).with_policy(fast_policy());
    let scenario = Scenario::new("TC-1").with_lookup("order_id", 42).with_table("orders");

    let report = runner.run(&[scenario]).await;
    assert_eq!(report.cases[0].status, CaseStatus::Pass);
    assert!(source.fetch_count() >= 3);

    // Only the scenario's expected row is compared
    let orders = &report.cases[0].tables[0];
    assert!(orders.global_errors.is_empty());
    assert_eq!(orders.results.len(), 2);
}

#[tokio::test]
async fn suite_reports_mismatches_and_summary() {
    let source = MemoryRowSource::new();
    source.add_rows("orders", rows(r#"[{"order_id": 43, "status": "LOST"}]"#)).await;

    let runner = SuiteRunner::new(order_registry(), order_fixtures(), Arc::new(source)).with_policy(fast_policy());
    let scenario = Scenario::new("TC-2").with_lookup("order_id", 43).with_table("orders");

    let report = runner.run(&[scenario]).await;
    assert!(report.has_failures());
    assert_eq!(report.summary.cases_failed, 1);
    assert_eq!(report.summary.tables_failed, 1);
    assert_eq!(report.summary.failures, vec!["orders.status".to_string()]);
}

#[tokio::test]
async fn suite_presence_only_tables_are_skipped_when_passing() {
    let source = MemoryRowSource::new();
    source.add_rows("audit", rows(r#"[{"order_id": 42}]"#)).await;

    let runner = SuiteRunner::new(order_registry(), order_fixtures(), Arc::new(source)).with_policy(fast_policy());
    let mut scenario = Scenario::new("TC-3").with_lookup("order_id", 42);
    scenario.table_expectations.insert("audit".to_string(), TableExpectation::Persist);
    scenario.table_expectations.insert("refunds".to_string(), TableExpectation::NotPersist);

    let report = runner.run(&[scenario]).await;
    let case = &report.cases[0];
    assert_eq!(case.status, CaseStatus::Skipped);
    assert_eq!(case.tables.len(), 2);
    assert!(case.tables.iter().all(|t| t.presence_only && t.is_pass()));
    assert_eq!(case.tables[0].results[0].code, CheckCode::Persistence);
    assert_eq!(report.summary.tables_skipped, 2);
}

#[tokio::test]
async fn suite_missing_rows_fail_persistence() {
    let runner = SuiteRunner::new(order_registry(), order_fixtures(), Arc::new(MemoryRowSource::new()))
        .with_policy(FetchPolicy::immediate());
    let mut scenario = Scenario::new("TC-4").with_lookup("order_id", 42);
    scenario.table_expectations.insert("audit".to_string(), TableExpectation::Persist);

    let report = runner.run(&[scenario]).await;
    assert_eq!(report.cases[0].status, CaseStatus::Fail);
    assert_eq!(report.cases[0].tables[0].results[0].actual.as_deref(), Some("rows=0"));
}

#[tokio::test]
async fn suite_global_errors() {
    let source = MemoryRowSource::new();
    source
        .add_error_for_table("orders", FetchError::ConnectionError("refused".to_string()))
        .await;

    let runner = SuiteRunner::new(order_registry(), order_fixtures(), Arc::new(source)).with_policy(fast_policy());
    let scenario = Scenario::new("TC-5")
        .with_lookup("order_id", 42)
        .with_table("orders")
        .with_table("audit")
        .with_table("ghost");

    let report = runner.run(&[scenario]).await;
    let kinds: Vec<GlobalErrorKind> = report.cases[0]
        .tables
        .iter()
        .map(|t| t.global_errors[0].kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            GlobalErrorKind::FetchFailed,
            GlobalErrorKind::FixtureMissing,
            GlobalErrorKind::SchemaMissing,
        ]
    );
}

#[tokio::test]
async fn suite_refuses_to_fetch_without_lookup_values() {
    let source = MemoryRowSource::new();
    source
        .add_rows(
            "orders",
            rows(r#"[{"order_id": 42, "status": "NEW"}, {"order_id": 43, "status": "PAID"}, {"order_id": 99, "status": "NEW"}]"#),
        )
        .await;

    let runner = SuiteRunner::new(order_registry(), order_fixtures(), Arc::new(source.clone())).with_policy(fast_policy());
    // Lookup id recorded for a column the table does not use
    let scenario = Scenario::new("TC-8").with_lookup("event_id", "e-1").with_table("orders");

    let case = runner.run_scenario(&scenario).await;
    let orders = &case.tables[0];
    assert_eq!(orders.status, ReportStatus::Fail);
    assert_eq!(orders.global_errors.len(), 1);
    assert_eq!(orders.global_errors[0].kind, GlobalErrorKind::FetchFailed);
    assert!(orders.global_errors[0]
        .message
        .contains("No lookup values available for table orders"));
    assert!(orders.results.is_empty());
    assert_eq!(source.fetch_count(), 0);
}

#[tokio::test]
async fn suite_fetches_by_lookup_file_columns() {
    let mut builder = SchemaRegistry::builder().with_table("orders", TableSchema::default().with_primary_lookup("order_id"));
    builder.insert_lookup(
        "orders",
        LookupConfig {
            id_column: Some("event_id".to_string()),
            order_id_column: None,
        },
    );
    let registry = Arc::new(builder.build().unwrap());

    let expected = ExpectedSet::new().with_rows(
        "orders",
        rows(
            r#"[
                {"event_id": "e-1", "order_id": 1, "status": "NEW"},
                {"event_id": "e-2", "order_id": 42, "status": "PAID"}
            ]"#,
        ),
    );
    let source = MemoryRowSource::new();
    source
        .add_rows(
            "orders",
            rows(
                r#"[
                    {"event_id": "e-1", "order_id": 1, "status": "NEW"},
                    {"event_id": "e-2", "order_id": 42, "status": "LOST"}
                ]"#,
            ),
        )
        .await;

    let runner = SuiteRunner::new(registry, Arc::new(expected), Arc::new(source)).with_policy(fast_policy());
    // The schema's primary column would select the mismatching order 42
    let scenario = Scenario::new("TC-9")
        .with_lookup("event_id", "e-1")
        .with_lookup("order_id", 42)
        .with_table("orders");

    let case = runner.run_scenario(&scenario).await;
    let orders = &case.tables[0];
    assert!(orders.global_errors.is_empty());
    assert_eq!(orders.status, ReportStatus::Pass);
    assert_eq!(orders.results.len(), 3);
}

#[tokio::test]
async fn suite_honours_skip_rules() {
    let runner = SuiteRunner::new(order_registry(), order_fixtures(), Arc::new(MemoryRowSource::new()))
        .with_policy(FetchPolicy::immediate())
        .with_skip(SkipRules {
            tables: vec!["aud*".to_string()],
        });
    let scenario = Scenario::new("TC-6").with_table("audit");

    let report = runner.run(&[scenario]).await;
    assert!(report.cases[0].tables.is_empty());
}

#[tokio::test]
async fn suite_concurrency_of_one_keeps_table_order() {
    let source = MemoryRowSource::new().with_latency(5);
    source.add_rows("orders", rows(r#"[{"order_id": 42, "status": "NEW"}]"#)).await;

    let runner = SuiteRunner::new(order_registry(), order_fixtures(), Arc::new(source))
        .with_policy(FetchPolicy::immediate())
        .with_concurrency(1);
    let mut scenario = Scenario::new("TC-7").with_lookup("order_id", 42).with_table("orders");
    scenario.table_expectations.insert("audit".to_string(), TableExpectation::NotPersist);

    let case = runner.run_scenario(&scenario).await;
    let tables: Vec<&str> = case.tables.iter().map(|t| t.table_name.as_str()).collect();
    assert_eq!(tables, vec!["orders", "audit"]);
    assert_eq!(case.status, CaseStatus::Pass);
}
