//! Validates one table: expected rows, actual rows and rules in, report out

use crate::column::{ColumnContext, DEFAULT_TIME_REGEX};
use crate::constraints::{check_retry_counts, check_unique_constraints};
use crate::row_matcher::RowMatcher;
use regex::Regex;
use rowrefly_core::{
    fixture_rows, CheckCode, ColumnResult, GlobalErrorKind, MatchingConfig, ReportBuilder, RetryExpectation, Row,
    TableSchema, ValidationReport, Value,
};

/// Defaults applied where a schema is silent
#[derive(Debug, Clone)]
pub struct ValidatorOptions {
    /// Pattern for `time` columns without their own `timePattern`
    pub time_pattern: Regex,

    /// Retry grouping column for tables that declare none
    pub operation_column: String,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            time_pattern: (*DEFAULT_TIME_REGEX).clone(),
            operation_column: "operation".to_string(),
        }
    }
}

impl ValidatorOptions {
    pub fn from_config(matching: &MatchingConfig) -> Result<Self, regex::Error> {
        let time_pattern = match &matching.time_pattern {
            Some(pattern) => Regex::new(pattern)?,
            None => (*DEFAULT_TIME_REGEX).clone(),
        };
        Ok(Self {
            time_pattern,
            operation_column: matching.operation_column.clone(),
        })
    }
}

/// Inputs for validating one table
#[derive(Debug, Clone, Copy)]
pub struct TableCheck<'a> {
    pub table: &'a str,
    pub scenario: Option<&'a str>,
    /// `None` when no schema is registered for the table
    pub schema: Option<&'a TableSchema>,
    pub expected: &'a [Row],
    pub actual: &'a [Row],
    pub retries: &'a [RetryExpectation],
}

impl<'a> TableCheck<'a> {
    pub fn new(table: &'a str, schema: Option<&'a TableSchema>, expected: &'a [Row], actual: &'a [Row]) -> Self {
        Self {
            table,
            scenario: None,
            schema,
            expected,
            actual,
            retries: &[],
        }
    }

    pub fn with_scenario(mut self, scenario: &'a str) -> Self {
        self.scenario = Some(scenario);
        self
    }

    pub fn with_retries(mut self, retries: &'a [RetryExpectation]) -> Self {
        self.retries = retries;
        self
    }
}

/// Table validator
///
/// Stateless apart from its options; one instance can validate any number
/// of tables, concurrently.
#[derive(Debug, Clone, Default)]
pub struct TableValidator {
    options: ValidatorOptions,
}

impl TableValidator {
    pub fn new(options: ValidatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validate one table
    ///
    /// Field and row failures never stop the pass: every declared column of
    /// every row is checked. Only a missing or conflicting schema
    /// short-circuits.
    pub fn validate(&self, check: &TableCheck<'_>) -> ValidationReport {
        let mut report = self.report_builder(check);

        let Some(schema) = check.schema else {
            tracing::warn!(table = check.table, "no schema registered");
            report.global_error(
                GlobalErrorKind::SchemaMissing,
                format!("Schema not found for table {}", check.table),
            );
            return report.finalize();
        };

        let conflicts = schema.conflicts();
        if !conflicts.is_empty() {
            let details: Vec<String> = conflicts.iter().map(ToString::to_string).collect();
            report.global_error(
                GlobalErrorKind::SchemaConflict,
                format!("Schema conflict: {}", details.join("; ")),
            );
            return report.finalize();
        }

        tracing::debug!(
            table = check.table,
            expected = check.expected.len(),
            actual = check.actual.len(),
            "validating table"
        );

        if !check.retries.is_empty() {
            let column = schema.operation_column(&self.options.operation_column);
            report.extend(check_retry_counts(check.actual, column, check.retries));
        }
        report.extend(check_unique_constraints(check.actual, &schema.unique_constraints));

        if check.expected.len() != check.actual.len() {
            tracing::warn!(
                table = check.table,
                expected = check.expected.len(),
                actual = check.actual.len(),
                "row count mismatch"
            );
            report.global_error(
                GlobalErrorKind::RowCountMismatch,
                format!(
                    "Row count mismatch. expected={} actual={}",
                    check.expected.len(),
                    check.actual.len()
                ),
            );
        }

        let columns = ColumnContext::new(check.table, schema, &self.options.time_pattern);

        match RowMatcher::from_schema(schema) {
            Some(matcher) => self.compare_matched(&mut report, &columns, &matcher, check),
            None => {
                for (expected, actual) in check.expected.iter().zip(check.actual) {
                    compare_row(&mut report, &columns, schema, expected, actual);
                }
            }
        }

        let report = report.finalize();
        tracing::debug!(table = check.table, status = %report.status, results = report.results.len(), "table validated");
        report
    }

    /// Validate against an expected fixture document
    ///
    /// A document that is not an array of row objects is a blocking error.
    pub fn validate_fixture(&self, check: &TableCheck<'_>, expected: &Value) -> ValidationReport {
        match fixture_rows(expected) {
            Some(rows) => self.validate(&TableCheck { expected: &rows, ..*check }),
            None => {
                let mut report = self.report_builder(check);
                report.global_error(
                    GlobalErrorKind::FixtureMalformed,
                    format!("Expected JSON must be an array for table {}", check.table),
                );
                report.finalize()
            }
        }
    }

    fn report_builder(&self, check: &TableCheck<'_>) -> ReportBuilder {
        let report = ReportBuilder::new(check.table);
        match check.scenario {
            Some(scenario) => report.with_scenario(scenario),
            None => report,
        }
    }

    fn compare_matched(
        &self,
        report: &mut ReportBuilder,
        columns: &ColumnContext<'_>,
        matcher: &RowMatcher<'_>,
        check: &TableCheck<'_>,
    ) {
        let mut matched = vec![false; check.expected.len()];

        for actual in check.actual {
            match matcher.find(actual, check.expected) {
                Some((index, expected)) => {
                    matched[index] = true;
                    compare_row(report, columns, columns.schema, expected, actual);
                }
                None => {
                    tracing::debug!(table = check.table, key = %matcher.describe_key(actual), "unmatched actual row");
                    report.push(
                        ColumnResult::fail(CheckCode::RowMatch, matcher.primary(), "No expected row matches actual row")
                            .with_actual(matcher.describe_key(actual)),
                    );
                }
            }
        }

        for (expected, _) in check.expected.iter().zip(&matched).filter(|(_, found)| !**found) {
            report.push(
                ColumnResult::fail(CheckCode::RowMatch, matcher.primary(), "Expected row not found in actual")
                    .with_expected(matcher.describe_key(expected)),
            );
        }
    }
}

fn compare_row(
    report: &mut ReportBuilder,
    columns: &ColumnContext<'_>,
    schema: &TableSchema,
    expected: &Row,
    actual: &Row,
) {
    for column in schema.checked_columns(expected) {
        report.extend(columns.check(&column, expected, actual));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rowrefly_core::{CheckStatus, ReportStatus};

    fn rows(json: &str) -> Vec<Row> {
        fixture_rows(&Value::parse_json(json).unwrap()).unwrap()
    }

    #[test]
    fn missing_schema_is_global() {
        let expected = rows(r#"[{"id": 1}]"#);
        let report = TableValidator::default().validate(&TableCheck::new("orders", None, &expected, &expected));
        assert_eq!(report.status, ReportStatus::Fail);
        assert_eq!(report.global_errors[0].kind, GlobalErrorKind::SchemaMissing);
        assert!(report.results.is_empty());
    }

    #[test]
    fn conflicting_schema_short_circuits() {
        let schema: TableSchema =
            serde_json::from_str(r#"{"mandatoryColumns": ["payload"], "jsonColumns": {"payload": {}}}"#).unwrap();
        let expected = rows(r#"[{"payload": "{}"}]"#);
        let report = TableValidator::default().validate(&TableCheck::new("orders", Some(&schema), &expected, &expected));
        assert_eq!(report.global_errors[0].kind, GlobalErrorKind::SchemaConflict);
        assert!(report.global_errors[0].message.contains("payload"));
        assert!(report.results.is_empty());
    }

    #[test]
    fn positional_pairing_without_primary_lookup() {
        let schema = TableSchema::default();
        let expected = rows(r#"[{"id": 1, "status": "NEW"}, {"id": 2, "status": "PAID"}]"#);
        let actual = rows(r#"[{"id": 1, "status": "NEW"}, {"id": 2, "status": "LOST"}]"#);

        let report = TableValidator::default().validate(&TableCheck::new("orders", Some(&schema), &expected, &actual));
        assert_eq!(report.status, ReportStatus::Fail);
        assert_eq!(report.count(CheckStatus::Pass), 3);
        assert_eq!(report.failures().next().map(|r| r.column.as_str()), Some("status"));
    }

    #[test]
    fn unmatched_rows_on_both_sides() {
        let schema = TableSchema::default().with_primary_lookup("id");
        let expected = rows(r#"[{"id": 1}, {"id": 2}]"#);
        let actual = rows(r#"[{"id": 1}, {"id": 3}]"#);

        let report = TableValidator::default().validate(&TableCheck::new("orders", Some(&schema), &expected, &actual));
        let row_matches: Vec<&ColumnResult> = report.results.iter().filter(|r| r.code == CheckCode::RowMatch).collect();
        assert_eq!(row_matches.len(), 2);
        assert_eq!(row_matches[0].actual.as_deref(), Some("id=3"));
        assert_eq!(row_matches[1].reason.as_deref(), Some("Expected row not found in actual"));
        assert_eq!(row_matches[1].expected.as_deref(), Some("id=2"));
    }

    #[test]
    fn malformed_fixture_is_global() {
        let actual = rows(r#"[{"id": 1}]"#);
        let schema = TableSchema::default();
        let report = TableValidator::default().validate_fixture(
            &TableCheck::new("orders", Some(&schema), &[], &actual),
            &Value::parse_json(r#"{"id": 1}"#).unwrap(),
        );
        assert_eq!(report.global_errors[0].message, "Expected JSON must be an array for table orders");
    }

    #[test]
    fn options_from_config() {
        let matching = MatchingConfig {
            time_pattern: Some(r"^\d{2}:\d{2}$".to_string()),
            operation_column: "action".to_string(),
        };
        let options = ValidatorOptions::from_config(&matching).unwrap();
        assert!(options.time_pattern.is_match("10:30"));
        assert_eq!(options.operation_column, "action");
    }
}
