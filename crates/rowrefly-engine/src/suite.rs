//! Suite runner: scenarios in, [`SuiteReport`] out
//!
//! For every scenario table the runner resolves the lookup columns, polls the
//! [`RowSource`] until rows land (or the fetch policy gives up), narrows the
//! expected fixture to the scenario's lookup values and hands both row sets
//! to the [`TableValidator`]. Tables of one scenario run concurrently over
//! the shared, read-only registry.

use crate::constraints::check_persistence;
use crate::table_validator::{TableCheck, TableValidator};
use rowrefly_core::{
    fixture_rows, CaseReport, ExpectedSet, FetchConfig, GlobalErrorKind, LookupConfig, ReportBuilder, Row, Scenario,
    SchemaRegistry, SkipRules, SuiteReport, TableExpectation, ValidationReport,
};
use rowrefly_source::{FetchError, RowQuery, RowSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;

/// How long to wait for asynchronously written rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl FetchPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            interval: Duration::from_millis(config.interval_ms),
        }
    }

    /// Single fetch, no waiting
    pub fn immediate() -> Self {
        Self {
            timeout: Duration::ZERO,
            interval: Duration::ZERO,
        }
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

#[derive(Debug, Clone)]
enum TableJob {
    Compare(String),
    Presence(String, TableExpectation),
}

impl TableJob {
    fn table(&self) -> &str {
        match self {
            Self::Compare(table) | Self::Presence(table, _) => table,
        }
    }
}

/// Runs scenarios against a row source
#[derive(Clone)]
pub struct SuiteRunner {
    registry: Arc<SchemaRegistry>,
    expected: Arc<ExpectedSet>,
    source: Arc<dyn RowSource>,
    validator: Arc<TableValidator>,
    policy: FetchPolicy,
    concurrency: usize,
    skip: SkipRules,
}

impl SuiteRunner {
    pub fn new(registry: Arc<SchemaRegistry>, expected: Arc<ExpectedSet>, source: Arc<dyn RowSource>) -> Self {
        Self {
            registry,
            expected,
            source,
            validator: Arc::new(TableValidator::default()),
            policy: FetchPolicy::default(),
            concurrency: 4,
            skip: SkipRules::default(),
        }
    }

    pub fn with_validator(mut self, validator: TableValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Maximum tables validated at once per scenario (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_skip(mut self, skip: SkipRules) -> Self {
        self.skip = skip;
        self
    }

    /// Run every scenario in order
    pub async fn run(&self, scenarios: &[Scenario]) -> SuiteReport {
        let mut cases = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            cases.push(self.run_scenario(scenario).await);
        }

        let report = SuiteReport::from_cases(cases);
        tracing::info!(
            source = self.source.name(),
            cases = report.summary.cases,
            failed = report.summary.cases_failed,
            "suite finished"
        );
        report
    }

    /// Validate every table of one scenario
    ///
    /// Table reports come back in declaration order: compared tables first,
    /// then presence-only tables.
    pub async fn run_scenario(&self, scenario: &Scenario) -> CaseReport {
        tracing::info!(case = %scenario.label(), "running scenario");

        let jobs: Vec<TableJob> = scenario
            .expected_tables
            .iter()
            .map(|table| TableJob::Compare(table.clone()))
            .chain(
                scenario
                    .presence_only_tables()
                    .map(|(table, expectation)| TableJob::Presence(table.clone(), *expectation)),
            )
            .filter(|job| {
                let skipped = self.skip.is_table_skipped(job.table());
                if skipped {
                    tracing::debug!(table = job.table(), "table skipped by config");
                }
                !skipped
            })
            .collect();

        let scenario = Arc::new(scenario.clone());
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(jobs.len());

        for job in jobs {
            let runner = self.clone();
            let scenario = Arc::clone(&scenario);
            let permits = Arc::clone(&permits);
            let table = job.table().to_string();

            let handle = tokio::spawn(async move {
                // The semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                runner.run_job(&scenario, &job).await
            });
            handles.push((table, handle));
        }

        let mut tables = Vec::with_capacity(handles.len());
        for (table, handle) in handles {
            match handle.await {
                Ok(report) => tables.push(report),
                Err(e) => {
                    tracing::warn!(table = %table, error = %e, "validation task failed");
                    let mut report = ReportBuilder::new(&table).with_scenario(&scenario.test_case_id);
                    report.global_error(GlobalErrorKind::TaskFailed, format!("Validation task failed: {}", e));
                    tables.push(report.finalize());
                }
            }
        }

        let case = CaseReport::new(&scenario.test_case_id, &scenario.scenario_name, tables);
        tracing::info!(case = %scenario.label(), status = %case.status, "scenario finished");
        case
    }

    async fn run_job(&self, scenario: &Scenario, job: &TableJob) -> ValidationReport {
        match job {
            TableJob::Compare(table) => self.compare_table(scenario, table).await,
            TableJob::Presence(table, expectation) => self.check_presence(scenario, table, *expectation).await,
        }
    }

    async fn compare_table(&self, scenario: &Scenario, table: &str) -> ValidationReport {
        let Some(schema) = self.registry.table(table) else {
            let check = TableCheck::new(table, None, &[], &[]).with_scenario(&scenario.test_case_id);
            return self.validator.validate(&check);
        };

        let Some(document) = self.expected.get(table) else {
            tracing::warn!(table, "no expected fixture");
            let mut report = ReportBuilder::new(table).with_scenario(&scenario.test_case_id);
            report.global_error(
                GlobalErrorKind::FixtureMissing,
                format!("Expected fixture not found for table {}", table),
            );
            return report.finalize();
        };

        let expected_rows = fixture_rows(document);
        let query = match self.build_query(scenario, table, expected_rows.as_ref().and_then(|rows| rows.first())) {
            Ok(query) => query,
            Err(e) => return self.fetch_failed(scenario, table, table, e),
        };
        let actual = match self.fetch(&query).await {
            Ok(rows) => rows,
            Err(e) => return self.fetch_failed(scenario, table, &query.to_string(), e),
        };

        let check = TableCheck::new(table, Some(schema), &[], &actual)
            .with_scenario(&scenario.test_case_id)
            .with_retries(scenario.retries_for(table));

        match expected_rows {
            Some(rows) => {
                let expected: Vec<Row> = rows.into_iter().filter(|row| query.matches(row)).collect();
                self.validator.validate(&TableCheck { expected: &expected, ..check })
            }
            None => self.validator.validate_fixture(&check, document),
        }
    }

    async fn check_presence(&self, scenario: &Scenario, table: &str, expectation: TableExpectation) -> ValidationReport {
        let query = match self.build_query(scenario, table, None) {
            Ok(query) => query,
            Err(e) => return self.fetch_failed(scenario, table, table, e),
        };
        let policy = match expectation {
            TableExpectation::Persist => self.policy,
            // Nothing to wait for when rows must stay absent
            TableExpectation::NotPersist => FetchPolicy::immediate(),
        };

        match self.fetch_with(&query, policy).await {
            Ok(rows) => {
                let mut report = ReportBuilder::new(table)
                    .with_scenario(&scenario.test_case_id)
                    .presence_only();
                report.push(check_persistence(expectation, rows.len()));
                report.finalize()
            }
            Err(e) => self.fetch_failed(scenario, table, &query.to_string(), e),
        }
    }

    /// Lookup columns: lookup override file ⇒ schema primary ⇒ inference
    /// from the first expected row. Without any, every scenario lookup id is
    /// used.
    ///
    /// A query without a single usable lookup value would match the whole
    /// table, so it is refused.
    fn build_query(&self, scenario: &Scenario, table: &str, first_expected: Option<&Row>) -> Result<RowQuery, FetchError> {
        let mut query = RowQuery::new(table);

        let declared = self.registry.lookup(table).filter(|lookup| !lookup.is_empty());
        let primary = self.registry.table(table).and_then(|s| s.primary_lookup.as_deref());

        if let Some(lookup) = declared {
            query = with_role_lookups(query, scenario, lookup);
        } else if let Some(primary) = primary {
            if let Some(value) = scenario.lookup_value(primary) {
                query = query.with_lookup(primary, value.clone());
            }
        } else if let Some(lookup) = first_expected.map(LookupConfig::infer).filter(|l| !l.is_empty()) {
            query = with_role_lookups(query, scenario, &lookup);
        } else {
            for (column, value) in &scenario.lookup_ids {
                query = query.with_lookup(column.as_str(), value.clone());
            }
        }

        if !query.has_lookup_values() {
            return Err(FetchError::NoLookupValues(table.to_string()));
        }
        Ok(query)
    }

    async fn fetch(&self, query: &RowQuery) -> Result<Vec<Row>, FetchError> {
        self.fetch_with(query, self.policy).await
    }

    /// Poll until rows appear or the policy's timeout passes
    ///
    /// Running out of time is not an error: the empty row set is returned
    /// and validated like any other.
    async fn fetch_with(&self, query: &RowQuery, policy: FetchPolicy) -> Result<Vec<Row>, FetchError> {
        let deadline = Instant::now() + policy.timeout;
        let mut attempt = 1;

        loop {
            let rows = self.source.fetch_rows(query).await?;
            if !rows.is_empty() || Instant::now() + policy.interval >= deadline {
                tracing::debug!(query = %query, rows = rows.len(), attempt, "fetched rows");
                return Ok(rows);
            }

            tracing::debug!(query = %query, attempt, "no rows yet, polling");
            attempt += 1;
            tokio::time::sleep(policy.interval).await;
        }
    }

    fn fetch_failed(&self, scenario: &Scenario, table: &str, target: &str, error: FetchError) -> ValidationReport {
        tracing::warn!(table, query = %target, error = %error, "fetch failed");
        let mut report = ReportBuilder::new(table).with_scenario(&scenario.test_case_id);
        report.global_error(GlobalErrorKind::FetchFailed, format!("Fetch failed for {}: {}", target, error));
        report.finalize()
    }
}

/// Id column takes the scenario's id value, order-id column its order id
fn with_role_lookups(mut query: RowQuery, scenario: &Scenario, lookup: &LookupConfig) -> RowQuery {
    if let Some(column) = lookup.id_column.as_deref() {
        if let Some(value) = scenario.id_value(column) {
            query = query.with_lookup(column, value.clone());
        }
    }
    if let Some(column) = lookup.order_id_column.as_deref() {
        if let Some(value) = scenario.order_id_value(column) {
            query = query.with_lookup(column, value.clone());
        }
    }
    query
}
