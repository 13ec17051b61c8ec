//! Report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use crate::check::{CheckStatus, ColumnResult};
use serde::{Deserialize, Serialize};

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Overall status of a table report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReportStatus {
    Pass,
    Fail,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Kind of blocking, table-wide error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GlobalErrorKind {
    SchemaMissing,
    SchemaConflict,
    FixtureMissing,
    FixtureMalformed,
    RowCountMismatch,
    FetchFailed,
    TaskFailed,
}

impl GlobalErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaMissing => "SCHEMA_MISSING",
            Self::SchemaConflict => "SCHEMA_CONFLICT",
            Self::FixtureMissing => "FIXTURE_MISSING",
            Self::FixtureMalformed => "FIXTURE_MALFORMED",
            Self::RowCountMismatch => "ROW_COUNT_MISMATCH",
            Self::FetchFailed => "FETCH_FAILED",
            Self::TaskFailed => "TASK_FAILED",
        }
    }
}

impl std::fmt::Display for GlobalErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A table-wide error that forces `FAIL`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalError {
    pub kind: GlobalErrorKind,
    pub message: String,
}

impl GlobalError {
    pub fn new(kind: GlobalErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for GlobalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Outcome of validating one table for one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub table_name: String,

    /// Test case id, when run as part of a scenario
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,

    pub status: ReportStatus,

    pub global_errors: Vec<GlobalError>,

    pub results: Vec<ColumnResult>,

    /// Only a persistence check ran; no data was compared
    #[serde(default)]
    pub presence_only: bool,
}

impl ValidationReport {
    pub fn is_pass(&self) -> bool {
        self.status == ReportStatus::Pass
    }

    pub fn failures(&self) -> impl Iterator<Item = &ColumnResult> {
        self.results.iter().filter(|r| r.status == CheckStatus::Fail)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// Table counts as skipped when only a passing presence check ran
    pub fn is_skipped(&self) -> bool {
        self.presence_only && self.is_pass()
    }
}

/// Append-only accumulator for a [`ValidationReport`]
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    table_name: String,
    scenario: Option<String>,
    global_errors: Vec<GlobalError>,
    results: Vec<ColumnResult>,
    presence_only: bool,
}

impl ReportBuilder {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            scenario: None,
            global_errors: Vec::new(),
            results: Vec::new(),
            presence_only: false,
        }
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario = Some(scenario.into());
        self
    }

    pub fn presence_only(mut self) -> Self {
        self.presence_only = true;
        self
    }

    pub fn push(&mut self, result: ColumnResult) {
        self.results.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ColumnResult>) {
        self.results.extend(results);
    }

    pub fn global_error(&mut self, kind: GlobalErrorKind, message: impl Into<String>) {
        self.global_errors.push(GlobalError::new(kind, message));
    }

    /// Roll every outcome into the final status
    ///
    /// Any global error or `FAIL` result makes the table `FAIL`.
    pub fn finalize(self) -> ValidationReport {
        let failed = !self.global_errors.is_empty() || self.results.iter().any(ColumnResult::is_fail);

        ValidationReport {
            table_name: self.table_name,
            scenario: self.scenario,
            status: if failed { ReportStatus::Fail } else { ReportStatus::Pass },
            global_errors: self.global_errors,
            results: self.results,
            presence_only: self.presence_only,
        }
    }
}

/// Overall status of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CaseStatus {
    Pass,
    Fail,
    Skipped,
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// All table reports of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub test_case_id: String,

    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub scenario_name: String,

    pub status: CaseStatus,

    pub tables: Vec<ValidationReport>,
}

impl CaseReport {
    /// FAIL if any table failed; SKIPPED if only presence checks ran
    pub fn new(test_case_id: impl Into<String>, scenario_name: impl Into<String>, tables: Vec<ValidationReport>) -> Self {
        let status = if tables.iter().any(|t| !t.is_pass()) {
            CaseStatus::Fail
        } else if tables.iter().all(|t| t.presence_only) {
            CaseStatus::Skipped
        } else {
            CaseStatus::Pass
        };

        Self {
            test_case_id: test_case_id.into(),
            scenario_name: scenario_name.into(),
            status,
            tables,
        }
    }
}

/// Summary statistics for a suite run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    pub cases: usize,
    pub cases_passed: usize,
    pub cases_failed: usize,
    pub cases_skipped: usize,
    pub tables_checked: usize,
    pub tables_passed: usize,
    pub tables_failed: usize,
    pub tables_skipped: usize,

    /// `table.column` for every failing check, first occurrence order
    pub failures: Vec<String>,
}

impl SuiteSummary {
    fn from_cases(cases: &[CaseReport]) -> Self {
        let mut summary = Self {
            cases: cases.len(),
            ..Self::default()
        };

        for case in cases {
            match case.status {
                CaseStatus::Pass => summary.cases_passed += 1,
                CaseStatus::Fail => summary.cases_failed += 1,
                CaseStatus::Skipped => summary.cases_skipped += 1,
            }

            for table in &case.tables {
                summary.tables_checked += 1;
                if table.is_skipped() {
                    summary.tables_skipped += 1;
                } else if table.is_pass() {
                    summary.tables_passed += 1;
                } else {
                    summary.tables_failed += 1;
                }

                let labels = table
                    .global_errors
                    .iter()
                    .map(|e| format!("{}.{}", table.table_name, e.kind))
                    .chain(table.failures().map(|r| format!("{}.{}", table.table_name, r.column)));
                for label in labels {
                    if !summary.failures.contains(&label) {
                        summary.failures.push(label);
                    }
                }
            }
        }

        summary
    }
}

/// Suite report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    pub summary: SuiteSummary,

    pub cases: Vec<CaseReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl SuiteReport {
    pub fn from_cases(cases: Vec<CaseReport>) -> Self {
        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary: SuiteSummary::from_cases(&cases),
            cases,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn has_failures(&self) -> bool {
        self.summary.cases_failed > 0
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Save to file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckCode;
    use pretty_assertions::assert_eq;

    fn passing_table(name: &str) -> ValidationReport {
        let mut builder = ReportBuilder::new(name);
        builder.push(ColumnResult::pass(CheckCode::ValueMatch, "id"));
        builder.finalize()
    }

    #[test]
    fn finalize_pass_and_skipped_only() {
        let mut builder = ReportBuilder::new("orders");
        builder.push(ColumnResult::pass(CheckCode::ValueMatch, "id"));
        builder.push(ColumnResult::skipped(CheckCode::ColumnMissing, "note", "Optional field missing in actual; skipped"));
        let report = builder.finalize();
        assert_eq!(report.status, ReportStatus::Pass);
        assert_eq!(report.count(CheckStatus::Skipped), 1);
    }

    #[test]
    fn any_fail_forces_fail() {
        let mut builder = ReportBuilder::new("orders");
        builder.push(ColumnResult::pass(CheckCode::ValueMatch, "id"));
        builder.push(ColumnResult::fail(CheckCode::ValueMatch, "status", "Mismatch"));
        assert_eq!(builder.finalize().status, ReportStatus::Fail);
    }

    #[test]
    fn global_error_forces_fail_without_results() {
        let mut builder = ReportBuilder::new("orders");
        builder.global_error(GlobalErrorKind::RowCountMismatch, "Row count mismatch. expected=5 actual=4");
        let report = builder.finalize();
        assert_eq!(report.status, ReportStatus::Fail);
        assert!(report.results.is_empty());
    }

    #[test]
    fn case_status_rollup() {
        let pass = CaseReport::new("TC-1", "", vec![passing_table("orders")]);
        assert_eq!(pass.status, CaseStatus::Pass);

        let presence = ReportBuilder::new("audit").presence_only().finalize();
        let skipped = CaseReport::new("TC-2", "", vec![presence.clone()]);
        assert_eq!(skipped.status, CaseStatus::Skipped);

        let mut failing = ReportBuilder::new("orders");
        failing.push(ColumnResult::fail(CheckCode::RowMatch, "order_id", "Expected row not found in actual"));
        let failed = CaseReport::new("TC-3", "", vec![presence, failing.finalize()]);
        assert_eq!(failed.status, CaseStatus::Fail);
    }

    #[test]
    fn suite_summary_counts() {
        let mut failing = ReportBuilder::new("orders");
        failing.global_error(GlobalErrorKind::SchemaMissing, "Schema not found for table orders");
        failing.push(ColumnResult::fail(CheckCode::ValueMatch, "status", "Mismatch"));
        failing.push(ColumnResult::fail(CheckCode::ValueMatch, "status", "Mismatch"));

        let report = SuiteReport::from_cases(vec![
            CaseReport::new("TC-1", "happy path", vec![passing_table("orders")]),
            CaseReport::new("TC-2", "", vec![failing.finalize(), ReportBuilder::new("audit").presence_only().finalize()]),
        ]);

        assert_eq!(report.version, ReportVersion::CURRENT);
        assert_eq!(report.summary.cases, 2);
        assert_eq!(report.summary.cases_failed, 1);
        assert_eq!(report.summary.tables_checked, 3);
        assert_eq!(report.summary.tables_passed, 1);
        assert_eq!(report.summary.tables_failed, 1);
        assert_eq!(report.summary.tables_skipped, 1);
        assert_eq!(report.summary.failures, vec!["orders.SCHEMA_MISSING", "orders.status"]);
        assert!(report.has_failures());
    }

    #[test]
    fn report_serialization() {
        let report = SuiteReport::from_cases(vec![CaseReport::new("TC-1", "", vec![passing_table("orders")])]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"version\""));
        assert!(json.contains("\"tableName\": \"orders\""));
        assert!(json.contains("\"PASS\""));
    }
}
