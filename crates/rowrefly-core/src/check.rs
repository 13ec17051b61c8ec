//! Check codes and per-field outcomes
//!
//! IMPORTANT: Check codes are versioned and stable.
//! NEVER rename or remove codes - downstream report consumers key on them.

use serde::{Deserialize, Serialize};

/// Check code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckCode {
    // Scalar column checks
    /// Plain value equality
    ValueMatch,

    /// Required column absent from the actual row
    ColumnMissing,

    /// Time-typed column checked against its format pattern
    TimeFormat,

    /// Generated timestamp checked for well-formedness only
    DatetimeFormat,

    /// Actual value must be one of the allowed set
    AllowedValues,

    /// Null-like actual value on a not-null column
    NotNull,

    /// Generated column checked for non-null presence
    GeneratedPresence,

    /// Per-column semantic override (e.g. nullable presence)
    SemanticRule,

    // JSON column checks
    /// Leaf value compared inside a document
    JsonValue,

    /// Required path pre-check or required-only resolution
    JsonRequiredPath,

    /// Object field missing during the structural walk
    JsonMissingField,

    /// Array length differs
    JsonArraySize,

    /// Path excluded by an ignore rule
    JsonIgnored,

    /// Actual payload does not parse
    JsonInvalid,

    /// JSON column has no actual document
    JsonAbsent,

    /// JSON-shaped value with no path rules declared
    JsonSchemaMissing,

    // Row and set checks
    /// Row could not be paired through its lookup keys
    RowMatch,

    /// Operation count differs from the retry expectation
    RetryCount,

    /// Composite key repeated across the row set
    UniqueConstraint,

    /// Table persisted (or not) as declared
    Persistence,
}

impl CheckCode {
    /// Stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValueMatch => "VALUE_MATCH",
            Self::ColumnMissing => "COLUMN_MISSING",
            Self::TimeFormat => "TIME_FORMAT",
            Self::DatetimeFormat => "DATETIME_FORMAT",
            Self::AllowedValues => "ALLOWED_VALUES",
            Self::NotNull => "NOT_NULL",
            Self::GeneratedPresence => "GENERATED_PRESENCE",
            Self::SemanticRule => "SEMANTIC_RULE",
            Self::JsonValue => "JSON_VALUE",
            Self::JsonRequiredPath => "JSON_REQUIRED_PATH",
            Self::JsonMissingField => "JSON_MISSING_FIELD",
            Self::JsonArraySize => "JSON_ARRAY_SIZE",
            Self::JsonIgnored => "JSON_IGNORED",
            Self::JsonInvalid => "JSON_INVALID",
            Self::JsonAbsent => "JSON_ABSENT",
            Self::JsonSchemaMissing => "JSON_SCHEMA_MISSING",
            Self::RowMatch => "ROW_MATCH",
            Self::RetryCount => "RETRY_COUNT",
            Self::UniqueConstraint => "UNIQUE_CONSTRAINT",
            Self::Persistence => "PERSISTENCE",
        }
    }
}

impl std::fmt::Display for CheckCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::Skipped => write!(f, "SKIPPED"),
        }
    }
}

/// Outcome of a single field, path, row or set check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnResult {
    /// Column name, or `column.path` for JSON checks
    pub column: String,

    pub code: CheckCode,

    pub status: CheckStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ColumnResult {
    pub fn new(code: CheckCode, status: CheckStatus, column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            code,
            status,
            expected: None,
            actual: None,
            reason: None,
        }
    }

    pub fn pass(code: CheckCode, column: impl Into<String>) -> Self {
        Self::new(code, CheckStatus::Pass, column)
    }

    pub fn fail(code: CheckCode, column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(code, CheckStatus::Fail, column).with_reason(reason)
    }

    pub fn skipped(code: CheckCode, column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(code, CheckStatus::Skipped, column).with_reason(reason)
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn with_actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_fail(&self) -> bool {
        self.status == CheckStatus::Fail
    }
}
