//! Row source trait for fetching actual rows

use rowrefly_core::{values_equal, Row, Value};
use std::fmt;

/// Rows of one table matching any of a set of lookup keys
#[derive(Debug, Clone, PartialEq)]
pub struct RowQuery {
    pub table: String,

    /// `(column, value)` pairs, OR-ed together
    pub lookups: Vec<(String, Value)>,
}

impl RowQuery {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            lookups: Vec::new(),
        }
    }

    pub fn with_lookup(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.lookups.push((column.into(), value.into()));
        self
    }

    /// Whether any lookup carries a usable (non-null-like) value
    pub fn has_lookup_values(&self) -> bool {
        self.lookups.iter().any(|(_, v)| !v.is_null_like())
    }

    /// A row matches when any lookup column equals its value
    ///
    /// A query without lookups (or with only null-like values) matches every
    /// row.
    pub fn matches(&self, row: &Row) -> bool {
        let mut keys = self.lookups.iter().filter(|(_, v)| !v.is_null_like()).peekable();
        if keys.peek().is_none() {
            return true;
        }
        keys.any(|(column, value)| row.get(column).is_some_and(|actual| values_equal(value, actual)))
    }
}

impl fmt::Display for RowQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.table)?;
        if !self.lookups.is_empty() {
            let keys: Vec<String> = self.lookups.iter().map(|(c, v)| format!("{}={}", c, v)).collect();
            write!(f, " [{}]", keys.join(" OR "))?;
        }
        Ok(())
    }
}

/// Errors that can occur when fetching rows
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("No lookup values available for table {0}")]
    NoLookupValues(String),
}

/// Trait for collaborators that fetch persisted rows
#[async_trait::async_trait]
pub trait RowSource: Send + Sync {
    /// Source name for logs and reports (e.g., "Memory", "Snapshot")
    fn name(&self) -> &'static str;

    /// Fetch the rows currently persisted for a query
    ///
    /// An empty result is not an error: the rows may not have landed yet.
    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>, FetchError>;

    /// Tables this source can serve
    async fn list_tables(&self) -> Result<Vec<String>, FetchError>;
}
