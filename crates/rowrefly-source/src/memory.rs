//! In-memory row source for testing
//!
//! Rows are stored per table and filtered by the query's lookups. The source
//! can also simulate the ways a real store misbehaves:
//! - latency on every fetch
//! - per-table errors
//! - rows that only become visible after a number of fetches, like an
//!   asynchronous writer that has not committed yet
//!
//! ```rust,ignore
//! let source = MemoryRowSource::new().with_latency(20);
//! source.add_rows("orders", rows).await;
//! source.delay_visibility("orders", 2).await; // first two fetches see nothing
//! ```

use crate::source::{FetchError, RowQuery, RowSource};
use rowrefly_core::Row;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory row source
#[derive(Clone)]
pub struct MemoryRowSource {
    rows: Arc<RwLock<HashMap<String, Vec<Row>>>>,

    /// Errors to return for specific tables
    errors: Arc<RwLock<HashMap<String, FetchError>>>,

    /// Remaining fetches per table that still see no rows
    hidden_fetches: Arc<RwLock<HashMap<String, usize>>>,

    fetch_count: Arc<AtomicUsize>,

    /// Simulated query latency (milliseconds)
    latency_ms: u64,

    source_name: &'static str,
}

impl MemoryRowSource {
    pub fn new() -> Self {
        Self::from_rows(HashMap::new())
    }

    /// Create a source from a pre-built table → rows map
    pub fn from_rows(rows: HashMap<String, Vec<Row>>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(rows)),
            errors: Arc::new(RwLock::new(HashMap::new())),
            hidden_fetches: Arc::new(RwLock::new(HashMap::new())),
            fetch_count: Arc::new(AtomicUsize::new(0)),
            latency_ms: 0,
            source_name: "Memory",
        }
    }

    /// Append rows to a table
    pub async fn add_rows(&self, table: &str, rows: Vec<Row>) {
        self.rows
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    /// Configure an error to be returned for a specific table
    pub async fn add_error_for_table(&self, table: &str, error: FetchError) {
        self.errors.write().await.insert(table.to_string(), error);
    }

    /// The next `fetches` fetches of `table` return no rows
    pub async fn delay_visibility(&self, table: &str, fetches: usize) {
        self.hidden_fetches.write().await.insert(table.to_string(), fetches);
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.source_name = name;
        self
    }

    /// Total fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    pub async fn row_count(&self, table: &str) -> usize {
        self.rows.read().await.get(table).map_or(0, Vec::len)
    }

    pub async fn clear_errors(&self) {
        self.errors.write().await.clear();
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }

    /// Consume one hidden fetch; true while the table is still invisible
    async fn still_hidden(&self, table: &str) -> bool {
        let mut hidden = self.hidden_fetches.write().await;
        match hidden.get_mut(table) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for MemoryRowSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RowSource for MemoryRowSource {
    fn name(&self) -> &'static str {
        self.source_name
    }

    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>, FetchError> {
        self.simulate_latency().await;
        self.fetch_count.fetch_add(1, Ordering::SeqCst);

        // Check for configured errors first
        if let Some(error) = self.errors.read().await.get(&query.table) {
            return Err(error.clone());
        }

        if self.still_hidden(&query.table).await {
            tracing::debug!(table = %query.table, "rows not visible yet");
            return Ok(Vec::new());
        }

        let rows = self.rows.read().await;
        Ok(rows
            .get(&query.table)
            .map(|rows| rows.iter().filter(|row| query.matches(row)).cloned().collect())
            .unwrap_or_default())
    }

    async fn list_tables(&self) -> Result<Vec<String>, FetchError> {
        let mut tables: Vec<String> = self.rows.read().await.keys().cloned().collect();
        tables.sort();
        Ok(tables)
    }
}

/// Fluent construction of a [`MemoryRowSource`] without an async context
#[derive(Default)]
pub struct MemoryRowSourceBuilder {
    rows: HashMap<String, Vec<Row>>,
    latency_ms: u64,
}

impl MemoryRowSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, table: impl Into<String>, rows: Vec<Row>) -> Self {
        self.rows.entry(table.into()).or_default().extend(rows);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn build(self) -> MemoryRowSource {
        MemoryRowSource::from_rows(self.rows).with_latency(self.latency_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowrefly_core::Value;

    fn order(id: i64, status: &str) -> Row {
        let mut row = Row::new();
        row.insert("order_id".to_string(), Value::from(id));
        row.insert("status".to_string(), Value::from(status));
        row
    }

    #[tokio::test]
    async fn fetch_filters_by_lookup() {
        let source = MemoryRowSource::new();
        source.add_rows("orders", vec![order(1, "NEW"), order(2, "NEW"), order(1, "PAID")]).await;

        let rows = source
            .fetch_rows(&RowQuery::new("orders").with_lookup("order_id", 1))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get("status"), Some(&Value::from("PAID")));
    }

    #[tokio::test]
    async fn unknown_table_is_empty() {
        let source = MemoryRowSource::new();
        let rows = source.fetch_rows(&RowQuery::new("nothing")).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn configured_error_is_returned() {
        let source = MemoryRowSource::new();
        source
            .add_error_for_table("orders", FetchError::ConnectionError("refused".to_string()))
            .await;

        let result = source.fetch_rows(&RowQuery::new("orders")).await;
        assert!(matches!(result, Err(FetchError::ConnectionError(_))));

        source.clear_errors().await;
        assert!(source.fetch_rows(&RowQuery::new("orders")).await.is_ok());
    }

    #[tokio::test]
    async fn delayed_visibility_counts_down() {
        let source = MemoryRowSource::new();
        source.add_rows("orders", vec![order(1, "NEW")]).await;
        source.delay_visibility("orders", 2).await;

        let query = RowQuery::new("orders");
        assert!(source.fetch_rows(&query).await.unwrap().is_empty());
        assert!(source.fetch_rows(&query).await.unwrap().is_empty());
        assert_eq!(source.fetch_rows(&query).await.unwrap().len(), 1);
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn clones_share_storage() {
        let source = MemoryRowSource::new().with_name("Staging");
        let clone = source.clone();
        clone.add_rows("orders", vec![order(1, "NEW")]).await;

        assert_eq!(source.row_count("orders").await, 1);
        assert_eq!(source.name(), "Staging");
    }

    #[tokio::test]
    async fn builder_and_list_tables() {
        let source = MemoryRowSourceBuilder::new()
            .with_rows("payments", vec![order(1, "NEW")])
            .with_rows("orders", vec![order(1, "NEW")])
            .build();

        assert_eq!(source.list_tables().await.unwrap(), vec!["orders", "payments"]);
    }
}
