//! Expected fixture documents per table

use crate::value::{Row, Value};
use indexmap::IndexMap;

/// Expected fixture documents keyed by table
///
/// Documents are kept as loaded; a document that is not an array of row
/// objects is reported when its table is validated, not when it is loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpectedSet {
    tables: IndexMap<String, Value>,
}

impl ExpectedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, document: Value) {
        self.tables.insert(table.into(), document);
    }

    pub fn with_rows(mut self, table: impl Into<String>, rows: Vec<Row>) -> Self {
        self.insert(table, Value::Array(rows.into_iter().map(Value::Object).collect()));
        self
    }

    pub fn get(&self, table: &str) -> Option<&Value> {
        self.tables.get(table)
    }

    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Rows of a fixture document, or `None` when it is not an array of objects
pub fn fixture_rows(document: &Value) -> Option<Vec<Row>> {
    document
        .as_array()?
        .iter()
        .map(|item| item.as_object().cloned())
        .collect()
}
