//! Schema registry
//!
//! Built once through [`RegistryBuilder`], then read-only. Share it across
//! concurrent table validations behind an `Arc`.

use crate::path::JsonPath;
use crate::schema::{ColumnCategory, ColumnRule, LookupConfig, TableSchema};
use indexmap::IndexMap;
use std::collections::HashSet;

/// Immutable table name → rules mapping
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    tables: IndexMap<String, TableSchema>,
    lookups: IndexMap<String, LookupConfig>,
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Lookup override loaded from `{table}_lookup.json`
    pub fn lookup(&self, table: &str) -> Option<&LookupConfig> {
        self.lookups.get(table)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Mutable staging area for a [`SchemaRegistry`]
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tables: IndexMap<String, TableSchema>,
    lookups: IndexMap<String, LookupConfig>,
    merged_files: HashSet<String>,
}

impl RegistryBuilder {
    pub fn with_table(mut self, name: impl Into<String>, schema: TableSchema) -> Self {
        self.insert_table(name, schema);
        self
    }

    /// Add or replace a table schema
    pub fn insert_table(&mut self, name: impl Into<String>, schema: TableSchema) {
        self.tables.insert(name.into(), schema);
    }

    pub fn insert_lookup(&mut self, table: impl Into<String>, lookup: LookupConfig) {
        self.lookups.insert(table.into(), lookup);
    }

    /// Merge a column schema file into a table's column rule
    ///
    /// Keyed by `source` (the file path): merging the same file twice is a
    /// no-op. Returns whether the rule was merged. A table with no schema yet
    /// gets an empty one.
    pub fn merge_column_rule(
        &mut self,
        source: impl Into<String>,
        table: &str,
        column: &str,
        rule: ColumnRule,
    ) -> bool {
        if !self.merged_files.insert(source.into()) {
            return false;
        }
        self.tables
            .entry(table.to_string())
            .or_default()
            .columns
            .entry(column.to_string())
            .or_default()
            .merge(rule);
        true
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Validate every schema and publish the registry
    pub fn build(self) -> Result<SchemaRegistry, RegistryError> {
        for (name, schema) in &self.tables {
            validate_table(name, schema)?;
        }

        Ok(SchemaRegistry {
            tables: self.tables,
            lookups: self.lookups,
        })
    }
}

/// Check one table schema for authoring errors
pub fn validate_table(name: &str, schema: &TableSchema) -> Result<(), RegistryError> {
    if let Some(conflict) = schema.conflicts().into_iter().next() {
        return Err(RegistryError::AmbiguousColumn {
            table: name.to_string(),
            column: conflict.column,
            categories: conflict.categories,
        });
    }

    let column_names = schema.columns.keys().chain(schema.json_columns.keys());
    for column in column_names {
        let Some(rule) = schema.effective_rule(column) else {
            continue;
        };

        if let Some(pattern) = &rule.time_pattern {
            regex::Regex::new(pattern).map_err(|e| RegistryError::InvalidTimePattern {
                table: name.to_string(),
                column: column.clone(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }

        for path in rule.required_paths() {
            JsonPath::parse(path).map_err(|e| RegistryError::InvalidPath {
                table: name.to_string(),
                column: column.clone(),
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        }
    }

    Ok(())
}

/// Registry build errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("Table '{table}': column '{column}' is declared in more than one of {categories:?}")]
    AmbiguousColumn {
        table: String,
        column: String,
        categories: Vec<ColumnCategory>,
    },

    #[error("Table '{table}': invalid time pattern '{pattern}' for column '{column}': {reason}")]
    InvalidTimePattern {
        table: String,
        column: String,
        pattern: String,
        reason: String,
    },

    #[error("Table '{table}': invalid required path '{path}' for column '{column}': {reason}")]
    InvalidPath {
        table: String,
        column: String,
        path: String,
        reason: String,
    },
}
