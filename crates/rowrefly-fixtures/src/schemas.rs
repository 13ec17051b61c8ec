//! Schema directory loader
//!
//! A schema directory holds three kinds of JSON files:
//!
//! | File                         | Contents                                  |
//! |------------------------------|-------------------------------------------|
//! | `{table}_{column}.schema.json` | one [`ColumnRule`], merged into the table |
//! | `{table}_lookup.json`        | [`LookupConfig`] override                 |
//! | any other `*.json`           | map of table name → [`TableSchema`]       |

use crate::error::{read_file, FixtureError};
use indexmap::IndexMap;
use rowrefly_core::{ColumnRule, LookupConfig, RegistryBuilder, SchemaRegistry, TableSchema};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const COLUMN_SCHEMA_SUFFIX: &str = ".schema.json";
const LOOKUP_SUFFIX: &str = "_lookup.json";

/// Load every schema file in `dir` and publish the registry
pub fn load_registry(dir: &Path) -> Result<SchemaRegistry, FixtureError> {
    if !dir.is_dir() {
        return Err(FixtureError::io(dir, "schema directory not found"));
    }

    let mut builder = SchemaRegistry::builder();
    let mut column_files = Vec::new();

    for path in json_files(dir)? {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if name.ends_with(COLUMN_SCHEMA_SUFFIX) {
            // Merged once every table is known
            column_files.push(path);
        } else if let Some(table) = name.strip_suffix(LOOKUP_SUFFIX) {
            let lookup: LookupConfig = parse_json(&path)?;
            tracing::debug!(table, path = %path.display(), "loaded lookup override");
            builder.insert_lookup(table, lookup);
        } else {
            load_table_file(&mut builder, &path)?;
        }
    }

    for path in column_files {
        merge_column_file(&mut builder, &path)?;
    }

    let registry = builder.build()?;
    tracing::info!(tables = registry.len(), dir = %dir.display(), "schema registry loaded");
    Ok(registry)
}

fn load_table_file(builder: &mut RegistryBuilder, path: &Path) -> Result<(), FixtureError> {
    let tables: IndexMap<String, TableSchema> = parse_json(path)?;
    for (table, schema) in tables {
        if builder.has_table(&table) {
            return Err(FixtureError::DuplicateTable {
                table,
                path: path.display().to_string(),
            });
        }
        tracing::debug!(table = %table, path = %path.display(), "loaded table schema");
        builder.insert_table(table, schema);
    }
    Ok(())
}

fn merge_column_file(builder: &mut RegistryBuilder, path: &Path) -> Result<(), FixtureError> {
    let stem = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(COLUMN_SCHEMA_SUFFIX))
        .unwrap_or_default();

    let Some((table, column)) = split_table_column(builder, stem) else {
        return Err(FixtureError::OrphanColumnSchema {
            path: path.display().to_string(),
        });
    };

    let rule: ColumnRule = parse_json(path)?;
    if builder.merge_column_rule(path.display().to_string(), &table, &column, rule) {
        tracing::debug!(table = %table, column = %column, path = %path.display(), "merged column schema");
    }
    Ok(())
}

/// Split `{table}_{column}` at the longest known table name
///
/// Table and column names may both contain underscores, so the table has
/// to be one the registry already knows.
fn split_table_column(builder: &RegistryBuilder, stem: &str) -> Option<(String, String)> {
    stem.match_indices('_')
        .map(|(i, _)| (&stem[..i], &stem[i + 1..]))
        .filter(|(table, column)| !column.is_empty() && builder.has_table(table))
        .last()
        .map(|(table, column)| (table.to_string(), column.to_string()))
}

/// `*.json` files directly inside `dir`, sorted by name
fn json_files(dir: &Path) -> Result<Vec<PathBuf>, FixtureError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| FixtureError::walk(dir, e))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn parse_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, FixtureError> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|e| FixtureError::parse(path, e))
}
