//! Expected fixture loader
//!
//! Two naming conventions are recognized under the expected directory:
//! `{table}_expected_data.json` at the top level and `tables/{table}.json`.
//! Documents are stored as parsed; whether they hold an array of rows is
//! checked when the table is validated.

use crate::error::{read_file, FixtureError};
use rowrefly_core::{ExpectedSet, Value};
use std::path::Path;
use walkdir::WalkDir;

const EXPECTED_SUFFIX: &str = "_expected_data.json";
const TABLES_DIR: &str = "tables";

/// Load every expected fixture under `dir`
///
/// A missing directory yields an empty set: each table then reports its
/// own missing fixture.
pub fn load_expected(dir: &Path) -> Result<ExpectedSet, FixtureError> {
    let mut expected = ExpectedSet::new();
    if !dir.is_dir() {
        tracing::warn!(dir = %dir.display(), "expected fixture directory not found");
        return Ok(expected);
    }

    for entry in WalkDir::new(dir).min_depth(1).max_depth(2).sort_by_file_name() {
        let entry = entry.map_err(|e| FixtureError::walk(dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Some(table) = fixture_table(dir, path) else {
            continue;
        };

        if expected.get(&table).is_some() {
            return Err(FixtureError::DuplicateTable {
                table,
                path: path.display().to_string(),
            });
        }

        let document = Value::parse_json(&read_file(path)?).map_err(|e| FixtureError::parse(path, e))?;
        tracing::debug!(table = %table, path = %path.display(), "loaded expected fixture");
        expected.insert(table, document);
    }

    tracing::info!(tables = expected.len(), dir = %dir.display(), "expected fixtures loaded");
    Ok(expected)
}

/// Table a fixture file belongs to, if it follows either convention
fn fixture_table(root: &Path, path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let parent = path.parent()?;

    if parent == root {
        return name.strip_suffix(EXPECTED_SUFFIX).filter(|t| !t.is_empty()).map(str::to_string);
    }

    if parent == root.join(TABLES_DIR) {
        return name.strip_suffix(".json").filter(|t| !t.is_empty()).map(str::to_string);
    }

    None
}
