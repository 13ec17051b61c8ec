//! Row source backed by JSON exports on disk
//!
//! Each table is a file `{dir}/{table}.json` holding an array of row objects,
//! the shape a query tool produces when dumping a result set. A missing file
//! means nothing was persisted for that table.

use crate::source::{FetchError, RowQuery, RowSource};
use rowrefly_core::{Row, Value};
use std::path::{Path, PathBuf};

/// Reads `{table}.json` row arrays from a directory
#[derive(Debug, Clone)]
pub struct SnapshotRowSource {
    dir: PathBuf,
}

impl SnapshotRowSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn table_path(&self, table: &str) -> PathBuf {
        self.dir.join(format!("{}.json", table))
    }
}

fn parse_rows(table: &str, contents: &str) -> Result<Vec<Row>, FetchError> {
    let value = Value::parse_json(contents)
        .map_err(|e| FetchError::InvalidResponse(format!("{}: {}", table, e)))?;

    let found = value.type_name();
    let Value::Array(items) = value else {
        return Err(FetchError::InvalidResponse(format!(
            "{}: expected an array of rows, found {}",
            table, found
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(row) => Ok(row),
            other => Err(FetchError::InvalidResponse(format!(
                "{}: row {} is {}, not an object",
                table,
                i,
                other.type_name()
            ))),
        })
        .collect()
}

#[async_trait::async_trait]
impl RowSource for SnapshotRowSource {
    fn name(&self) -> &'static str {
        "Snapshot"
    }

    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<Row>, FetchError> {
        let path = self.table_path(&query.table);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no snapshot for table");
                return Ok(Vec::new());
            }
            Err(e) => return Err(FetchError::QueryError(format!("{}: {}", path.display(), e))),
        };

        let rows = parse_rows(&query.table, &contents)?;
        Ok(rows.into_iter().filter(|row| query.matches(row)).collect())
    }

    async fn list_tables(&self) -> Result<Vec<String>, FetchError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| FetchError::ConnectionError(format!("{}: {}", self.dir.display(), e)))?;

        let mut tables = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| FetchError::QueryError(e.to_string()))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    tables.push(stem.to_string());
                }
            }
        }
        tables.sort();
        Ok(tables)
    }
}
