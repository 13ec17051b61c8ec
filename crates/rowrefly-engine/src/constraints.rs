//! Whole-row-set invariants
//!
//! Composite-key uniqueness, exact retry counts and table persistence. Each
//! check looks at every actual row of a table at once.

use rowrefly_core::value::NULL;
use rowrefly_core::{normalize, values_equal, CheckCode, ColumnResult, RetryExpectation, Row, TableExpectation, Value};
use std::collections::HashSet;

/// A repeated composite key
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateKey {
    /// Constraint column names
    pub constraint: Vec<String>,

    /// Offending key values
    pub key: Vec<Value>,

    /// Index of the flagged (non-first) occurrence
    pub row_index: usize,
}

impl DuplicateKey {
    /// `[42, 1]`
    pub fn key_label(&self) -> String {
        let parts: Vec<String> = self.key.iter().map(Value::to_string).collect();
        format!("[{}]", parts.join(", "))
    }
}

/// Every non-first occurrence of a composite key
///
/// Keys compare under value-comparator semantics: `42` and `"42.0"` collide,
/// as do all null-like values.
pub fn find_duplicates(rows: &[Row], constraint: &[String]) -> Vec<DuplicateKey> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();

    for (row_index, row) in rows.iter().enumerate() {
        let key: Vec<Value> = constraint
            .iter()
            .map(|column| row.get(column).unwrap_or(&NULL).clone())
            .collect();
        let canonical: Vec<String> = key.iter().map(|v| normalize(v).key()).collect();

        if !seen.insert(canonical) {
            duplicates.push(DuplicateKey {
                constraint: constraint.to_vec(),
                key,
                row_index,
            });
        }
    }

    duplicates
}

/// One `UNIQUE_CONSTRAINT` failure per duplicate occurrence
pub fn check_unique_constraints(rows: &[Row], constraints: &[Vec<String>]) -> Vec<ColumnResult> {
    constraints
        .iter()
        .filter(|constraint| !constraint.is_empty())
        .flat_map(|constraint| find_duplicates(rows, constraint))
        .map(|dup| {
            let label = dup.constraint.join(", ");
            ColumnResult::fail(
                CheckCode::UniqueConstraint,
                dup.constraint.join(","),
                format!("Duplicate key {} for unique constraint ({})", dup.key_label(), label),
            )
            .with_comparison(format!("unique ({})", label), dup.key_label())
        })
        .collect()
}

/// Exact-count check per expected operation value
///
/// A count above the expectation fails just like one below it.
pub fn check_retry_counts(rows: &[Row], operation_column: &str, expectations: &[RetryExpectation]) -> Vec<ColumnResult> {
    expectations
        .iter()
        .map(|expectation| {
            let operation = Value::from(expectation.operation.as_str());
            let count = rows
                .iter()
                .filter(|row| values_equal(row.get(operation_column).unwrap_or(&NULL), &operation))
                .count();

            let column = format!("{}={}", operation_column, expectation.operation);
            let result = if count == expectation.count {
                ColumnResult::pass(CheckCode::RetryCount, column)
            } else {
                ColumnResult::fail(CheckCode::RetryCount, column, "RETRY_COUNT")
            };
            result.with_comparison(expectation.count.to_string(), count.to_string())
        })
        .collect()
}

/// Persistence expectation against the number of rows found
pub fn check_persistence(expectation: TableExpectation, row_count: usize) -> ColumnResult {
    let expected = match expectation {
        TableExpectation::Persist => "PERSIST",
        TableExpectation::NotPersist => "NOT_PERSIST",
    };
    let result = match (expectation, row_count) {
        (TableExpectation::Persist, 0) => {
            ColumnResult::fail(CheckCode::Persistence, "PERSISTENCE", "Expected rows but none were persisted")
        }
        (TableExpectation::NotPersist, n) if n > 0 => ColumnResult::fail(
            CheckCode::Persistence,
            "PERSISTENCE",
            format!("Expected no rows but found {}", n),
        ),
        _ => ColumnResult::pass(CheckCode::Persistence, "PERSISTENCE"),
    };
    result.with_comparison(expected, format!("rows={}", row_count))
}
