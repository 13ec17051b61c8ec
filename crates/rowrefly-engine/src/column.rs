//! Per-column checks for one matched row pair
//!
//! A column goes through the checks below in order, and the first one that
//! applies decides its outcome:
//!
//! 1. optional and absent → SKIPPED
//! 2. semantic rule
//! 3. generated column → non-null presence
//! 4. absent → FAIL, unless the expected value is null-like
//! 5. JSON-shaped value on an untyped column
//! 6. `time` columns → format pattern
//! 7. `json` columns → [`compare_json_column`]
//! 8. datetime-like values → well-formedness
//! 9. allowed set, then not-null
//! 10. value equality

use crate::json_compare::compare_json_column;
use bigdecimal::BigDecimal;
use once_cell::sync::Lazy;
use regex::Regex;
use rowrefly_core::value::NULL;
use rowrefly_core::{
    values_equal, CheckCode, ColumnResult, ColumnRule, ColumnType, Row, SemanticRule, TableSchema, Value,
};
use std::borrow::Cow;
use std::collections::HashMap;

/// `YYYY-MM-DD[ T]HH:MM:SS[.fraction]`
pub const DEFAULT_TIME_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(\.\d+)?$";

/// ISO-ish timestamp with an optional zone suffix
pub const DATETIME_PATTERN: &str = r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?$";

pub(crate) static DEFAULT_TIME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_TIME_PATTERN).expect("default time pattern is valid"));

static DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(DATETIME_PATTERN).expect("datetime pattern is valid"));

/// True for text values shaped like a generated timestamp
pub fn is_datetime_like(value: &Value) -> bool {
    value.as_str().is_some_and(|s| DATETIME_REGEX.is_match(s.trim()))
}

/// Everything a column check needs besides the two rows
pub(crate) struct ColumnContext<'a> {
    pub table: &'a str,
    pub schema: &'a TableSchema,
    /// Time pattern for `time` columns without their own `timePattern`
    pub time_pattern: &'a Regex,
    /// Per-column `timePattern` overrides, compiled once per table
    column_patterns: HashMap<&'a str, Result<Regex, String>>,
}

impl<'a> ColumnContext<'a> {
    pub fn new(table: &'a str, schema: &'a TableSchema, time_pattern: &'a Regex) -> Self {
        let column_patterns = schema
            .columns
            .iter()
            .filter_map(|(column, rule)| {
                let pattern = rule.time_pattern.as_deref()?;
                Some((column.as_str(), Regex::new(pattern).map_err(|e| e.to_string())))
            })
            .collect();

        Self {
            table,
            schema,
            time_pattern,
            column_patterns,
        }
    }

    /// Check one column of a matched row pair
    pub fn check(&self, column: &str, expected_row: &Row, actual_row: &Row) -> Vec<ColumnResult> {
        let expected = expected_row.get(column).unwrap_or(&NULL);
        let present = actual_row.get(column);
        let actual = present.unwrap_or(&NULL);
        let rule = self.schema.effective_rule(column);

        if present.is_none() && self.schema.is_optional(column) {
            return vec![ColumnResult::skipped(
                CheckCode::ColumnMissing,
                column,
                "Optional field missing in actual; skipped",
            )];
        }

        if let Some(semantic) = self.schema.semantic_rule(column) {
            return vec![check_semantic(column, semantic, expected, actual)];
        }

        if self.schema.is_generated(column) {
            return vec![check_generated(column, actual)];
        }

        let is_json = rule.as_ref().is_some_and(|r| r.is_json());
        if present.is_none() && !is_json && !expected.is_null_like() {
            return vec![ColumnResult::fail(CheckCode::ColumnMissing, column, "Required field missing in actual")
                .with_expected(expected.to_string())];
        }

        let untyped = rule.as_ref().map_or(true, |r| r.column_type == ColumnType::Unset);
        if untyped && (expected.looks_like_json() || actual.looks_like_json()) {
            return match rule.as_ref().filter(|r| r.declares_json_paths()) {
                Some(rule) => compare_json_column(column, expected, actual, rule),
                None => vec![ColumnResult::fail(
                    CheckCode::JsonSchemaMissing,
                    column,
                    format!(
                        "JSON detected but no column schema found for table={}, column={}",
                        self.table, column
                    ),
                )
                .with_actual(actual.to_string())],
            };
        }

        match rule {
            Some(rule) if rule.is_time() => vec![self.check_time(column, actual, &rule)],
            Some(rule) if rule.is_json() => compare_json_column(column, expected, actual, &rule),
            rule => vec![check_value(column, expected, actual, rule)],
        }
    }

    fn check_time(&self, column: &str, actual: &Value, rule: &ColumnRule) -> ColumnResult {
        let pattern = match self.column_patterns.get(column) {
            Some(Ok(regex)) => regex,
            Some(Err(e)) => {
                return ColumnResult::fail(CheckCode::TimeFormat, column, format!("Invalid time pattern: {}", e))
                    .with_expected(rule.time_pattern.clone().unwrap_or_default())
            }
            None => self.time_pattern,
        };

        let text = actual.to_string();
        let result = if !actual.is_null_like() && pattern.is_match(text.trim()) {
            ColumnResult::pass(CheckCode::TimeFormat, column)
        } else {
            ColumnResult::fail(CheckCode::TimeFormat, column, "Time format invalid")
        };
        result.with_comparison(pattern.as_str(), text)
    }
}

/// Datetime, allowed-set, not-null and equality checks
fn check_value(column: &str, expected: &Value, actual: &Value, rule: Option<Cow<'_, ColumnRule>>) -> ColumnResult {
    if is_datetime_like(expected) || is_datetime_like(actual) {
        return if is_datetime_like(actual) {
            ColumnResult::pass(CheckCode::DatetimeFormat, column)
        } else {
            ColumnResult::fail(CheckCode::DatetimeFormat, column, "Invalid datetime")
        }
        .with_comparison(expected.to_string(), actual.to_string());
    }

    if let Some(rule) = rule.as_deref() {
        if !rule.allowed.is_empty() && !rule.allowed.iter().any(|allowed| values_equal(allowed, actual)) {
            let allowed: Vec<String> = rule.allowed.iter().map(Value::to_string).collect();
            return ColumnResult::fail(CheckCode::AllowedValues, column, "Value not in allowed set")
                .with_comparison(format!("one of [{}]", allowed.join(", ")), actual.to_string());
        }

        if rule.not_null && actual.is_null_like() {
            return ColumnResult::fail(CheckCode::NotNull, column, "Null/empty not allowed by schema")
                .with_comparison(expected.to_string(), actual.to_string());
        }
    }

    let result = if values_equal(expected, actual) {
        ColumnResult::pass(CheckCode::ValueMatch, column)
    } else {
        ColumnResult::fail(CheckCode::ValueMatch, column, "Mismatch")
    };
    result.with_comparison(expected.to_string(), actual.to_string())
}

fn check_semantic(column: &str, rule: &SemanticRule, expected: &Value, actual: &Value) -> ColumnResult {
    let result = match rule {
        SemanticRule::NullablePresence => {
            if expected.is_null_like() == actual.is_null_like() {
                ColumnResult::pass(CheckCode::SemanticRule, column)
            } else {
                ColumnResult::fail(CheckCode::SemanticRule, column, "Presence mismatch (nullable_presence)")
            }
        }
        SemanticRule::AtLeast { min } => match rowrefly_core::normalize(actual).as_decimal() {
            Some(value) if value >= BigDecimal::from(*min) => ColumnResult::pass(CheckCode::SemanticRule, column),
            Some(_) => ColumnResult::fail(CheckCode::SemanticRule, column, format!("Value below minimum {}", min)),
            None => ColumnResult::fail(CheckCode::SemanticRule, column, "Non-numeric value (at_least)"),
        },
    };
    result.with_comparison(expected.to_string(), actual.to_string())
}

fn check_generated(column: &str, actual: &Value) -> ColumnResult {
    if actual.is_null_like() {
        ColumnResult::fail(CheckCode::GeneratedPresence, column, "Generated column is null or missing")
    } else {
        ColumnResult::pass(CheckCode::GeneratedPresence, column).with_actual(actual.to_string())
    }
}
