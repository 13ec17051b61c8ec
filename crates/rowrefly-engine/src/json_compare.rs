//! JSON path comparator
//!
//! Diffs an expected document against an actual one under a column's path
//! rules. Every function here returns its own result list; nothing is threaded
//! through the recursion and neither document is modified. Ignored paths are
//! excluded inline while walking.

use rowrefly_core::path::{join_field, join_index, relative_to};
use rowrefly_core::{values_equal, CheckCode, ColumnResult, ColumnRule, JsonPath, JsonValidateMode, Value};
use std::borrow::Cow;

/// Compare one JSON column
///
/// `expected` and `actual` may be structured values or JSON text. Result
/// entries are addressed as `column.path`.
pub fn compare_json_column(column: &str, expected: &Value, actual: &Value, rule: &ColumnRule) -> Vec<ColumnResult> {
    if actual.is_null_like() {
        let result = if rule.has_required_paths() {
            ColumnResult::fail(CheckCode::JsonAbsent, column, "JSON field missing")
        } else {
            ColumnResult::skipped(CheckCode::JsonAbsent, column, "JSON field absent; nothing required")
        };
        return vec![result];
    }

    let actual = match parse_document(actual) {
        Ok(doc) => doc,
        Err(e) => {
            return vec![ColumnResult::fail(CheckCode::JsonInvalid, column, format!("Invalid JSON in actual: {}", e))
                .with_actual(actual.to_string())]
        }
    };
    let expected = expected_document(expected);

    match rule.json_validate_mode {
        JsonValidateMode::RequiredOnly => compare_required_only(column, expected.as_deref(), &actual, rule),
        JsonValidateMode::Full => compare_full(column, expected.as_deref(), &actual, rule),
    }
}

/// Structural equality under value-comparator semantics at the leaves
pub fn json_equal(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(e), Value::Object(a)) => {
            e.len() == a.len() && e.iter().all(|(k, ev)| a.get(k).is_some_and(|av| json_equal(ev, av)))
        }
        (Value::Array(e), Value::Array(a)) => {
            e.len() == a.len() && e.iter().zip(a).all(|(ev, av)| json_equal(ev, av))
        }
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => false,
        _ => values_equal(expected, actual),
    }
}

fn parse_document(value: &Value) -> Result<Cow<'_, Value>, String> {
    match value {
        Value::String(text) => Value::parse_json(text.trim())
            .map(Cow::Owned)
            .map_err(|e| e.to_string()),
        other => Ok(Cow::Borrowed(other)),
    }
}

/// Expected side: parsed when it is JSON text, `None` when null-like
fn expected_document(value: &Value) -> Option<Cow<'_, Value>> {
    if value.is_null_like() {
        return None;
    }
    match value {
        Value::String(text) => match Value::parse_json(text.trim()) {
            Ok(doc) => Some(Cow::Owned(doc)),
            Err(_) => Some(Cow::Borrowed(value)),
        },
        other => Some(Cow::Borrowed(other)),
    }
}

fn compare_full(column: &str, expected: Option<&Value>, actual: &Value, rule: &ColumnRule) -> Vec<ColumnResult> {
    let mut results = Vec::new();
    let mut reported = Vec::new();

    for path in rule.required_paths() {
        let full = join_field(column, path);
        let missing = match JsonPath::parse(path) {
            Ok(parsed) => parsed.resolve(actual).is_none().then(|| {
                let result = ColumnResult::fail(CheckCode::JsonRequiredPath, full.as_str(), "Required JSON path missing");
                match expected.and_then(|e| parsed.resolve(e)) {
                    Some(e) => result.with_expected(e.to_string()),
                    None => result,
                }
            }),
            Err(e) => Some(ColumnResult::fail(
                CheckCode::JsonRequiredPath,
                full.as_str(),
                format!("Invalid required path: {}", e),
            )),
        };
        if let Some(result) = missing {
            results.push(result);
            reported.push(full);
        }
    }

    match expected {
        None => results.push(ColumnResult::pass(CheckCode::JsonValue, column).with_actual(actual.to_string())),
        Some(expected) if !expected.is_container() => {
            let result = if values_equal(expected, actual) {
                ColumnResult::pass(CheckCode::JsonValue, column)
            } else {
                ColumnResult::fail(CheckCode::JsonValue, column, "JSON value mismatch")
            };
            results.push(result.with_comparison(expected.to_string(), actual.to_string()));
        }
        Some(expected) => {
            // Failures under an already-reported required path would repeat it
            results.extend(
                walk(column, column, expected, actual, rule)
                    .into_iter()
                    .filter(|r| !(r.is_fail() && is_covered(&r.column, &reported))),
            );
        }
    }

    results
}

fn is_covered(path: &str, reported: &[String]) -> bool {
    reported.iter().any(|r| {
        path == r
            || path
                .strip_prefix(r.as_str())
                .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
    })
}

fn walk(column: &str, path: &str, expected: &Value, actual: &Value, rule: &ColumnRule) -> Vec<ColumnResult> {
    let relative = relative_to(column, path);
    if path != column && rule.is_ignored(path, relative) {
        return vec![ColumnResult::skipped(CheckCode::JsonIgnored, path, "Ignored JSON path")];
    }

    match expected {
        Value::Object(fields) => {
            let Some(actual_fields) = actual.as_object() else {
                return vec![shape_mismatch(column, path, expected, actual, rule)];
            };
            fields
                .iter()
                .flat_map(|(name, child_expected)| {
                    let child = join_field(path, name);
                    match actual_fields.get(name) {
                        Some(child_actual) => walk(column, &child, child_expected, child_actual, rule),
                        None => vec![missing_field(column, &child, child_expected, rule)],
                    }
                })
                .collect()
        }
        Value::Array(items) => {
            let Some(actual_items) = actual.as_array() else {
                return vec![shape_mismatch(column, path, expected, actual, rule)];
            };
            let mut results: Vec<ColumnResult> = items
                .iter()
                .zip(actual_items)
                .enumerate()
                .flat_map(|(i, (e, a))| walk(column, &join_index(path, i), e, a, rule))
                .collect();

            if items.len() != actual_items.len() {
                let result = if rule.is_required(path, relative) {
                    ColumnResult::fail(CheckCode::JsonArraySize, path, "Array size mismatch")
                } else {
                    ColumnResult::skipped(CheckCode::JsonArraySize, path, "Not required; array size mismatch skipped")
                };
                results.push(result.with_comparison(
                    format!("array size={}", items.len()),
                    format!("array size={}", actual_items.len()),
                ));
            }
            results
        }
        leaf => {
            let result = if values_equal(leaf, actual) {
                ColumnResult::pass(CheckCode::JsonValue, path)
            } else if rule.is_required(path, relative) {
                ColumnResult::fail(CheckCode::JsonValue, path, "JSON value mismatch")
            } else {
                ColumnResult::skipped(CheckCode::JsonValue, path, "Not required; mismatch skipped")
            };
            vec![result.with_comparison(leaf.to_string(), actual.to_string())]
        }
    }
}

fn missing_field(column: &str, path: &str, expected: &Value, rule: &ColumnRule) -> ColumnResult {
    let relative = relative_to(column, path);
    if rule.is_ignored(path, relative) {
        return ColumnResult::skipped(CheckCode::JsonIgnored, path, "Ignored JSON path");
    }

    let result = if rule.is_required(path, relative) {
        ColumnResult::fail(CheckCode::JsonMissingField, path, "Missing JSON field")
    } else {
        ColumnResult::skipped(CheckCode::JsonMissingField, path, "Not required; missing in actual")
    };
    result.with_expected(expected.to_string())
}

fn shape_mismatch(column: &str, path: &str, expected: &Value, actual: &Value, rule: &ColumnRule) -> ColumnResult {
    let reason = format!("Expected {}, found {}", expected.type_name(), actual.type_name());
    let result = if rule.is_required(path, relative_to(column, path)) {
        ColumnResult::fail(CheckCode::JsonValue, path, reason)
    } else {
        ColumnResult::skipped(CheckCode::JsonValue, path, format!("Not required; {}", reason))
    };
    result.with_comparison(expected.to_string(), actual.to_string())
}

fn compare_required_only(
    column: &str,
    expected: Option<&Value>,
    actual: &Value,
    rule: &ColumnRule,
) -> Vec<ColumnResult> {
    let paths = rule.required_paths();
    if paths.is_empty() {
        return vec![ColumnResult::skipped(
            CheckCode::JsonRequiredPath,
            column,
            "No required JSON paths declared",
        )];
    }

    paths
        .into_iter()
        .map(|path| {
            let full = join_field(column, path);
            let parsed = match JsonPath::parse(path) {
                Ok(parsed) => parsed,
                Err(e) => {
                    return ColumnResult::fail(CheckCode::JsonRequiredPath, full, format!("Invalid required path: {}", e))
                }
            };

            let Some(actual_value) = parsed.resolve(actual) else {
                return ColumnResult::fail(CheckCode::JsonRequiredPath, full, "Required JSON path missing");
            };

            match expected.and_then(|e| parsed.resolve(e)) {
                None => ColumnResult::pass(CheckCode::JsonRequiredPath, full).with_actual(actual_value.to_string()),
                Some(expected_value) if json_equal(expected_value, actual_value) => {
                    ColumnResult::pass(CheckCode::JsonValue, full)
                        .with_comparison(expected_value.to_string(), actual_value.to_string())
                }
                Some(expected_value) => ColumnResult::fail(CheckCode::JsonValue, full, "JSON value mismatch")
                    .with_comparison(expected_value.to_string(), actual_value.to_string()),
            }
        })
        .collect()
}
