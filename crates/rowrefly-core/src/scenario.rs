//! Test scenarios: which tables an event should touch and how

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Whether a table should receive rows at all
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableExpectation {
    Persist,
    NotPersist,
}

/// Exact number of rows carrying one operation value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryExpectation {
    pub operation: String,
    pub count: usize,
}

/// One scenario from the scenario file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Scenario {
    #[serde(alias = "test_case_id")]
    pub test_case_id: String,

    #[serde(alias = "scenario_name")]
    pub scenario_name: String,

    #[serde(alias = "event_type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// Value for a table's id lookup column when `lookupIds` has no entry for it
    #[serde(alias = "event_id", skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Value>,

    /// Value for a table's order-id lookup column when `lookupIds` has no entry for it
    #[serde(alias = "order_id", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<Value>,

    /// Lookup column → value identifying this scenario's rows
    #[serde(alias = "lookup_ids")]
    pub lookup_ids: IndexMap<String, Value>,

    /// Tables whose rows are compared field by field
    #[serde(alias = "expected_tables")]
    pub expected_tables: Vec<String>,

    /// Tables checked for presence only
    #[serde(alias = "table_expectations")]
    pub table_expectations: IndexMap<String, TableExpectation>,

    #[serde(alias = "retry_expectations")]
    pub retry_expectations: IndexMap<String, Vec<RetryExpectation>>,
}

impl Scenario {
    pub fn new(test_case_id: impl Into<String>) -> Self {
        Self {
            test_case_id: test_case_id.into(),
            ..Self::default()
        }
    }

    pub fn with_lookup(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.lookup_ids.insert(column.into(), value.into());
        self
    }

    pub fn with_event_id(mut self, value: impl Into<Value>) -> Self {
        self.event_id = Some(value.into());
        self
    }

    pub fn with_order_id(mut self, value: impl Into<Value>) -> Self {
        self.order_id = Some(value.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.expected_tables.push(table.into());
        self
    }

    /// Lookup value recorded for exactly this column
    pub fn lookup_value(&self, column: &str) -> Option<&Value> {
        self.lookup_ids.get(column)
    }

    /// Value for a table's id lookup column
    pub fn id_value(&self, column: &str) -> Option<&Value> {
        self.lookup_value(column).or(self.event_id.as_ref())
    }

    /// Value for a table's order-id lookup column
    pub fn order_id_value(&self, column: &str) -> Option<&Value> {
        self.lookup_value(column).or(self.order_id.as_ref())
    }

    /// Presence-only tables not also compared field by field
    pub fn presence_only_tables(&self) -> impl Iterator<Item = (&String, &TableExpectation)> {
        self.table_expectations
            .iter()
            .filter(|(table, _)| !self.expected_tables.contains(*table))
    }

    pub fn retries_for(&self, table: &str) -> &[RetryExpectation] {
        self.retry_expectations
            .get(table)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Display label: `id (name)` or just the id
    pub fn label(&self) -> String {
        if self.scenario_name.is_empty() {
            self.test_case_id.clone()
        } else {
            format!("{} ({})", self.test_case_id, self.scenario_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_parses_snake_case_file() {
        let json = r#"{
            "test_case_id": "TC-01",
            "scenario_name": "retry on timeout",
            "lookup_ids": {"order_id": 42},
            "expected_tables": ["orders", "order_events"],
            "table_expectations": {"audit_log": "PERSIST", "dead_letters": "NOT_PERSIST"},
            "retry_expectations": {"order_events": [{"operation": "RETRY", "count": 2}]}
        }"#;
        let scenario: Scenario = serde_json::from_str(json).unwrap();

        assert_eq!(scenario.test_case_id, "TC-01");
        assert_eq!(scenario.lookup_value("order_id"), Some(&Value::from(42)));
        assert_eq!(scenario.presence_only_tables().count(), 2);
        assert_eq!(scenario.retries_for("order_events")[0].count, 2);
        assert!(scenario.retries_for("orders").is_empty());
        assert_eq!(scenario.label(), "TC-01 (retry on timeout)");
    }

    #[test]
    fn lookup_value_is_keyed_by_column() {
        let scenario = Scenario::new("TC-02").with_lookup("event_id", "e-9");
        assert_eq!(scenario.lookup_value("event_id"), Some(&Value::from("e-9")));
        assert!(scenario.lookup_value("order_id").is_none());
        assert!(scenario.lookup_value("id").is_none());
    }

    #[test]
    fn role_values_map_id_and_order_id_columns() {
        let scenario: Scenario = serde_json::from_str(
            r#"{"testCaseId": "TC-04", "eventId": "e-1", "orderId": 42, "lookupIds": {"uuid": "u-7"}}"#,
        )
        .unwrap();

        assert_eq!(scenario.id_value("event_id"), Some(&Value::from("e-1")));
        assert_eq!(scenario.order_id_value("orderid"), Some(&Value::from(42)));

        // An explicit lookup id for the column wins over the role value
        assert_eq!(scenario.id_value("uuid"), Some(&Value::from("u-7")));
        assert!(Scenario::new("TC-05").id_value("event_id").is_none());
    }
}
