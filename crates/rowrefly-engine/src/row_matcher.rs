//! Pairs actual rows with their expected counterparts by lookup keys

use rowrefly_core::value::NULL;
use rowrefly_core::{values_equal, Row, TableSchema};

/// Lookup-key matcher built from a table's primary/secondary lookup
#[derive(Debug, Clone, Copy)]
pub struct RowMatcher<'a> {
    primary: &'a str,
    secondary: Option<&'a str>,
}

impl<'a> RowMatcher<'a> {
    pub fn new(primary: &'a str, secondary: Option<&'a str>) -> Self {
        Self { primary, secondary }
    }

    /// `None` when the schema declares no primary lookup
    pub fn from_schema(schema: &'a TableSchema) -> Option<Self> {
        let primary = schema.primary_lookup.as_deref()?;
        Some(Self::new(primary, schema.secondary_lookup.as_deref()))
    }

    pub fn primary(&self) -> &'a str {
        self.primary
    }

    pub fn secondary(&self) -> Option<&'a str> {
        self.secondary
    }

    /// First expected row whose lookup values equal the actual row's
    ///
    /// Candidates are tried in order; the first full match wins. Returns the
    /// candidate's index alongside the row.
    pub fn find<'e>(&self, actual: &Row, expected: &'e [Row]) -> Option<(usize, &'e Row)> {
        expected.iter().enumerate().find(|(_, candidate)| self.matches(actual, candidate))
    }

    pub fn matches(&self, actual: &Row, candidate: &Row) -> bool {
        std::iter::once(self.primary).chain(self.secondary).all(|column| {
            values_equal(
                candidate.get(column).unwrap_or(&NULL),
                actual.get(column).unwrap_or(&NULL),
            )
        })
    }

    /// `primary=value[, secondary=value]` for reports
    pub fn describe_key(&self, row: &Row) -> String {
        let mut key = format!("{}={}", self.primary, row.get(self.primary).unwrap_or(&NULL));
        if let Some(secondary) = self.secondary {
            key.push_str(&format!(", {}={}", secondary, row.get(secondary).unwrap_or(&NULL)));
        }
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowrefly_core::Value;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn matches_by_primary_with_numeric_equality() {
        let expected = vec![
            row(&[("order_id", Value::from(1))]),
            row(&[("order_id", Value::from(42))]),
        ];
        let matcher = RowMatcher::new("order_id", None);

        let (index, _) = matcher.find(&row(&[("order_id", Value::from("42.0"))]), &expected).unwrap();
        assert_eq!(index, 1);
        assert!(matcher.find(&row(&[("order_id", Value::from(7))]), &expected).is_none());
    }

    #[test]
    fn secondary_lookup_disambiguates() {
        let expected = vec![
            row(&[("order_id", Value::from(42)), ("operation", Value::from("CREATE"))]),
            row(&[("order_id", Value::from(42)), ("operation", Value::from("RETRY"))]),
        ];
        let matcher = RowMatcher::new("order_id", Some("operation"));

        let actual = row(&[("order_id", Value::from(42)), ("operation", Value::from("RETRY"))]);
        assert_eq!(matcher.find(&actual, &expected).map(|(i, _)| i), Some(1));
        assert_eq!(matcher.describe_key(&actual), "order_id=42, operation=RETRY");
    }

    #[test]
    fn first_match_wins() {
        let expected = vec![
            row(&[("id", Value::from(1)), ("v", Value::from("a"))]),
            row(&[("id", Value::from(1)), ("v", Value::from("b"))]),
        ];
        let matcher = RowMatcher::new("id", None);
        let (index, found) = matcher.find(&row(&[("id", Value::from(1))]), &expected).unwrap();
        assert_eq!(index, 0);
        assert_eq!(found.get("v"), Some(&Value::from("a")));
    }

    #[test]
    fn from_schema_requires_primary() {
        assert!(RowMatcher::from_schema(&TableSchema::default()).is_none());
        let schema = TableSchema::default().with_primary_lookup("id").with_secondary_lookup("op");
        let matcher = RowMatcher::from_schema(&schema).unwrap();
        assert_eq!(matcher.primary(), "id");
        assert_eq!(matcher.secondary(), Some("op"));
    }
}
