//! Table and column rule types

use crate::path::leaf_name;
use crate::value::Row;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;

/// Column type hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ColumnType {
    /// No hint: compared as a plain value
    #[default]
    Unset,

    /// Checked against a time-format pattern only
    Time,

    /// Embedded JSON document
    Json,
}

impl TryFrom<String> for ColumnType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" => Ok(Self::Unset),
            "time" => Ok(Self::Time),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown column type '{}' (expected time or json)", other)),
        }
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unset => write!(f, ""),
            Self::Time => write!(f, "time"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// How a JSON column is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum JsonValidateMode {
    /// Recursive structural diff
    #[default]
    Full,

    /// Only the declared required paths are resolved and compared
    RequiredOnly,
}

impl TryFrom<String> for JsonValidateMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().replace('_', "").as_str() {
            "" | "full" => Ok(Self::Full),
            "requiredonly" => Ok(Self::RequiredOnly),
            other => Err(format!("unknown JSON validate mode '{}' (expected full or requiredOnly)", other)),
        }
    }
}

impl From<JsonValidateMode> for String {
    fn from(value: JsonValidateMode) -> Self {
        match value {
            JsonValidateMode::Full => "full".to_string(),
            JsonValidateMode::RequiredOnly => "requiredOnly".to_string(),
        }
    }
}

/// Rules for one table column
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnRule {
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Null-like actual values fail
    pub not_null: bool,

    /// Acceptable values; empty means unrestricted
    pub allowed: Vec<crate::value::Value>,

    pub json_required_fields: Vec<String>,

    pub json_required_paths: Vec<String>,

    pub json_optional_paths: Vec<String>,

    pub json_ignore_paths: Vec<String>,

    pub json_validate_mode: JsonValidateMode,

    /// Overrides the default time-format pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_pattern: Option<String>,
}

impl ColumnRule {
    pub fn json() -> Self {
        Self {
            column_type: ColumnType::Json,
            ..Self::default()
        }
    }

    pub fn time() -> Self {
        Self {
            column_type: ColumnType::Time,
            ..Self::default()
        }
    }

    pub fn with_required_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.json_required_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_optional_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.json_optional_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_ignore_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.json_ignore_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    pub fn with_mode(mut self, mode: JsonValidateMode) -> Self {
        self.json_validate_mode = mode;
        self
    }

    pub fn is_json(&self) -> bool {
        self.column_type == ColumnType::Json
    }

    pub fn is_time(&self) -> bool {
        self.column_type == ColumnType::Time
    }

    /// True when any of the four path sets is non-empty
    pub fn declares_json_paths(&self) -> bool {
        !self.json_required_fields.is_empty()
            || !self.json_required_paths.is_empty()
            || !self.json_optional_paths.is_empty()
            || !self.json_ignore_paths.is_empty()
    }

    /// `jsonRequiredPaths ∪ jsonRequiredFields`, declaration order, no duplicates
    pub fn required_paths(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.json_required_paths
            .iter()
            .chain(self.json_required_fields.iter())
            .map(String::as_str)
            .filter(|p| seen.insert(*p))
            .collect()
    }

    pub fn has_required_paths(&self) -> bool {
        !self.json_required_paths.is_empty() || !self.json_required_fields.is_empty()
    }

    /// Ignore-rule membership by full path, column-relative path, then leaf name
    pub fn is_ignored(&self, full: &str, relative: &str) -> bool {
        matches_any(&self.json_ignore_paths, full, relative)
    }

    pub fn is_optional(&self, full: &str, relative: &str) -> bool {
        matches_any(&self.json_optional_paths, full, relative)
    }

    /// Whether a difference at this path is a failure
    ///
    /// Ignored and optional paths are never required. With no required paths
    /// declared every other path is required.
    pub fn is_required(&self, full: &str, relative: &str) -> bool {
        if self.is_ignored(full, relative) || self.is_optional(full, relative) {
            return false;
        }
        if !self.has_required_paths() {
            return true;
        }
        matches_any(&self.json_required_paths, full, relative)
            || matches_any(&self.json_required_fields, full, relative)
    }

    /// Fold a column schema file into this rule
    pub fn merge(&mut self, other: ColumnRule) {
        if other.column_type != ColumnType::Unset {
            self.column_type = other.column_type;
        }
        self.not_null |= other.not_null;
        if !other.allowed.is_empty() {
            self.allowed = other.allowed;
        }
        extend_unique(&mut self.json_required_fields, other.json_required_fields);
        extend_unique(&mut self.json_required_paths, other.json_required_paths);
        extend_unique(&mut self.json_optional_paths, other.json_optional_paths);
        extend_unique(&mut self.json_ignore_paths, other.json_ignore_paths);
        if other.json_validate_mode != JsonValidateMode::Full {
            self.json_validate_mode = other.json_validate_mode;
        }
        if other.time_pattern.is_some() {
            self.time_pattern = other.time_pattern;
        }
    }
}

fn matches_any(set: &[String], full: &str, relative: &str) -> bool {
    let leaf = leaf_name(full);
    [full, relative, leaf]
        .iter()
        .any(|candidate| set.iter().any(|p| p == candidate))
}

fn extend_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

/// JSON sub-schema declared in a table's `jsonColumns`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonColumnConfig {
    pub required: Vec<String>,
    pub ignored: Vec<String>,
}

impl JsonColumnConfig {
    fn apply_to(&self, rule: &mut ColumnRule) {
        rule.column_type = ColumnType::Json;
        extend_unique(&mut rule.json_required_paths, self.required.clone());
        extend_unique(&mut rule.json_ignore_paths, self.ignored.clone());
    }
}

/// Per-column override of the value comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SemanticRule {
    /// Null and missing are equivalent; only presence agreement is asserted
    NullablePresence,

    /// Actual value must be numeric and at least `min`
    AtLeast { min: i64 },
}

/// Lookup column override from `{table}_lookup.json`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LookupConfig {
    #[serde(alias = "id_column")]
    pub id_column: Option<String>,

    #[serde(alias = "order_id_column")]
    pub order_id_column: Option<String>,
}

impl LookupConfig {
    /// Probe a row for the conventional lookup columns
    ///
    /// `event_id` wins over `id`, `order_id` over `orderid`.
    pub fn infer(row: &Row) -> Self {
        let mut config = Self::default();
        for name in ["id", "orderid", "event_id", "order_id"] {
            if !row.contains_key(name) {
                continue;
            }
            match name {
                "id" | "event_id" => config.id_column = Some(name.to_string()),
                _ => config.order_id_column = Some(name.to_string()),
            }
        }
        config
    }

    pub fn is_empty(&self) -> bool {
        self.id_column.is_none() && self.order_id_column.is_none()
    }

    /// Declared lookup columns, id column first
    pub fn columns(&self) -> Vec<&str> {
        self.id_column
            .iter()
            .chain(self.order_id_column.iter())
            .map(String::as_str)
            .collect()
    }
}

/// Validation category a column is declared under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnCategory {
    Mandatory,
    Json,
    Generated,
}

impl std::fmt::Display for ColumnCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mandatory => write!(f, "mandatoryColumns"),
            Self::Json => write!(f, "jsonColumns"),
            Self::Generated => write!(f, "generatedColumns"),
        }
    }
}

/// A column declared under more than one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaConflict {
    pub column: String,
    pub categories: Vec<ColumnCategory>,
}

impl std::fmt::Display for SchemaConflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let categories: Vec<String> = self.categories.iter().map(|c| c.to_string()).collect();
        write!(f, "column '{}' is declared in {}", self.column, categories.join(", "))
    }
}

/// Validation rules for one table
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableSchema {
    /// Main join key between actual and expected rows
    #[serde(alias = "primary_lookup", skip_serializing_if = "Option::is_none")]
    pub primary_lookup: Option<String>,

    #[serde(alias = "secondary_lookup", skip_serializing_if = "Option::is_none")]
    pub secondary_lookup: Option<String>,

    /// Composite keys that must be unique across the actual rows
    #[serde(alias = "unique_constraints")]
    pub unique_constraints: Vec<Vec<String>>,

    #[serde(alias = "mandatory_columns")]
    pub mandatory_columns: Vec<String>,

    /// Columns whose absence is not a failure
    #[serde(alias = "optional_columns", alias = "optionalFields")]
    pub optional_columns: Vec<String>,

    #[serde(alias = "json_columns")]
    pub json_columns: IndexMap<String, JsonColumnConfig>,

    /// Checked for non-null presence only
    #[serde(alias = "generated_columns")]
    pub generated_columns: Vec<String>,

    #[serde(alias = "semantic_rules")]
    pub semantic_rules: IndexMap<String, SemanticRule>,

    #[serde(alias = "rules")]
    pub columns: IndexMap<String, ColumnRule>,

    /// Grouping column for retry counts
    #[serde(alias = "operation_column", skip_serializing_if = "Option::is_none")]
    pub operation_column: Option<String>,
}

impl TableSchema {
    pub fn with_primary_lookup(mut self, column: impl Into<String>) -> Self {
        self.primary_lookup = Some(column.into());
        self
    }

    pub fn with_secondary_lookup(mut self, column: impl Into<String>) -> Self {
        self.secondary_lookup = Some(column.into());
        self
    }

    pub fn with_column_rule(mut self, column: impl Into<String>, rule: ColumnRule) -> Self {
        self.columns.insert(column.into(), rule);
        self
    }

    pub fn with_unique_constraint<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_constraints.push(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Columns declared in more than one of mandatory/json/generated
    pub fn conflicts(&self) -> Vec<SchemaConflict> {
        let mut categories: IndexMap<&str, Vec<ColumnCategory>> = IndexMap::new();
        let declared = self
            .mandatory_columns
            .iter()
            .map(|c| (c.as_str(), ColumnCategory::Mandatory))
            .chain(self.json_columns.keys().map(|c| (c.as_str(), ColumnCategory::Json)))
            .chain(self.generated_columns.iter().map(|c| (c.as_str(), ColumnCategory::Generated)));

        for (column, category) in declared {
            let entry = categories.entry(column).or_default();
            if !entry.contains(&category) {
                entry.push(category);
            }
        }

        categories
            .into_iter()
            .filter(|(_, cats)| cats.len() > 1)
            .map(|(column, categories)| SchemaConflict {
                column: column.to_string(),
                categories,
            })
            .collect()
    }

    /// True when the schema names the columns to check explicitly
    pub fn declares_columns(&self) -> bool {
        !self.mandatory_columns.is_empty() || !self.json_columns.is_empty() || !self.generated_columns.is_empty()
    }

    /// Columns to check for one expected row
    ///
    /// Declared columns when the schema names any, otherwise every column of
    /// the expected row.
    pub fn checked_columns(&self, expected: &Row) -> Vec<String> {
        if !self.declares_columns() {
            return expected.keys().cloned().collect();
        }

        let mut seen = HashSet::new();
        self.mandatory_columns
            .iter()
            .chain(self.json_columns.keys())
            .chain(self.generated_columns.iter())
            .chain(self.optional_columns.iter())
            .filter(|c| seen.insert(c.as_str()))
            .cloned()
            .collect()
    }

    /// Rule for a column with any `jsonColumns` entry folded in
    ///
    /// `None` means no rule was declared; the column is compared as a plain
    /// value with default behavior.
    pub fn effective_rule(&self, column: &str) -> Option<Cow<'_, ColumnRule>> {
        match (self.columns.get(column), self.json_columns.get(column)) {
            (rule, Some(json)) => {
                let mut merged = rule.cloned().unwrap_or_default();
                json.apply_to(&mut merged);
                Some(Cow::Owned(merged))
            }
            (Some(rule), None) => Some(Cow::Borrowed(rule)),
            (None, None) => None,
        }
    }

    pub fn is_optional(&self, column: &str) -> bool {
        self.optional_columns.iter().any(|c| c == column)
    }

    pub fn is_generated(&self, column: &str) -> bool {
        self.generated_columns.iter().any(|c| c == column)
    }

    pub fn semantic_rule(&self, column: &str) -> Option<&SemanticRule> {
        self.semantic_rules.get(column)
    }

    /// Grouping column for retry counts, falling back to `default`
    pub fn operation_column<'a>(&'a self, default: &'a str) -> &'a str {
        self.operation_column.as_deref().unwrap_or(default)
    }
}
