//! RowRefly Core
//!
//! Domain model shared by every rowrefly crate: loosely-typed row values and
//! their semantic comparison, JSON path syntax, table/column rules, the schema
//! registry, report types and configuration.
//! Never rename check codes - they are part of the report format.

pub mod check;
pub mod config;
pub mod expected;
pub mod path;
pub mod registry;
pub mod report;
pub mod scenario;
pub mod schema;
pub mod value;

pub use check::{CheckCode, CheckStatus, ColumnResult};
pub use config::{Config, ConfigError, FetchConfig, MatchingConfig, PathsConfig, SkipRules};
pub use expected::{fixture_rows, ExpectedSet};
pub use path::{JsonPath, PathError, Segment};
pub use registry::{RegistryBuilder, RegistryError, SchemaRegistry};
pub use report::{
    CaseReport, CaseStatus, GlobalError, GlobalErrorKind, ReportBuilder, ReportStatus, ReportVersion,
    SuiteReport, SuiteSummary, ValidationReport,
};
pub use scenario::{RetryExpectation, Scenario, TableExpectation};
pub use schema::{
    ColumnCategory, ColumnRule, ColumnType, JsonColumnConfig, JsonValidateMode, LookupConfig, SchemaConflict,
    SemanticRule, TableSchema,
};
pub use value::{normalize, values_equal, Normalized, Row, Value};
