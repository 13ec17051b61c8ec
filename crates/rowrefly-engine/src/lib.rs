//! RowRefly engine - validation logic
//!
//! Pure functions from (schema, expected rows, actual rows) to a report:
//! - Row matching by lookup keys
//! - Scalar column checks (value, time, datetime, allowed set, not-null)
//! - JSON path comparison, full and required-only
//! - Set constraints: composite-key uniqueness, retry counts, persistence
//!
//! The [`SuiteRunner`] drives these per scenario over a [`rowrefly_source::RowSource`].

pub mod column;
pub mod constraints;
pub mod json_compare;
pub mod row_matcher;
pub mod suite;
pub mod table_validator;

pub use column::{is_datetime_like, DATETIME_PATTERN, DEFAULT_TIME_PATTERN};
pub use constraints::{check_persistence, check_retry_counts, check_unique_constraints, find_duplicates, DuplicateKey};
pub use json_compare::compare_json_column;
pub use row_matcher::RowMatcher;
pub use suite::{FetchPolicy, SuiteRunner};
pub use table_validator::{TableCheck, TableValidator, ValidatorOptions};
