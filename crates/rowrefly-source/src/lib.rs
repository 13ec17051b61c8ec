//! Row sources: where actual rows come from
//!
//! The validation engine never queries a store itself. A [`RowSource`] turns a
//! table name plus lookup keys into the rows persisted so far.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rowrefly_source::{MemoryRowSource, RowQuery, RowSource};
//!
//! let source = MemoryRowSource::new();
//! source.add_rows("orders", rows).await;
//! let fetched = source.fetch_rows(&RowQuery::new("orders").with_lookup("order_id", 42)).await?;
//! ```

pub mod memory;
pub mod snapshot;
pub mod source;

pub use memory::{MemoryRowSource, MemoryRowSourceBuilder};
pub use snapshot::SnapshotRowSource;
pub use source::{FetchError, RowQuery, RowSource};
