//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::error::SqlPoolError;
pub use crate::events::{ErrorSink, EventSink, PoolEvent};
pub use crate::pool::{
    Pool, PoolOptions, PoolOptionsBuilder, PoolStatistics, SchemaDrift, SelectionPolicy,
    StorageStats,
};
pub use crate::query_builder::{
    BuildStatement, Delete, Direction, Fields, FilterNode, Insert, Limit, OrderBy, Record, Select,
    TableRef, Update,
};
pub use crate::results::{QueryResult, Row};
pub use crate::types::SqlValue;
