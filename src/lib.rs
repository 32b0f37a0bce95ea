//! A small pool of `SQLite` connections behind one async handle, plus a
//! builder that renders structured filters and records into SQL text.
//!
//! ```rust,no_run
//! use sqlite_loadpool::prelude::*;
//!
//! # async fn demo() -> Result<(), SqlPoolError> {
//! let pool = Pool::builder("app.db").pool_size(3).build().await?;
//! pool.insert(&Insert::table("users").row(Record::new().set("name", "alice")))
//!     .await?;
//! let adults = Select::table("users")
//!     .filter(FilterNode::compare("age", ">=", 18)?)
//!     .order(OrderBy::new().asc("name"))
//!     .limit(10_u64);
//! let res = pool.select(&adults).await?;
//! # let _ = res;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod events;
pub mod pool;
pub mod prelude;
pub mod query_builder;
pub mod results;
pub mod sqlite;
pub mod types;

pub use error::SqlPoolError;
pub use events::{ErrorSink, EventSink, PoolEvent};
pub use pool::{Pool, PoolOptions, PoolOptionsBuilder, PoolStatistics, SelectionPolicy};
pub use query_builder::BuildStatement;
pub use results::{QueryResult, Row};
pub use types::SqlValue;
