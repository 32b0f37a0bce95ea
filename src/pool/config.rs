use std::path::PathBuf;

use super::Pool;
use super::bootstrap::SchemaDrift;
use super::scheduler::SelectionPolicy;
use crate::error::SqlPoolError;
use crate::events::{ErrorSink, EventSink, PoolEvent};
use crate::results::QueryResult;
use crate::sqlite::ConnectionOptions;

pub const DEFAULT_POOL_SIZE: usize = 5;

/// Everything [`Pool::new`] needs to open and bootstrap a pool.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub pool_size: usize,
    pub selection: SelectionPolicy,
    pub events: EventSink,
    pub error_sink: Option<ErrorSink>,
    pub schema_file: Option<PathBuf>,
    pub schema_drift: SchemaDrift,
    pub connection: ConnectionOptions,
}

impl PoolOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            selection: SelectionPolicy::default(),
            events: EventSink::default(),
            error_sink: None,
            schema_file: None,
            schema_drift: SchemaDrift::default(),
            connection: ConnectionOptions::new(db_path),
        }
    }
}

/// Fluent builder for [`PoolOptions`].
///
/// ```rust,no_run
/// use sqlite_loadpool::prelude::*;
///
/// # async fn demo() -> Result<(), SqlPoolError> {
/// let pool = Pool::builder("app.db")
///     .pool_size(4)
///     .selection(SelectionPolicy::LeastLoaded)
///     .schema_file("schema.sql")
///     .pragma("foreign_keys", "ON")
///     .on_event(|event| eprintln!("{event}"))
///     .build()
///     .await?;
/// # let _ = pool;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PoolOptionsBuilder {
    opts: PoolOptions,
    error: Option<String>,
}

impl PoolOptionsBuilder {
    #[must_use]
    pub fn new(db_path: impl Into<String>) -> Self {
        Self {
            opts: PoolOptions::new(db_path.into()),
            error: None,
        }
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.opts.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn selection(mut self, selection: SelectionPolicy) -> Self {
        self.opts.selection = selection;
        self
    }

    #[must_use]
    pub fn events(mut self, events: EventSink) -> Self {
        self.opts.events = events;
        self
    }

    #[must_use]
    pub fn on_event(self, f: impl Fn(&PoolEvent) + Send + Sync + 'static) -> Self {
        self.events(EventSink::new(f))
    }

    #[must_use]
    pub fn on_error(
        mut self,
        f: impl Fn(SqlPoolError, &str) -> Result<QueryResult, SqlPoolError> + Send + Sync + 'static,
    ) -> Self {
        self.opts.error_sink = Some(ErrorSink::new(f));
        self
    }

    #[must_use]
    pub fn schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.opts.schema_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn schema_drift(mut self, drift: SchemaDrift) -> Self {
        self.opts.schema_drift = drift;
        self
    }

    /// Override an engine pragma. Invalid names or values surface from
    /// [`finish`](Self::finish) / [`build`](Self::build).
    #[must_use]
    pub fn pragma(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.opts.connection.clone().pragma(name, value) {
            Ok(connection) => self.opts.connection = connection,
            Err(err) => self.error = Some(err.to_string()),
        }
        self
    }

    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] for a zero pool size or a
    /// rejected pragma.
    pub fn finish(self) -> Result<PoolOptions, SqlPoolError> {
        if let Some(message) = self.error {
            return Err(SqlPoolError::InvalidArgument(message));
        }
        if self.opts.pool_size == 0 {
            return Err(SqlPoolError::invalid("pool size must be at least 1"));
        }
        Ok(self.opts)
    }

    /// Open the pool.
    ///
    /// # Errors
    /// See [`PoolOptionsBuilder::finish`] and [`Pool::new`].
    pub async fn build(self) -> Result<Pool, SqlPoolError> {
        Pool::new(self.finish()?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opts = PoolOptionsBuilder::new("x.db").finish().unwrap();
        assert_eq!(opts.pool_size, DEFAULT_POOL_SIZE);
        assert_eq!(opts.selection, SelectionPolicy::LeastLoaded);
        assert_eq!(opts.schema_drift, SchemaDrift::Fail);
        assert!(opts.error_sink.is_none());
    }

    #[test]
    fn zero_pool_size_is_rejected() {
        let err = PoolOptionsBuilder::new("x.db").pool_size(0).finish().unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
    }

    #[test]
    fn bad_pragma_surfaces_on_finish() {
        let err = PoolOptionsBuilder::new("x.db")
            .pragma("cache_size", "1; DROP TABLE x")
            .pragma("foreign_keys", "ON")
            .finish()
            .unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
    }
}
