use std::fmt;
use std::sync::Arc;

use crate::error::SqlPoolError;
use crate::results::QueryResult;

/// Lifecycle and bootstrap notifications emitted by connections and the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolEvent {
    Opened { slot: usize },
    Closed { slot: usize },
    ConnectionError { slot: usize, message: String },
    /// One schema statement ran during bootstrap.
    TableCreated {
        statement: usize,
        inserted_id: Option<i64>,
        rows_changed: u64,
    },
    /// Bootstrap finished and recorded this schema version.
    SchemaStamped { version: i64 },
    SchemaUpToDate { version: i64 },
    /// The database predates version stamping; nothing was applied.
    SchemaUnversioned { current: i64 },
    SchemaDrift { stored: i64, current: i64 },
}

impl fmt::Display for PoolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolEvent::Opened { slot } => write!(f, "Connection {slot} opened"),
            PoolEvent::Closed { slot } => write!(f, "Connection {slot} closed"),
            PoolEvent::ConnectionError { slot, message } => {
                write!(f, "Connection {slot} error: {message}")
            }
            PoolEvent::TableCreated {
                statement,
                inserted_id: Some(id),
                rows_changed,
            } => write!(
                f,
                "Schema statement {statement} OK, insert id {id}, {rows_changed} row(s) changed"
            ),
            PoolEvent::TableCreated {
                statement,
                inserted_id: None,
                rows_changed,
            } => write!(
                f,
                "Schema statement {statement} OK, {rows_changed} row(s) changed"
            ),
            PoolEvent::SchemaStamped { version } => write!(f, "Schema version {version} installed"),
            PoolEvent::SchemaUpToDate { version } => write!(f, "Schema version {version} is up to date"),
            PoolEvent::SchemaUnversioned { current } => write!(
                f,
                "Existing database carries no schema version (schema file is {current}); nothing applied"
            ),
            PoolEvent::SchemaDrift { stored, current } => write!(
                f,
                "Schema version {stored} differs from schema file version {current}; migrations are not supported"
            ),
        }
    }
}

type EventFn = dyn Fn(&PoolEvent) + Send + Sync;

/// Receiver of [`PoolEvent`]s. Defaults to printing each event on stdout.
#[derive(Clone)]
pub struct EventSink(Arc<EventFn>);

impl EventSink {
    pub fn new(f: impl Fn(&PoolEvent) + Send + Sync + 'static) -> Self {
        EventSink(Arc::new(f))
    }

    #[must_use]
    pub fn stdout() -> Self {
        EventSink::new(|event| println!("{event}"))
    }

    #[must_use]
    pub fn silent() -> Self {
        EventSink::new(|_| {})
    }

    pub fn emit(&self, event: &PoolEvent) {
        (self.0)(event);
    }
}

impl Default for EventSink {
    fn default() -> Self {
        EventSink::stdout()
    }
}

impl fmt::Debug for EventSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventSink(..)")
    }
}

type ErrorFn = dyn Fn(SqlPoolError, &str) -> Result<QueryResult, SqlPoolError> + Send + Sync;

/// Handler for failed dispatches. Receives the error and the offending
/// statement; returning `Ok` substitutes a result for the caller, returning
/// `Err` propagates.
#[derive(Clone)]
pub struct ErrorSink(Arc<ErrorFn>);

impl ErrorSink {
    pub fn new(
        f: impl Fn(SqlPoolError, &str) -> Result<QueryResult, SqlPoolError> + Send + Sync + 'static,
    ) -> Self {
        ErrorSink(Arc::new(f))
    }

    /// # Errors
    /// Whatever the handler decides to propagate.
    pub fn handle(&self, err: SqlPoolError, statement: &str) -> Result<QueryResult, SqlPoolError> {
        (self.0)(err, statement)
    }
}

impl fmt::Debug for ErrorSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ErrorSink(..)")
    }
}
