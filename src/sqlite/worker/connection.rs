use std::fmt;
use std::sync::Arc;

use crate::error::SqlPoolError;
use crate::events::{EventSink, PoolEvent};
use crate::results::QueryResult;
use crate::sqlite::config::ConnectionOptions;
use crate::sqlite::params::Params;
use crate::types::SqlValue;

use super::manager::SqliteWorker;

/// One live `SQLite` session, owned by a dedicated worker thread.
#[derive(Clone)]
pub struct SqliteConnection {
    worker: Arc<SqliteWorker>,
    events: EventSink,
}

impl SqliteConnection {
    /// Open a session, apply the effective pragmas, and report
    /// [`PoolEvent::Opened`] (or [`PoolEvent::ConnectionError`]) to `events`.
    ///
    /// # Errors
    /// Returns [`SqlPoolError`] if the worker thread cannot be spawned, the
    /// database cannot be opened, or a pragma is rejected.
    pub async fn open(
        options: ConnectionOptions,
        slot: usize,
        events: EventSink,
    ) -> Result<Self, SqlPoolError> {
        match SqliteWorker::spawn(options, slot).await {
            Ok(worker) => {
                events.emit(&PoolEvent::Opened { slot });
                Ok(Self {
                    worker: Arc::new(worker),
                    events,
                })
            }
            Err(err) => {
                events.emit(&PoolEvent::ConnectionError {
                    slot,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    #[must_use]
    pub fn slot(&self) -> usize {
        self.worker.slot()
    }

    /// Execute one or more statements without collecting results.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::DriverError`] if the engine rejects the batch.
    pub async fn exec(&self, query: impl Into<String>) -> Result<(), SqlPoolError> {
        let res = self.worker.execute_batch(query.into()).await;
        self.observe(res)
    }

    /// Run one statement with positional parameters.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] for unbindable parameters and
    /// [`SqlPoolError::DriverError`] if the engine rejects the statement.
    pub async fn query(
        &self,
        query: impl Into<String>,
        params: &[SqlValue],
    ) -> Result<QueryResult, SqlPoolError> {
        let params = Params::convert(params)?;
        let res = self.worker.query(query.into(), params.0).await;
        self.observe(res)
    }

    /// Cheapest round trip the engine offers.
    ///
    /// # Errors
    /// Returns [`SqlPoolError`] if the session is gone.
    pub async fn ping(&self) -> Result<(), SqlPoolError> {
        self.query("PRAGMA encoding", &[]).await.map(|_| ())
    }

    /// Run `PRAGMA optimize` and end the session. Later calls fail with
    /// [`SqlPoolError::ConnectionError`].
    ///
    /// # Errors
    /// Returns [`SqlPoolError`] if the final optimize fails.
    pub async fn close(&self) -> Result<(), SqlPoolError> {
        let res = self.worker.close().await;
        self.events.emit(&PoolEvent::Closed { slot: self.slot() });
        res
    }

    fn observe<T>(&self, res: Result<T, SqlPoolError>) -> Result<T, SqlPoolError> {
        if let Err(SqlPoolError::ConnectionError(message)) = &res {
            self.events.emit(&PoolEvent::ConnectionError {
                slot: self.slot(),
                message: message.clone(),
            });
        }
        res
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("slot", &self.slot())
            .finish()
    }
}
