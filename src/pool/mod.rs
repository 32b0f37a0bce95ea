//! A fixed set of `SQLite` connections behind one handle, with per-slot load
//! tracking and schema bootstrap on first start.

pub mod bootstrap;
pub mod config;
pub mod scheduler;
pub mod stats;

mod commands;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

pub use bootstrap::{SchemaDrift, SchemaSource, split_statements};
pub use config::{DEFAULT_POOL_SIZE, PoolOptions, PoolOptionsBuilder};
pub use scheduler::SelectionPolicy;
pub use stats::{PoolStatistics, StorageStats};

use scheduler::Scheduler;
use stats::STORAGE_QUERY;

use crate::error::SqlPoolError;
use crate::events::ErrorSink;
use crate::results::QueryResult;
use crate::sqlite::SqliteConnection;
use crate::sqlite::config::is_private_memory;
use crate::types::SqlValue;

/// Handle to the pool. Cheap to clone; every clone dispatches through the same
/// slots and counters.
#[derive(Clone, Debug)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    slots: Vec<SqliteConnection>,
    scheduler: Arc<Mutex<Scheduler>>,
    error_sink: Option<ErrorSink>,
    storage: Mutex<Option<StorageStats>>,
    sampling: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One request counted against a slot. It travels with the task awaiting the
/// worker's reply and settles the counter when that task finishes.
struct Lease {
    scheduler: Arc<Mutex<Scheduler>>,
    slot: usize,
}

impl Lease {
    fn acquire(scheduler: &Arc<Mutex<Scheduler>>) -> Self {
        let slot = lock(scheduler).acquire();
        Lease {
            scheduler: Arc::clone(scheduler),
            slot,
        }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if let Err(err) = lock(&self.scheduler).release(self.slot) {
            tracing::error!(slot = self.slot, error = %err, "in-flight counter out of balance");
        }
    }
}

impl Pool {
    /// Start configuring a pool over `db_path`.
    #[must_use]
    pub fn builder(db_path: impl Into<String>) -> PoolOptionsBuilder {
        PoolOptionsBuilder::new(db_path)
    }

    /// Open every slot. On a database that does not exist yet, the schema
    /// file (if any) is applied through slot 0 before the other slots open.
    /// Private in-memory databases (`:memory:`) are separate per slot, so
    /// each slot has the schema applied as it opens.
    ///
    /// # Errors
    /// - [`SqlPoolError::InvalidArgument`] for a pool size of zero
    /// - [`SqlPoolError::SchemaMissing`] if the schema file does not exist
    /// - [`SqlPoolError::SchemaOutdated`] on drift under [`SchemaDrift::Fail`]
    /// - [`SqlPoolError::DriverError`] if opening or bootstrapping fails
    pub async fn new(options: PoolOptions) -> Result<Self, SqlPoolError> {
        if options.pool_size == 0 {
            return Err(SqlPoolError::invalid("pool size must be at least 1"));
        }
        let existed = options.connection.database_exists();
        let schema = options
            .schema_file
            .as_deref()
            .map(SchemaSource::load)
            .transpose()?;

        let private_memory = is_private_memory(&options.connection.db_path);
        let first =
            SqliteConnection::open(options.connection.clone(), 0, options.events.clone()).await?;
        if let Some(schema) = &schema {
            if existed {
                if let Err(err) =
                    bootstrap::check_version(&first, schema, options.schema_drift, &options.events)
                        .await
                {
                    shutdown_quietly(&first).await;
                    return Err(err);
                }
            } else if let Err(err) = bootstrap::install(&first, schema, &options.events).await {
                shutdown_quietly(&first).await;
                bootstrap::discard_database(&options.connection.db_path);
                return Err(err);
            }
        }

        // A private in-memory database exists once per connection, so each
        // slot gets the schema before it can take queries.
        let per_slot_schema = schema.as_ref().filter(|_| private_memory);
        let mut slots = Vec::with_capacity(options.pool_size);
        slots.push(first);
        for slot in 1..options.pool_size {
            match open_slot(&options, slot, per_slot_schema).await {
                Ok(conn) => slots.push(conn),
                Err(err) => {
                    for opened in &slots {
                        shutdown_quietly(opened).await;
                    }
                    return Err(err);
                }
            }
        }

        tracing::info!(
            db_path = %options.connection.db_path,
            size = options.pool_size,
            policy = %options.selection,
            "pool ready"
        );
        Ok(Pool {
            inner: Arc::new(PoolInner {
                slots,
                scheduler: Arc::new(Mutex::new(Scheduler::new(
                    options.pool_size,
                    options.selection,
                ))),
                error_sink: options.error_sink,
                storage: Mutex::new(None),
                sampling: AtomicBool::new(false),
            }),
        })
    }

    /// Run one statement on the slot the selection policy picks.
    ///
    /// # Errors
    /// Engine failures go to the configured error sink first; without one, or
    /// when the sink hands the error back, it propagates here.
    pub async fn query(&self, query: &str) -> Result<QueryResult, SqlPoolError> {
        self.dispatch(query, &[], true).await
    }

    /// [`Pool::query`] with positional `?` parameters bound by the engine.
    ///
    /// # Errors
    /// See [`Pool::query`]; unbindable parameters fail with
    /// [`SqlPoolError::InvalidArgument`].
    pub async fn query_with_params(
        &self,
        query: &str,
        params: &[SqlValue],
    ) -> Result<QueryResult, SqlPoolError> {
        self.dispatch(query, params, true).await
    }

    async fn dispatch(
        &self,
        query: &str,
        params: &[SqlValue],
        route_errors: bool,
    ) -> Result<QueryResult, SqlPoolError> {
        let owned_query = query.to_owned();
        let params = params.to_vec();
        let res = self
            .on_slot(move |conn| async move { conn.query(owned_query, &params).await })
            .await;

        match (res, &self.inner.error_sink) {
            (Err(err), Some(sink)) if route_errors && err.is_driver_failure() => {
                sink.handle(err, query)
            }
            (res, _) => res,
        }
    }

    /// Lease a slot and run `op` against its connection on a spawned task that
    /// owns the lease. Dropping the returned future does not stop that task, so
    /// the slot stays counted until its worker has answered.
    async fn on_slot<T, F, Fut>(&self, op: F) -> Result<T, SqlPoolError>
    where
        T: Send + 'static,
        F: FnOnce(SqliteConnection) -> Fut,
        Fut: Future<Output = Result<T, SqlPoolError>> + Send + 'static,
    {
        let lease = Lease::acquire(&self.inner.scheduler);
        let slot = lease.slot;
        tracing::debug!(slot, "dispatching to slot");
        let work = op(self.inner.slots[slot].clone());
        tokio::spawn(async move {
            let res = work.await;
            drop(lease);
            res
        })
        .await
        .map_err(|err| SqlPoolError::ConnectionError(format!("slot {slot} task failed: {err}")))?
    }

    /// Round trip the connection's no-op statement through the normal
    /// selection path.
    ///
    /// # Errors
    /// Returns [`SqlPoolError`] if the chosen slot fails; the error sink is
    /// not consulted.
    pub async fn ping(&self) -> Result<Duration, SqlPoolError> {
        let started = Instant::now();
        self.on_slot(|conn| async move { conn.ping().await }).await?;
        Ok(started.elapsed())
    }

    /// Current size, policy, and per-slot load. Storage counters come from
    /// the most recent background sample; this call starts a new sample when
    /// running inside a Tokio runtime and none is pending.
    #[must_use]
    pub fn statistics(&self) -> PoolStatistics {
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            if !self.inner.sampling.swap(true, Ordering::AcqRel) {
                let pool = self.clone();
                handle.spawn(async move {
                    if let Err(err) = pool.sample_storage().await {
                        tracing::warn!(error = %err, "storage sample failed");
                    }
                });
            }
        }
        self.snapshot()
    }

    /// Like [`Pool::statistics`], but waits for a fresh storage sample.
    ///
    /// # Errors
    /// Returns [`SqlPoolError`] if the storage query fails.
    pub async fn refresh_statistics(&self) -> Result<PoolStatistics, SqlPoolError> {
        self.inner.sampling.store(true, Ordering::Release);
        self.sample_storage().await?;
        Ok(self.snapshot())
    }

    async fn sample_storage(&self) -> Result<(), SqlPoolError> {
        let res = self.dispatch(STORAGE_QUERY, &[], false).await;
        self.inner.sampling.store(false, Ordering::Release);
        let storage = StorageStats::from_pragma_row(&res?)?;
        *lock(&self.inner.storage) = Some(storage);
        Ok(())
    }

    fn snapshot(&self) -> PoolStatistics {
        let (in_flight, policy) = {
            let scheduler = lock(&self.inner.scheduler);
            (scheduler.in_flight(), scheduler.policy())
        };
        PoolStatistics {
            size: self.inner.slots.len(),
            policy,
            in_flight,
            storage: *lock(&self.inner.storage),
        }
    }

    /// Close every slot. Later queries fail with
    /// [`SqlPoolError::ConnectionError`].
    ///
    /// # Errors
    /// Returns the first close failure; every slot is still asked to close.
    pub async fn close(&self) -> Result<(), SqlPoolError> {
        let mut first_err = None;
        for conn in &self.inner.slots {
            if let Err(err) = conn.close().await {
                tracing::warn!(slot = conn.slot(), error = %err, "close failed");
                first_err.get_or_insert(err);
            }
        }
        tracing::info!(size = self.inner.slots.len(), "pool closed");
        first_err.map_or(Ok(()), Err)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.slots.len()
    }

    #[must_use]
    pub fn policy(&self) -> SelectionPolicy {
        lock(&self.inner.scheduler).policy()
    }
}

/// Open one more slot, applying `schema` to it first when given.
async fn open_slot(
    options: &PoolOptions,
    slot: usize,
    schema: Option<&SchemaSource>,
) -> Result<SqliteConnection, SqlPoolError> {
    let conn =
        SqliteConnection::open(options.connection.clone(), slot, options.events.clone()).await?;
    if let Some(schema) = schema {
        if let Err(err) = bootstrap::install(&conn, schema, &options.events).await {
            shutdown_quietly(&conn).await;
            return Err(err);
        }
    }
    Ok(conn)
}

async fn shutdown_quietly(conn: &SqliteConnection) {
    if let Err(err) = conn.close().await {
        tracing::warn!(slot = conn.slot(), error = %err, "close during failed startup");
    }
}
