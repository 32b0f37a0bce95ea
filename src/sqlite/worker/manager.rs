use std::sync::mpsc::{self, Sender};
use std::thread;

use rusqlite::types::Value;
use tokio::sync::oneshot;

use crate::error::SqlPoolError;
use crate::results::QueryResult;
use crate::sqlite::config::ConnectionOptions;

use super::channel::{Command, Reply};
use super::dispatcher::{open_connection, run_sqlite_worker};

pub(super) struct SqliteWorker {
    sender: Sender<Command>,
    slot: usize,
}

impl SqliteWorker {
    /// Spawn the worker thread and wait until it has opened the session and
    /// applied its pragmas.
    pub(super) async fn spawn(
        options: ConnectionOptions,
        slot: usize,
    ) -> Result<Self, SqlPoolError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), SqlPoolError>>();
        thread::Builder::new()
            .name(format!("sqlite-slot-{slot}"))
            .spawn(move || match open_connection(&options) {
                Ok(conn) => {
                    let _ = ready_tx.send(Ok(()));
                    run_sqlite_worker(slot, conn, &receiver);
                }
                Err(err) => {
                    let _ = ready_tx.send(Err(err));
                }
            })
            .map_err(|err| {
                SqlPoolError::ConnectionError(format!(
                    "failed to spawn SQLite worker thread for slot {slot}: {err}"
                ))
            })?;

        ready_rx
            .await
            .map_err(|_| connection_error("SQLite worker exited before opening"))??;
        Ok(Self { sender, slot })
    }

    pub(super) fn slot(&self) -> usize {
        self.slot
    }

    fn send_command(&self, command: Command) -> Result<(), SqlPoolError> {
        self.sender
            .send(command)
            .map_err(|_| connection_error("SQLite worker closed"))
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
        drop_message: &'static str,
    ) -> Result<T, SqlPoolError> {
        let (tx, rx) = oneshot::channel();
        self.send_command(build(tx))?;
        rx.await.map_err(|_| connection_error(drop_message))?
    }

    pub(super) async fn execute_batch(&self, query: String) -> Result<(), SqlPoolError> {
        self.request(
            |respond_to| Command::ExecuteBatch { query, respond_to },
            "SQLite worker dropped while executing batch",
        )
        .await
    }

    pub(super) async fn query(
        &self,
        query: String,
        params: Vec<Value>,
    ) -> Result<QueryResult, SqlPoolError> {
        self.request(
            |respond_to| Command::Query {
                query,
                params,
                respond_to,
            },
            "SQLite worker dropped while executing query",
        )
        .await
    }

    pub(super) async fn close(&self) -> Result<(), SqlPoolError> {
        self.request(
            |respond_to| Command::Close { respond_to },
            "SQLite worker dropped while closing",
        )
        .await
    }
}

impl Drop for SqliteWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
    }
}

fn connection_error(message: &str) -> SqlPoolError {
    SqlPoolError::ConnectionError(message.into())
}
