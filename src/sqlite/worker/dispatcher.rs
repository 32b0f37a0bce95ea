use std::sync::mpsc::Receiver;

use rusqlite::Connection;

use crate::error::SqlPoolError;
use crate::sqlite::config::ConnectionOptions;
use crate::sqlite::query::build_query_result;

use super::channel::Command;

/// Open the session and apply every effective pragma, in order.
pub(super) fn open_connection(options: &ConnectionOptions) -> Result<Connection, SqlPoolError> {
    let conn = Connection::open(&options.db_path)?;
    for (name, value) in options.effective_pragmas() {
        conn.execute_batch(&format!("PRAGMA {name} = {value};"))?;
    }
    Ok(conn)
}

/// Serve commands until the pool asks this slot to close. The session is
/// released before a `Close` is acknowledged.
pub(super) fn run_sqlite_worker(slot: usize, conn: Connection, receiver: &Receiver<Command>) {
    let respond_to = loop {
        let Ok(command) = receiver.recv() else {
            break None;
        };
        match command {
            Command::ExecuteBatch { query, respond_to } => {
                let res = conn.execute_batch(&query).map_err(SqlPoolError::from);
                let _ = respond_to.send(res);
            }
            Command::Query {
                query,
                params,
                respond_to,
            } => {
                let _ = respond_to.send(build_query_result(&conn, &query, &params));
            }
            Command::Close { respond_to } => break Some(respond_to),
            Command::Shutdown => break None,
        }
    };

    let res = finish(conn);
    match respond_to {
        Some(respond_to) => {
            let _ = respond_to.send(res);
        }
        None => {
            if let Err(err) = res {
                tracing::warn!(slot, error = %err, "closing SQLite session failed during shutdown");
            }
        }
    }
}

/// `PRAGMA optimize`, then close the session.
fn finish(conn: Connection) -> Result<(), SqlPoolError> {
    let optimized = conn.execute_batch("PRAGMA optimize;");
    conn.close().map_err(|(_, err)| err)?;
    optimized?;
    Ok(())
}
