use rusqlite::types::Value;
use tokio::sync::oneshot;

use crate::error::SqlPoolError;
use crate::results::QueryResult;

pub(super) type Reply<T> = oneshot::Sender<Result<T, SqlPoolError>>;

pub(super) enum Command {
    ExecuteBatch {
        query: String,
        respond_to: Reply<()>,
    },
    Query {
        query: String,
        params: Vec<Value>,
        respond_to: Reply<QueryResult>,
    },
    Close {
        respond_to: Reply<()>,
    },
    Shutdown,
}
