use super::Pool;
use crate::error::SqlPoolError;
use crate::query_builder::{BuildStatement, Delete, Insert, Select, Update};
use crate::results::QueryResult;

/// Statement helpers: render through the builder, then dispatch like
/// [`Pool::query`]. Render errors never reach the error sink.
impl Pool {
    /// # Errors
    /// [`SqlPoolError::InvalidArgument`] if the statement cannot be rendered,
    /// otherwise as [`Pool::query`].
    pub async fn select(&self, select: &Select) -> Result<QueryResult, SqlPoolError> {
        self.execute(select).await
    }

    /// # Errors
    /// As [`Pool::select`].
    pub async fn insert(&self, insert: &Insert) -> Result<QueryResult, SqlPoolError> {
        self.execute(insert).await
    }

    /// # Errors
    /// As [`Pool::select`].
    pub async fn update(&self, update: &Update) -> Result<QueryResult, SqlPoolError> {
        self.execute(update).await
    }

    /// # Errors
    /// As [`Pool::select`].
    pub async fn delete(&self, delete: &Delete) -> Result<QueryResult, SqlPoolError> {
        self.execute(delete).await
    }

    /// # Errors
    /// As [`Pool::select`].
    pub async fn execute(&self, statement: &impl BuildStatement) -> Result<QueryResult, SqlPoolError> {
        let sql = statement.build()?;
        self.query(&sql).await
    }
}
