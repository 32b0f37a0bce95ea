use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlPoolError {
    /// The engine rejected a statement or the session failed.
    #[error(transparent)]
    DriverError(#[from] rusqlite::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Schema file not found: {}", .0.display())]
    SchemaMissing(PathBuf),

    #[error("Schema version {stored} differs from schema file version {current}; migrations are not supported")]
    SchemaOutdated { stored: i64, current: i64 },

    #[error("In-flight counter for slot {slot} would go negative")]
    SelectionInvariantViolation { slot: usize },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SqlPoolError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SqlPoolError::InvalidArgument(message.into())
    }

    /// Whether this error came out of the engine or the session carrying it,
    /// i.e. whether a configured error sink gets to see it.
    #[must_use]
    pub fn is_driver_failure(&self) -> bool {
        matches!(
            self,
            SqlPoolError::DriverError(_) | SqlPoolError::ConnectionError(_)
        )
    }
}
