use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::UNIX_EPOCH;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SqlPoolError;
use crate::events::{EventSink, PoolEvent};
use crate::sqlite::SqliteConnection;
use crate::sqlite::config::is_in_memory;

/// What to do when an existing database was stamped from a different schema
/// file version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaDrift {
    /// Abort pool startup with [`SqlPoolError::SchemaOutdated`].
    #[default]
    Fail,
    /// Emit [`PoolEvent::SchemaDrift`], log a warning, and carry on.
    Warn,
}

/// A schema file split into executable statements, plus the version stamp it
/// installs.
#[derive(Debug, Clone)]
pub struct SchemaSource {
    pub path: PathBuf,
    pub statements: Vec<String>,
    pub version: i64,
}

static TABLE_OPTIONS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\s+(?:ENGINE|(?:DEFAULT\s+)?(?:CHARSET|CHARACTER\s+SET)|COLLATE|AUTO_INCREMENT)\s*=\s*\w+",
    )
    .expect("static regex")
});
static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--[^\n]*").expect("static regex"));

impl SchemaSource {
    /// Read and split `path`. The version is the file's modification time in
    /// whole seconds.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::SchemaMissing`] if the file does not exist,
    /// [`SqlPoolError::Io`] if it cannot be read, and
    /// [`SqlPoolError::ConfigError`] if its timestamp does not fit the
    /// engine's 32-bit version slot.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SqlPoolError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SqlPoolError::SchemaMissing(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let modified = std::fs::metadata(path)?.modified()?;
        let secs = modified
            .duration_since(UNIX_EPOCH)
            .map_err(|err| SqlPoolError::ConfigError(format!("schema file timestamp: {err}")))?
            .as_secs();
        let version = i32::try_from(secs).map(i64::from).map_err(|_| {
            SqlPoolError::ConfigError(format!(
                "schema file timestamp {secs} does not fit PRAGMA user_version"
            ))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            statements: split_statements(&text),
            version,
        })
    }
}

/// Strip MySQL-style table options and `--` comments, fold newlines, split on
/// `;`, and drop empty fragments.
#[must_use]
pub fn split_statements(schema: &str) -> Vec<String> {
    let without_options = TABLE_OPTIONS.replace_all(schema, "");
    let without_comments = LINE_COMMENT.replace_all(&without_options, "");
    without_comments
        .split(';')
        .map(|fragment| fragment.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|fragment| !fragment.is_empty())
        .collect()
}

/// Create the schema on a fresh database, one statement at a time, and stamp
/// the version marker. Everything runs in one transaction.
pub(crate) async fn install(
    conn: &SqliteConnection,
    schema: &SchemaSource,
    events: &EventSink,
) -> Result<(), SqlPoolError> {
    tracing::info!(
        path = %schema.path.display(),
        statements = schema.statements.len(),
        "bootstrapping schema"
    );
    conn.exec("BEGIN").await?;
    let applied = apply(conn, schema, events).await;
    if applied.is_err() {
        if let Err(err) = conn.exec("ROLLBACK").await {
            tracing::warn!(error = %err, "rollback after failed bootstrap failed");
        }
        return applied;
    }
    conn.exec("COMMIT").await?;
    events.emit(&PoolEvent::SchemaStamped {
        version: schema.version,
    });
    Ok(())
}

async fn apply(
    conn: &SqliteConnection,
    schema: &SchemaSource,
    events: &EventSink,
) -> Result<(), SqlPoolError> {
    for (idx, statement) in schema.statements.iter().enumerate() {
        let res = conn.query(statement.as_str(), &[]).await?;
        events.emit(&PoolEvent::TableCreated {
            statement: idx + 1,
            inserted_id: res.inserted_id,
            rows_changed: res.rows_changed,
        });
    }
    conn.exec(format!("PRAGMA user_version = {};", schema.version))
        .await
}

/// Compare the stored marker of an existing database with the schema file.
/// Nothing is ever applied here.
pub(crate) async fn check_version(
    conn: &SqliteConnection,
    schema: &SchemaSource,
    drift: SchemaDrift,
    events: &EventSink,
) -> Result<(), SqlPoolError> {
    let stored = stored_version(conn).await?;
    let current = schema.version;
    if stored == current {
        events.emit(&PoolEvent::SchemaUpToDate { version: current });
        return Ok(());
    }
    if stored == 0 {
        tracing::warn!(current, "existing database has no schema version; skipping bootstrap");
        events.emit(&PoolEvent::SchemaUnversioned { current });
        return Ok(());
    }
    tracing::warn!(stored, current, "schema drift detected");
    events.emit(&PoolEvent::SchemaDrift { stored, current });
    match drift {
        SchemaDrift::Fail => Err(SqlPoolError::SchemaOutdated { stored, current }),
        SchemaDrift::Warn => Ok(()),
    }
}

pub(crate) async fn stored_version(conn: &SqliteConnection) -> Result<i64, SqlPoolError> {
    let res = conn.query("PRAGMA user_version", &[]).await?;
    res.first_value("user_version")
        .and_then(|v| v.as_int().copied())
        .ok_or_else(|| SqlPoolError::ConnectionError("PRAGMA user_version returned no value".into()))
}

/// Remove a database file (and its WAL/SHM companions) that a failed
/// bootstrap left behind, so the next start bootstraps again.
pub(crate) fn discard_database(db_path: &str) {
    if is_in_memory(db_path) {
        return;
    }
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let path = format!("{db_path}{suffix}");
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::info!(path, "removed partially bootstrapped database file"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(path, error = %err, "could not remove database file"),
        }
    }
}
