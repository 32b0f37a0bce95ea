use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqlPoolError;

/// Engine tuning applied to every connection right after it opens.
pub const DEFAULT_PRAGMAS: &[(&str, &str)] = &[
    ("journal_mode", "WAL"),
    ("journal_size_limit", "1000"),
    ("synchronous", "NORMAL"),
    ("busy_timeout", "60000"),
    ("temp_store", "memory"),
    ("mmap_size", "30000000000"),
];

static PRAGMA_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w+$").expect("static regex"));
static PRAGMA_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[\w.]+$").expect("static regex"));

/// Options for opening a single `SQLite` connection.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub db_path: String,
    pragmas: Vec<(String, String)>,
}

impl ConnectionOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            pragmas: Vec::new(),
        }
    }

    /// Add a pragma override. Overrides keep their insertion order and are
    /// applied ahead of any default they replace.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] unless the name is an
    /// identifier and the value a single bare token.
    pub fn pragma(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, SqlPoolError> {
        let (name, value) = (name.into(), value.into());
        if !PRAGMA_NAME.is_match(&name) {
            return Err(SqlPoolError::invalid(format!("invalid pragma name `{name}`")));
        }
        if !PRAGMA_VALUE.is_match(&value) {
            return Err(SqlPoolError::invalid(format!(
                "invalid value `{value}` for pragma `{name}`"
            )));
        }
        match self.pragmas.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.pragmas.push((name, value)),
        }
        Ok(self)
    }

    /// Caller overrides first, then every default the caller did not touch.
    #[must_use]
    pub fn effective_pragmas(&self) -> Vec<(String, String)> {
        let mut merged = self.pragmas.clone();
        for (name, value) in DEFAULT_PRAGMAS {
            if !merged.iter().any(|(n, _)| n.eq_ignore_ascii_case(name)) {
                merged.push(((*name).to_owned(), (*value).to_owned()));
            }
        }
        merged
    }

    /// Whether the database behind `db_path` already exists. In-memory
    /// databases never do.
    #[must_use]
    pub fn database_exists(&self) -> bool {
        !is_in_memory(&self.db_path) && std::path::Path::new(&self.db_path).exists()
    }
}

pub(crate) fn is_in_memory(path: &str) -> bool {
    path == ":memory:" || path.is_empty() || path.contains("mode=memory") || path.starts_with("file::memory:")
}

/// An in-memory database that only the opening connection can see, so every
/// slot gets its own copy.
pub(crate) fn is_private_memory(path: &str) -> bool {
    is_in_memory(path) && !path.contains("cache=shared")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_in_after_overrides() {
        let opts = ConnectionOptions::new("db.sqlite".into())
            .pragma("busy_timeout", "5000")
            .unwrap()
            .pragma("foreign_keys", "ON")
            .unwrap();
        let merged = opts.effective_pragmas();
        assert_eq!(merged[0], ("busy_timeout".to_owned(), "5000".to_owned()));
        assert_eq!(merged[1], ("foreign_keys".to_owned(), "ON".to_owned()));
        assert_eq!(merged[2], ("journal_mode".to_owned(), "WAL".to_owned()));
        assert_eq!(merged.len(), DEFAULT_PRAGMAS.len() + 1);
        assert_eq!(
            merged.iter().filter(|(n, _)| n == "busy_timeout").count(),
            1
        );
    }

    #[test]
    fn rejects_unsafe_pragmas() {
        let opts = ConnectionOptions::new("db.sqlite".into());
        assert!(opts.clone().pragma("x; DROP", "1").is_err());
        assert!(opts.pragma("cache_size", "1; DROP TABLE t").is_err());
    }

    #[test]
    fn memory_databases_never_exist() {
        assert!(!ConnectionOptions::new(":memory:".into()).database_exists());
        assert!(is_in_memory("file::memory:?cache=shared"));
        assert!(is_private_memory(":memory:"));
        assert!(!is_private_memory("file::memory:?cache=shared"));
        assert!(!is_private_memory("app.db"));
    }
}
