use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use crate::error::SqlPoolError;
use crate::types::SqlValue;

/// Ordered field → value pairs: one row for INSERT, or the SET list of an
/// UPDATE.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    entries: Vec<(String, SqlValue)>,
}

static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+\(\)$").expect("static regex"));

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `field`, replacing an earlier value for the same field.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((field, value)),
        }
        self
    }

    /// Build a record from a JSON mapping; every value is treated as data.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] if `value` is not a mapping
    /// or holds an out-of-range integer.
    pub fn from_json(value: &JsonValue) -> Result<Self, SqlPoolError> {
        Self::collect(value, SqlValue::from_json)
    }

    /// Like [`Record::from_json`], but text ending in a zero-argument call
    /// such as `"now()"` becomes a [`SqlValue::Raw`] expression.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] if `value` is not a mapping.
    pub fn assignments_from_json(value: &JsonValue) -> Result<Self, SqlPoolError> {
        Self::collect(value, |v| match v {
            JsonValue::String(s) if FUNCTION_CALL.is_match(s) => Ok(SqlValue::Raw(s.clone())),
            other => SqlValue::from_json(other),
        })
    }

    fn collect(
        value: &JsonValue,
        convert: impl Fn(&JsonValue) -> Result<SqlValue, SqlPoolError>,
    ) -> Result<Self, SqlPoolError> {
        let map: &Map<String, JsonValue> = value
            .as_object()
            .ok_or_else(|| SqlPoolError::invalid(format!("expected a mapping, got {value}")))?;
        let entries = map
            .iter()
            .map(|(k, v)| Ok((k.clone(), convert(v)?)))
            .collect::<Result<Vec<_>, SqlPoolError>>()?;
        Ok(Record { entries })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&SqlValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Record::new(), |record, (k, v)| record.set(k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_keeps_first_position() {
        let record = Record::new().set("a", 1).set("b", 2).set("a", 3);
        assert_eq!(record.fields().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(record.get("a"), Some(&SqlValue::Int(3)));
    }

    #[test]
    fn assignments_detect_function_calls() {
        let record =
            Record::assignments_from_json(&json!({"updated_at": "now()", "name": "now"})).unwrap();
        assert_eq!(record.get("updated_at"), Some(&SqlValue::raw("now()")));
        assert_eq!(record.get("name"), Some(&SqlValue::from("now")));
    }

    #[test]
    fn plain_records_never_detect_calls() {
        let record = Record::from_json(&json!({"note": "call me()"})).unwrap();
        assert_eq!(record.get("note"), Some(&SqlValue::from("call me()")));
    }

    #[test]
    fn rejects_non_mappings() {
        assert!(Record::from_json(&json!([1, 2])).is_err());
    }

    #[test]
    fn rejects_integers_wider_than_a_column() {
        let err = Record::from_json(&json!({"big": u64::MAX})).unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
    }
}
