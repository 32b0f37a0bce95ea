use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::SqlPoolError;

/// Values that can be embedded into a generated statement, bound as a query
/// parameter, or read back out of a row.
///
/// ```rust
/// use sqlite_loadpool::prelude::*;
///
/// let values = vec![
///     SqlValue::Int(1),
///     SqlValue::from("alice"),
///     SqlValue::raw("CURRENT_TIMESTAMP"),
/// ];
/// # let _ = values;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlValue {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value, stored as `1`/`0`
    Bool(bool),
    /// Timestamp value, stored as `YYYY-MM-DD HH:MM:SS[.fff]` text
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// Expression emitted into a statement verbatim, never quoted
    Raw(String),
    /// Structured JSON (cannot be inlined; only usable as a bound parameter)
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl SqlValue {
    /// Wrap an engine expression such as `CURRENT_TIMESTAMP` or `random()` so
    /// the statement builder emits it unescaped.
    #[must_use]
    pub fn raw(expression: impl Into<String>) -> Self {
        SqlValue::Raw(expression.into())
    }

    /// Map a JSON scalar onto the matching variant. Objects and arrays become
    /// [`SqlValue::JSON`], which the escaper refuses to inline.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] for integers outside the
    /// 64-bit signed range.
    pub fn from_json(value: &JsonValue) -> Result<Self, SqlPoolError> {
        Ok(match value {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Bool(*b),
            JsonValue::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => SqlValue::Int(i),
                (None, Some(f)) if n.is_f64() => SqlValue::Float(f),
                _ => {
                    return Err(SqlPoolError::invalid(format!(
                        "integer {n} does not fit a 64-bit column"
                    )));
                }
            },
            JsonValue::String(s) => SqlValue::Text(s.clone()),
            other => SqlValue::JSON(other.clone()),
        })
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let SqlValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let SqlValue::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let SqlValue::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SqlValue::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            SqlValue::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Blob(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use serde_json::json;

    #[test]
    fn accessors_read_engine_shapes() {
        assert_eq!(SqlValue::Int(1).as_bool(), Some(&true));
        assert_eq!(SqlValue::Int(0).as_bool(), Some(&false));
        assert_eq!(SqlValue::Int(2).as_bool(), None);
        assert_eq!(SqlValue::Bool(true).as_bool(), Some(&true));

        assert_eq!(SqlValue::Int(3).as_float(), Some(3.0));
        assert_eq!(SqlValue::Float(0.25).as_float(), Some(0.25));
        assert_eq!(SqlValue::from("x").as_float(), None);

        assert_eq!(SqlValue::from(vec![1_u8, 2]).as_blob(), Some(&[1_u8, 2][..]));
        assert!(SqlValue::from(None::<i64>).is_null());
    }

    #[test]
    fn json_numbers_keep_their_kind() {
        assert_eq!(SqlValue::from_json(&json!(-3)).unwrap(), SqlValue::Int(-3));
        assert_eq!(SqlValue::from_json(&json!(1.5)).unwrap(), SqlValue::Float(1.5));
        assert_eq!(
            SqlValue::from_json(&json!(i64::MAX)).unwrap(),
            SqlValue::Int(i64::MAX)
        );
        let err = SqlValue::from_json(&json!(u64::MAX)).unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
    }

    #[test]
    fn timestamps_parse_from_stored_text() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|d| d.and_hms_milli_opt(8, 30, 0, 250))
            .unwrap();
        assert_eq!(
            SqlValue::from("2024-05-01 08:30:00.250").as_timestamp(),
            Some(expected)
        );
        assert_eq!(
            SqlValue::from("2024-05-01 08:30:00").as_timestamp(),
            expected.with_nanosecond(0)
        );
        assert_eq!(SqlValue::Timestamp(expected).as_timestamp(), Some(expected));
        assert_eq!(SqlValue::from("not a date").as_timestamp(), None);
    }
}
