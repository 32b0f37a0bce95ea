use rusqlite::types::Value;

use crate::error::SqlPoolError;
use crate::types::SqlValue;

/// Convert a single [`SqlValue`] into a value `rusqlite` can bind.
///
/// # Errors
/// Raw expressions cannot be bound, only inlined; they yield
/// [`SqlPoolError::InvalidArgument`].
pub fn sql_value_to_sqlite_value(value: &SqlValue) -> Result<Value, SqlPoolError> {
    Ok(match value {
        SqlValue::Int(i) => Value::Integer(*i),
        SqlValue::Float(f) => Value::Real(*f),
        SqlValue::Text(s) => Value::Text(s.clone()),
        SqlValue::Bool(b) => Value::Integer(i64::from(*b)),
        SqlValue::Timestamp(dt) => Value::Text(dt.format("%F %T%.f").to_string()),
        SqlValue::Null => Value::Null,
        SqlValue::JSON(json) => Value::Text(json.to_string()),
        SqlValue::Blob(bytes) => Value::Blob(bytes.clone()),
        SqlValue::Raw(expr) => {
            return Err(SqlPoolError::invalid(format!(
                "raw expression `{expr}` cannot be bound as a parameter"
            )));
        }
    })
}

/// Owned `SQLite` parameter list, ready to ship to a connection worker.
#[derive(Debug, Clone, Default)]
pub struct Params(pub Vec<Value>);

impl Params {
    /// # Errors
    /// Fails on the first value that cannot be bound.
    pub fn convert(params: &[SqlValue]) -> Result<Self, SqlPoolError> {
        params
            .iter()
            .map(sql_value_to_sqlite_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_scalars() {
        let params = Params::convert(&[
            SqlValue::Int(1),
            SqlValue::Bool(true),
            SqlValue::from("x"),
            SqlValue::Null,
        ])
        .unwrap();
        assert_eq!(
            params.0,
            vec![
                Value::Integer(1),
                Value::Integer(1),
                Value::Text("x".into()),
                Value::Null
            ]
        );
    }

    #[test]
    fn raw_expressions_cannot_be_bound() {
        assert!(Params::convert(&[SqlValue::raw("random()")]).is_err());
    }
}
