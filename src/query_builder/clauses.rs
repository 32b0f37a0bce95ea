use std::fmt;

use serde_json::Value as JsonValue;

use super::escape::quote_identifier;
use super::filter::split_annotated;
use crate::error::SqlPoolError;

/// A table, optionally qualified by an attached database name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRef {
    Table(String),
    Qualified { database: String, table: String },
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableRef::Table(table) => f.write_str(&quote_identifier(table)),
            TableRef::Qualified { database, table } => write!(
                f,
                "{}.{}",
                quote_identifier(database),
                quote_identifier(table)
            ),
        }
    }
}

impl From<&str> for TableRef {
    fn from(table: &str) -> Self {
        TableRef::Table(table.to_owned())
    }
}

impl From<String> for TableRef {
    fn from(table: String) -> Self {
        TableRef::Table(table)
    }
}

impl From<(&str, &str)> for TableRef {
    fn from((database, table): (&str, &str)) -> Self {
        TableRef::Qualified {
            database: database.to_owned(),
            table: table.to_owned(),
        }
    }
}

/// Projection of a SELECT.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Fields {
    #[default]
    All,
    Named(Vec<String>),
}

impl fmt::Display for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fields::All => f.write_str("*"),
            Fields::Named(names) if names.is_empty() => f.write_str("*"),
            Fields::Named(names) => {
                let quoted: Vec<String> = names.iter().map(|n| quote_identifier(n)).collect();
                f.write_str(&quoted.join(", "))
            }
        }
    }
}

impl From<&str> for Fields {
    fn from(field: &str) -> Self {
        if field == "*" {
            Fields::All
        } else {
            Fields::Named(vec![field.to_owned()])
        }
    }
}

impl From<Vec<&str>> for Fields {
    fn from(fields: Vec<&str>) -> Self {
        Fields::Named(fields.into_iter().map(str::to_owned).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Fields {
    fn from(fields: [&str; N]) -> Self {
        Fields::Named(fields.iter().map(|f| (*f).to_owned()).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn parse(token: &str) -> Result<Self, SqlPoolError> {
        match token.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(SqlPoolError::invalid(format!(
                "unsupported sort direction `{token}`"
            ))),
        }
    }
}

/// ORDER BY entries, each a field with an optional direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBy(Vec<(String, Option<Direction>)>);

impl OrderBy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn asc(mut self, field: impl Into<String>) -> Self {
        self.0.push((field.into(), Some(Direction::Asc)));
        self
    }

    #[must_use]
    pub fn desc(mut self, field: impl Into<String>) -> Self {
        self.0.push((field.into(), Some(Direction::Desc)));
        self
    }

    /// Parse `field` / `field[DESC]` tokens.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] for malformed tokens or a
    /// direction other than ASC/DESC.
    pub fn parse<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Result<Self, SqlPoolError> {
        let mut entries = Vec::new();
        for token in tokens {
            let (field, direction) = split_annotated(token)?;
            entries.push((field.to_owned(), direction.map(Direction::parse).transpose()?));
        }
        Ok(OrderBy(entries))
    }

    /// Accepts a single token string or an array of token strings.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] for anything else.
    pub fn from_json(value: &JsonValue) -> Result<Self, SqlPoolError> {
        match value {
            JsonValue::Null => Ok(OrderBy::new()),
            JsonValue::String(token) => OrderBy::parse([token.as_str()]),
            JsonValue::Array(items) => {
                let tokens = items
                    .iter()
                    .map(|item| {
                        item.as_str().ok_or_else(|| {
                            SqlPoolError::invalid(format!("order entry must be a string, got {item}"))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                OrderBy::parse(tokens)
            }
            other => Err(SqlPoolError::invalid(format!(
                "order must be a string or array, got {other}"
            ))),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `ORDER BY ...`, or an empty string when there are no entries.
    #[must_use]
    pub fn render(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let entries: Vec<String> = self
            .0
            .iter()
            .map(|(field, direction)| match direction {
                Some(Direction::Asc) => format!("{} ASC", quote_identifier(field)),
                Some(Direction::Desc) => format!("{} DESC", quote_identifier(field)),
                None => quote_identifier(field),
            })
            .collect();
        format!("ORDER BY {}", entries.join(", "))
    }
}

/// Row cap, optionally preceded by an offset. A count of `0` renders
/// `LIMIT 0` and matches no rows; leave the limit unset for no cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    Range { offset: u64, count: u64 },
}

impl Limit {
    /// Accepts `n`, `[n]` or `[offset, count]`. `null` and `[]` mean no
    /// limit; `0` is kept as a zero-row cap.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] for negative numbers or other
    /// shapes.
    pub fn from_json(value: &JsonValue) -> Result<Option<Self>, SqlPoolError> {
        let number = |v: &JsonValue| {
            v.as_u64()
                .ok_or_else(|| SqlPoolError::invalid(format!("limit must be a non-negative integer, got {v}")))
        };
        match value {
            JsonValue::Null => Ok(None),
            JsonValue::Array(items) => match items.as_slice() {
                [] => Ok(None),
                [count] => Ok(Some(Limit::Count(number(count)?))),
                [offset, count] => Ok(Some(Limit::Range {
                    offset: number(offset)?,
                    count: number(count)?,
                })),
                _ => Err(SqlPoolError::invalid("limit takes at most two numbers")),
            },
            other => Ok(Some(Limit::Count(number(other)?))),
        }
    }

    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Limit::Count(count) => format!("LIMIT {count}"),
            Limit::Range { offset, count } => format!("LIMIT {offset}, {count}"),
        }
    }
}

impl From<u64> for Limit {
    fn from(count: u64) -> Self {
        Limit::Count(count)
    }
}

impl From<(u64, u64)> for Limit {
    fn from((offset, count): (u64, u64)) -> Self {
        Limit::Range { offset, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn table_refs() {
        assert_eq!(TableRef::from("users").to_string(), "`users`");
        assert_eq!(TableRef::from(("main", "users")).to_string(), "`main`.`users`");
    }

    #[test]
    fn field_lists() {
        assert_eq!(Fields::from("*").to_string(), "*");
        assert_eq!(Fields::from("id").to_string(), "`id`");
        assert_eq!(Fields::from(["id", "name"]).to_string(), "`id`, `name`");
    }

    #[test]
    fn order_tokens() {
        let order = OrderBy::parse(["name[desc]", "id"]).unwrap();
        assert_eq!(order.render(), "ORDER BY `name` DESC, `id`");
        assert_eq!(OrderBy::new().render(), "");
        assert!(OrderBy::parse(["name[sideways]"]).is_err());
    }

    #[test]
    fn limit_shapes() {
        assert_eq!(Limit::from_json(&json!(10)).unwrap(), Some(Limit::Count(10)));
        assert_eq!(Limit::from_json(&json!([7])).unwrap(), Some(Limit::Count(7)));
        assert_eq!(
            Limit::from_json(&json!([20, 10])).unwrap().unwrap().render(),
            "LIMIT 20, 10"
        );
        assert_eq!(Limit::from_json(&json!(null)).unwrap(), None);
        assert!(Limit::from_json(&json!(-1)).is_err());
        assert!(Limit::from_json(&json!([1, 2, 3])).is_err());
    }

    #[test]
    fn zero_count_is_a_cap_not_unlimited() {
        let zero = Limit::from_json(&json!(0)).unwrap();
        assert_eq!(zero, Some(Limit::Count(0)));
        assert_eq!(zero.unwrap().render(), "LIMIT 0");
        assert_eq!(Limit::from_json(&json!([])).unwrap(), None);
    }
}
