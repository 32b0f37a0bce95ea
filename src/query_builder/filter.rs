use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value as JsonValue};

use crate::error::SqlPoolError;
use crate::types::SqlValue;

/// Boolean operator joining sibling entries at one level of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "AND" => Some(Connective::And),
            "OR" => Some(Connective::Or),
            _ => None,
        }
    }
}

impl fmt::Display for Connective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Connective::And => "AND",
            Connective::Or => "OR",
        })
    }
}

/// A filter tree: comparisons at the leaves, AND/OR groups above them.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf {
        field: String,
        operator: String,
        value: SqlValue,
    },
    Group {
        connective: Connective,
        children: Vec<FilterNode>,
    },
}

const OPERATORS: &[&str] = &[
    "=", "==", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE", "GLOB", "NOT GLOB", "IS",
    "IS NOT", "REGEXP", "NOT REGEXP", "MATCH",
];

static ANNOTATED_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?<name>[^\[\]]+)(?:\[(?<annotation>.+)\])?$").expect("static regex")
});

/// Split a `field[annotation]` token into its parts.
pub(crate) fn split_annotated(key: &str) -> Result<(&str, Option<&str>), SqlPoolError> {
    let caps = ANNOTATED_KEY
        .captures(key)
        .ok_or_else(|| SqlPoolError::invalid(format!("malformed field token `{key}`")))?;
    let name = caps.name("name").map_or("", |m| m.as_str());
    Ok((name, caps.name("annotation").map(|m| m.as_str())))
}

fn normalize_operator(operator: &str) -> Result<String, SqlPoolError> {
    let normalized = operator
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase();
    if OPERATORS.contains(&normalized.as_str()) {
        Ok(normalized)
    } else {
        Err(SqlPoolError::invalid(format!(
            "unsupported comparison operator `{operator}`"
        )))
    }
}

impl FilterNode {
    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        FilterNode::Leaf {
            field: field.into(),
            operator: "=".to_owned(),
            value: value.into(),
        }
    }

    /// `field <operator> value`; the operator must be one of the supported
    /// comparison tokens (`=`, `<>`, `>=`, `LIKE`, `IS NOT`, ...).
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] for an unknown operator.
    pub fn compare(
        field: impl Into<String>,
        operator: &str,
        value: impl Into<SqlValue>,
    ) -> Result<Self, SqlPoolError> {
        Ok(FilterNode::Leaf {
            field: field.into(),
            operator: normalize_operator(operator)?,
            value: value.into(),
        })
    }

    pub fn and(children: impl IntoIterator<Item = FilterNode>) -> Self {
        FilterNode::Group {
            connective: Connective::And,
            children: children.into_iter().collect(),
        }
    }

    pub fn or(children: impl IntoIterator<Item = FilterNode>) -> Self {
        FilterNode::Group {
            connective: Connective::Or,
            children: children.into_iter().collect(),
        }
    }

    /// Parse the nested-mapping convenience form.
    ///
    /// Keys are `field`, `field[op]`, or the reserved `AND` / `OR`. When the
    /// first key of a mapping is reserved, its value replaces the mapping and
    /// the token becomes that level's connective; otherwise the level is an
    /// implicit AND. A reserved key further down opens a nested group whose
    /// value is either a mapping or an array of mappings.
    ///
    /// ```rust
    /// use serde_json::json;
    /// use sqlite_loadpool::prelude::*;
    ///
    /// let filter = FilterNode::from_json(&json!({
    ///     "OR": { "status": "open", "priority[>=]": 3 }
    /// }))?;
    /// assert_eq!(filter.render(true)?, "WHERE ( `status` = 'open' OR `priority` >= 3 )");
    /// # Ok::<(), SqlPoolError>(())
    /// ```
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] for malformed keys, unknown
    /// operators, or object/array values under a field key.
    pub fn from_json(value: &JsonValue) -> Result<Self, SqlPoolError> {
        match value {
            JsonValue::Null => Ok(FilterNode::and([])),
            JsonValue::Object(map) => parse_level(map),
            other => Err(SqlPoolError::invalid(format!(
                "filter must be a mapping, got {other}"
            ))),
        }
    }
}

fn parse_level(map: &Map<String, JsonValue>) -> Result<FilterNode, SqlPoolError> {
    if let Some((first, nested)) = map.iter().next() {
        if let Some(connective) = Connective::from_key(first) {
            return group(connective, nested);
        }
    }
    Ok(FilterNode::Group {
        connective: Connective::And,
        children: parse_entries(map)?,
    })
}

fn group(connective: Connective, nested: &JsonValue) -> Result<FilterNode, SqlPoolError> {
    let children = match nested {
        JsonValue::Object(map) => parse_entries(map)?,
        JsonValue::Array(items) => items
            .iter()
            .map(|item| match item {
                JsonValue::Object(map) => parse_level(map),
                other => Err(SqlPoolError::invalid(format!(
                    "{connective} group entries must be mappings, got {other}"
                ))),
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(SqlPoolError::invalid(format!(
                "{connective} expects a mapping or an array of mappings, got {other}"
            )));
        }
    };
    Ok(FilterNode::Group {
        connective,
        children,
    })
}

fn parse_entries(map: &Map<String, JsonValue>) -> Result<Vec<FilterNode>, SqlPoolError> {
    map.iter()
        .map(|(key, value)| {
            if let Some(connective) = Connective::from_key(key) {
                return group(connective, value);
            }
            if value.is_object() || value.is_array() {
                return Err(SqlPoolError::invalid(format!(
                    "field `{key}` compares against a structured value"
                )));
            }
            let (field, operator) = split_annotated(key)?;
            Ok(FilterNode::Leaf {
                field: field.to_owned(),
                operator: normalize_operator(operator.unwrap_or("="))?,
                value: SqlValue::from_json(value)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_and_with_operators() {
        let node = FilterNode::from_json(&json!({"a": 1, "b[like]": "x%"})).unwrap();
        assert_eq!(
            node,
            FilterNode::and([
                FilterNode::eq("a", 1),
                FilterNode::compare("b", "LIKE", "x%").unwrap(),
            ])
        );
    }

    #[test]
    fn leading_reserved_key_sets_connective_and_drops_siblings() {
        let node = FilterNode::from_json(&json!({"OR": {"a": 1, "b": 2}, "c": 3})).unwrap();
        assert_eq!(
            node,
            FilterNode::or([FilterNode::eq("a", 1), FilterNode::eq("b", 2)])
        );
    }

    #[test]
    fn nested_group_accepts_array_of_mappings() {
        let node =
            FilterNode::from_json(&json!({"a": 1, "OR": [{"b": 2}, {"c": 3, "d": 4}]})).unwrap();
        assert_eq!(
            node,
            FilterNode::and([
                FilterNode::eq("a", 1),
                FilterNode::or([
                    FilterNode::and([FilterNode::eq("b", 2)]),
                    FilterNode::and([FilterNode::eq("c", 3), FilterNode::eq("d", 4)]),
                ]),
            ])
        );
    }

    #[test]
    fn structured_leaf_values_are_rejected() {
        let err = FilterNode::from_json(&json!({"a": 1, "b": {"c": 2}})).unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
        let err = FilterNode::from_json(&json!({"a": 1, "b": [1, 2]})).unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
        let err = FilterNode::from_json(&json!({"id": u64::MAX})).unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = FilterNode::from_json(&json!({"a[; DROP TABLE t]": 1})).unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
    }

    #[test]
    fn operator_normalization() {
        assert_eq!(normalize_operator("is   not").unwrap(), "IS NOT");
        assert_eq!(normalize_operator(">=").unwrap(), ">=");
    }

    #[test]
    fn split_annotated_tokens() {
        assert_eq!(split_annotated("name").unwrap(), ("name", None));
        assert_eq!(split_annotated("name[DESC]").unwrap(), ("name", Some("DESC")));
        assert!(split_annotated("[x]").is_err());
    }
}
