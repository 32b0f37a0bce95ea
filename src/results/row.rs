use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::SqlValue;

/// A single row of a [`QueryResult`](super::QueryResult), keyed by column name.
#[derive(Debug, Clone)]
pub struct Row {
    /// The column names for this row (shared across all rows in a result)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row, positionally aligned with `column_names`
    pub values: Vec<SqlValue>,
    #[doc(hidden)]
    pub(crate) column_index: Arc<HashMap<String, usize>>,
}

impl Row {
    /// Create a row that builds its own column lookup table.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<SqlValue>) -> Self {
        let column_index = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            values,
            column_index,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index.get(column_name) {
            return Some(idx);
        }
        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlValue> {
        self.get_column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlValue> {
        self.values.get(index)
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    column_names
        .iter()
        .enumerate()
        .map(|(i, name)| (name.clone(), i))
        .collect()
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.column_names.iter().zip(&self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name_and_position() {
        let row = Row::new(
            Arc::new(vec!["id".to_owned(), "name".to_owned()]),
            vec![SqlValue::Int(7), SqlValue::from("ann")],
        );
        assert_eq!(row.get_column_index("name"), Some(1));
        assert_eq!(row.get("id"), Some(&SqlValue::Int(7)));
        assert_eq!(row.get_by_index(1), Some(&SqlValue::from("ann")));
        assert_eq!(row.get_by_index(2), None);
        assert_eq!(row.get("missing"), None);
    }

    #[test]
    fn serializes_as_a_map() {
        let row = Row::new(
            Arc::new(vec!["id".to_owned(), "name".to_owned()]),
            vec![SqlValue::Int(7), SqlValue::Null],
        );
        assert_eq!(
            serde_json::to_string(&row).unwrap(),
            r#"{"id":7,"name":null}"#
        );
    }
}
