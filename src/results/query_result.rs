use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::row::{Row, index_columns};
use crate::types::SqlValue;

/// Outcome of one statement: any rows it produced plus the write counters the
/// engine reported for it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    /// Rows returned by the statement (empty for plain DML)
    pub rows: Vec<Row>,
    /// Rowid of the last inserted row, when the statement inserted one
    pub inserted_id: Option<i64>,
    /// Number of rows changed by a write statement
    pub rows_changed: u64,
    #[serde(skip)]
    column_names: Option<Arc<Vec<String>>>,
    #[serde(skip)]
    column_index: Option<Arc<HashMap<String, usize>>>,
}

impl QueryResult {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> QueryResult {
        QueryResult {
            rows: Vec::with_capacity(capacity),
            ..QueryResult::default()
        }
    }

    /// Set the column names shared by every row added afterwards.
    pub fn set_column_names(&mut self, column_names: Arc<Vec<String>>) {
        self.column_index = Some(Arc::new(index_columns(&column_names)));
        self.column_names = Some(column_names);
    }

    #[must_use]
    pub fn get_column_names(&self) -> Option<&Arc<Vec<String>>> {
        self.column_names.as_ref()
    }

    /// Append a row using the shared column names. Ignored until column names
    /// have been set.
    pub fn add_row_values(&mut self, values: Vec<SqlValue>) {
        if let (Some(column_names), Some(column_index)) = (&self.column_names, &self.column_index)
        {
            self.rows.push(Row {
                column_names: Arc::clone(column_names),
                values,
                column_index: Arc::clone(column_index),
            });
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row's value for `column`, handy for single-value lookups.
    #[must_use]
    pub fn first_value(&self, column: &str) -> Option<&SqlValue> {
        self.rows.first().and_then(|row| row.get(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_share_column_names() {
        let mut res = QueryResult::with_capacity(2);
        res.add_row_values(vec![SqlValue::Int(0)]);
        assert!(res.is_empty());

        res.set_column_names(Arc::new(vec!["n".to_owned()]));
        res.add_row_values(vec![SqlValue::Int(1)]);
        res.add_row_values(vec![SqlValue::Int(2)]);
        assert_eq!(res.rows.len(), 2);
        assert_eq!(
            res.get_column_names().map(|names| names.as_slice()),
            Some(&["n".to_owned()][..])
        );
        assert!(Arc::ptr_eq(&res.rows[0].column_names, &res.rows[1].column_names));
        assert_eq!(res.first_value("n"), Some(&SqlValue::Int(1)));
    }
}
