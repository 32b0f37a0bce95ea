use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{Connection, ToSql};

use crate::error::SqlPoolError;
use crate::results::QueryResult;
use crate::types::SqlValue;

/// Extract a [`SqlValue`] from a `SQLite` row.
///
/// # Errors
/// Returns [`SqlPoolError::DriverError`] if the column cannot be read.
pub fn sqlite_extract_value_sync(row: &rusqlite::Row, idx: usize) -> Result<SqlValue, SqlPoolError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Int(i),
        Value::Real(f) => SqlValue::Float(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    })
}

/// Run one statement and collect everything it reports: rows for readers,
/// changed-row count and last rowid for writers.
///
/// # Errors
/// Returns [`SqlPoolError::DriverError`] if preparing or stepping fails.
pub fn build_query_result(
    conn: &Connection,
    query: &str,
    params: &[Value],
) -> Result<QueryResult, SqlPoolError> {
    let param_refs: Vec<&dyn ToSql> = params.iter().map(|v| v as &dyn ToSql).collect();
    let mut stmt = conn.prepare(query)?;
    let readonly = stmt.readonly();
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result = QueryResult::with_capacity(10);
    result.set_column_names(Arc::new(column_names));

    let mut rows = stmt.query(&param_refs[..])?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            values.push(sqlite_extract_value_sync(row, i)?);
        }
        result.add_row_values(values);
    }
    drop(rows);
    drop(stmt);

    // changes() only tracks INSERT/UPDATE/DELETE; DDL and pragmas leave it stale.
    let keyword = leading_keyword(query);
    if !readonly && matches!(keyword.as_str(), "INSERT" | "UPDATE" | "DELETE" | "REPLACE" | "WITH") {
        result.rows_changed = u64::try_from(conn.changes()).unwrap_or_default();
        if result.rows_changed > 0 && matches!(keyword.as_str(), "INSERT" | "REPLACE") {
            result.inserted_id = Some(conn.last_insert_rowid());
        }
    }
    Ok(result)
}

fn leading_keyword(query: &str) -> String {
    query
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();
        conn
    }

    #[test]
    fn writes_report_counters() {
        let conn = memory();
        let res = build_query_result(&conn, "INSERT INTO t (name) VALUES ('a'), ('b')", &[]).unwrap();
        assert_eq!(res.rows_changed, 2);
        assert_eq!(res.inserted_id, Some(2));
        assert!(res.rows.is_empty());

        let res = build_query_result(&conn, "update t set name = 'c' where id = 1", &[]).unwrap();
        assert_eq!(res.rows_changed, 1);
        assert_eq!(res.inserted_id, None);
    }

    #[test]
    fn reads_return_rows_without_counters() {
        let conn = memory();
        conn.execute_batch("INSERT INTO t (name) VALUES ('a');").unwrap();
        let res = build_query_result(
            &conn,
            "SELECT id, name FROM t WHERE name = ?1",
            &[Value::Text("a".into())],
        )
        .unwrap();
        assert_eq!(res.rows_changed, 0);
        assert_eq!(res.rows.len(), 1);
        assert_eq!(res.first_value("name"), Some(&SqlValue::Text("a".into())));
        assert_eq!(res.rows[0].get("id"), Some(&SqlValue::Int(1)));
    }

    #[test]
    fn ddl_does_not_leak_stale_counts() {
        let conn = memory();
        conn.execute_batch("INSERT INTO t (name) VALUES ('a');").unwrap();
        let res = build_query_result(&conn, "CREATE TABLE u (id INTEGER)", &[]).unwrap();
        assert_eq!(res.rows_changed, 0);
        assert_eq!(res.inserted_id, None);
    }

    #[test]
    fn keyword_detection() {
        assert_eq!(leading_keyword("  insert into t"), "INSERT");
        assert_eq!(leading_keyword("WITH x AS (SELECT 1) SELECT * FROM x"), "WITH");
    }
}
