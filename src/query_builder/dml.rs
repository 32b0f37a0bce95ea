use super::escape::{bare_identifier, quote, quote_identifier};
use super::{BuildStatement, FilterNode, Limit, Record, TableRef, assemble, capped_where_clause};
use crate::error::SqlPoolError;

/// `INSERT INTO table ( fields ) VALUES ( ... ), ...` with an optional upsert
/// clause.
///
/// The field list comes from the first row; every further row must carry the
/// same set of fields (in any order).
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: TableRef,
    rows: Vec<Record>,
    conflict_keys: Vec<String>,
}

impl Insert {
    pub fn table(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            rows: Vec::new(),
            conflict_keys: Vec::new(),
        }
    }

    #[must_use]
    pub fn row(mut self, row: Record) -> Self {
        self.rows.push(row);
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: impl IntoIterator<Item = Record>) -> Self {
        self.rows.extend(rows);
        self
    }

    /// Turn the insert into an upsert: on a conflict over `keys`, every other
    /// field is overwritten with the incoming value.
    #[must_use]
    pub fn on_conflict<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.conflict_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    fn render_rows(&self, fields: &[&str]) -> Result<String, SqlPoolError> {
        let mut tuples = Vec::with_capacity(self.rows.len());
        for (n, row) in self.rows.iter().enumerate() {
            if row.len() != fields.len() {
                return Err(SqlPoolError::invalid(format!(
                    "row {n} has {} fields, expected {}",
                    row.len(),
                    fields.len()
                )));
            }
            let mut literals = Vec::with_capacity(fields.len());
            for field in fields {
                let value = row.get(field).ok_or_else(|| {
                    SqlPoolError::invalid(format!("row {n} is missing field `{field}`"))
                })?;
                literals.push(quote(value)?);
            }
            tuples.push(format!("( {} )", literals.join(", ")));
        }
        Ok(tuples.join(", "))
    }

    fn render_upsert(&self, fields: &[&str]) -> String {
        if self.conflict_keys.is_empty() {
            return String::new();
        }
        let keys: Vec<_> = self
            .conflict_keys
            .iter()
            .map(|k| bare_identifier(k))
            .collect();
        let updates: Vec<String> = fields
            .iter()
            .filter(|field| !self.conflict_keys.iter().any(|k| k == *field))
            .map(|field| {
                format!(
                    "{} = excluded.{}",
                    quote_identifier(field),
                    bare_identifier(field)
                )
            })
            .collect();
        if updates.is_empty() {
            return format!("ON CONFLICT({}) DO NOTHING", keys.join(", "));
        }
        format!(
            "ON CONFLICT({}) DO UPDATE SET {}",
            keys.join(", "),
            updates.join(", ")
        )
    }
}

impl BuildStatement for Insert {
    fn build(&self) -> Result<String, SqlPoolError> {
        let first = self
            .rows
            .first()
            .filter(|row| !row.is_empty())
            .ok_or_else(|| SqlPoolError::invalid("insert needs at least one non-empty row"))?;
        let fields: Vec<&str> = first.fields().collect();
        let table = self.table.to_string();
        let columns = format!(
            "( {} )",
            fields
                .iter()
                .map(|f| quote_identifier(f))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let values = self.render_rows(&fields)?;
        let upsert = self.render_upsert(&fields);
        Ok(assemble([
            "INSERT INTO",
            table.as_str(),
            columns.as_str(),
            "VALUES",
            values.as_str(),
            upsert.as_str(),
        ]))
    }
}

/// `UPDATE table SET ... [WHERE ...];`
///
/// Assignment values go through the escaper, so a [`SqlValue::Raw`]
/// expression lands verbatim while text is always quoted. A row cap is
/// applied through `rowid`, so it needs a rowid table.
///
/// [`SqlValue::Raw`]: crate::types::SqlValue::Raw
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: TableRef,
    assignments: Record,
    filter: Option<FilterNode>,
    limit: Option<Limit>,
}

impl Update {
    pub fn table(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            assignments: Record::new(),
            filter: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn set(mut self, assignments: Record) -> Self {
        self.assignments = assignments;
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Touch at most `limit` matching rows.
    #[must_use]
    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

impl BuildStatement for Update {
    fn build(&self) -> Result<String, SqlPoolError> {
        if self.assignments.is_empty() {
            return Err(SqlPoolError::invalid("update needs at least one assignment"));
        }
        let mut sets = Vec::with_capacity(self.assignments.len());
        for (field, value) in self.assignments.iter() {
            sets.push(format!("{} = {}", quote_identifier(field), quote(value)?));
        }
        let sets = sets.join(", ");
        let table = self.table.to_string();
        let filter = capped_where_clause(&table, self.filter.as_ref(), self.limit)?;
        Ok(assemble([
            "UPDATE",
            table.as_str(),
            "SET",
            sets.as_str(),
            filter.as_str(),
        ]))
    }
}

/// `DELETE FROM table [WHERE ...];`, with any row cap applied through
/// `rowid`.
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    table: TableRef,
    filter: Option<FilterNode>,
    limit: Option<Limit>,
}

impl Delete {
    pub fn table(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            filter: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Touch at most `limit` matching rows.
    #[must_use]
    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

impl BuildStatement for Delete {
    fn build(&self) -> Result<String, SqlPoolError> {
        let table = self.table.to_string();
        let filter = capped_where_clause(&table, self.filter.as_ref(), self.limit)?;
        Ok(assemble(["DELETE FROM", table.as_str(), filter.as_str()]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlValue;
    use serde_json::json;

    #[test]
    fn single_row_insert() {
        let sql = Insert::table("T")
            .row(Record::new().set("a", 1).set("b", "x"))
            .build()
            .unwrap();
        assert_eq!(sql, "INSERT INTO `T` ( `a`, `b` ) VALUES ( 1, 'x' );");
    }

    #[test]
    fn multi_row_insert_follows_first_row_order() {
        let sql = Insert::table("T")
            .rows([
                Record::new().set("a", 1).set("b", 2),
                Record::new().set("b", 4).set("a", 3),
            ])
            .build()
            .unwrap();
        assert_eq!(sql, "INSERT INTO `T` ( `a`, `b` ) VALUES ( 1, 2 ), ( 3, 4 );");
    }

    #[test]
    fn mismatched_rows_are_rejected() {
        let err = Insert::table("T")
            .rows([
                Record::new().set("a", 1).set("b", 2),
                Record::new().set("a", 3).set("c", 4),
            ])
            .build()
            .unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
        assert!(Insert::table("T").build().is_err());
    }

    #[test]
    fn upsert_clause() {
        let sql = Insert::table("T")
            .row(Record::new().set("a", 1).set("b", 2))
            .on_conflict(["a"])
            .build()
            .unwrap();
        assert!(sql.contains("ON CONFLICT(a) DO UPDATE SET `b` = excluded.b"), "{sql}");
        assert!(sql.ends_with(';'));

        let sql = Insert::table("T")
            .row(Record::new().set("a", 1))
            .on_conflict(["a"])
            .build()
            .unwrap();
        assert!(sql.ends_with("ON CONFLICT(a) DO NOTHING;"), "{sql}");
    }

    #[test]
    fn update_emits_raw_calls_unescaped() {
        let sql = Update::table("T")
            .set(Record::assignments_from_json(&json!({"updated_at": "now()"})).unwrap())
            .filter(FilterNode::eq("id", 5))
            .build()
            .unwrap();
        assert_eq!(sql, "UPDATE `T` SET `updated_at` = now() WHERE `id` = 5;");

        let sql = Update::table("T")
            .set(Record::new().set("name", "o'brien"))
            .filter(FilterNode::eq("id", 5))
            .build()
            .unwrap();
        assert_eq!(sql, "UPDATE `T` SET `name` = 'o''brien' WHERE `id` = 5;");
    }

    #[test]
    fn update_requires_assignments() {
        assert!(Update::table("T").build().is_err());
        let err = Update::table("T")
            .set(Record::new().set("doc", SqlValue::JSON(json!({"a": 1}))))
            .build()
            .unwrap_err();
        assert!(matches!(err, SqlPoolError::InvalidArgument(_)));
    }

    #[test]
    fn delete_statement() {
        let sql = Delete::table("T")
            .filter(FilterNode::compare("age", "<", 18).unwrap())
            .limit(3_u64)
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "DELETE FROM `T` WHERE rowid IN ( SELECT rowid FROM `T` WHERE `age` < 18 LIMIT 3 );"
        );
        assert_eq!(Delete::table("T").build().unwrap(), "DELETE FROM `T`;");
        assert_eq!(
            Delete::table("T").limit(2_u64).build().unwrap(),
            "DELETE FROM `T` WHERE rowid IN ( SELECT rowid FROM `T` LIMIT 2 );"
        );
    }

    #[test]
    fn capped_update_selects_rowids() {
        let sql = Update::table(("aux", "T"))
            .set(Record::new().set("done", true))
            .filter(FilterNode::eq("done", false))
            .limit((5_u64, 10_u64))
            .build()
            .unwrap();
        assert_eq!(
            sql,
            "UPDATE `aux`.`T` SET `done` = 1 WHERE rowid IN \
             ( SELECT rowid FROM `aux`.`T` WHERE `done` = 0 LIMIT 5, 10 );"
        );
    }
}
