use super::{
    BuildStatement, Fields, FilterNode, Limit, OrderBy, TableRef, assemble, limit_clause,
    where_clause,
};
use crate::error::SqlPoolError;

/// `SELECT fields FROM table [WHERE ...] [ORDER BY ...] [LIMIT ...];`
///
/// ```rust
/// use sqlite_loadpool::prelude::*;
///
/// let sql = Select::table("users")
///     .fields(["id", "name"])
///     .filter(FilterNode::eq("active", true))
///     .order(OrderBy::new().desc("id"))
///     .limit(10_u64)
///     .build()?;
/// assert_eq!(
///     sql,
///     "SELECT `id`, `name` FROM `users` WHERE `active` = 1 ORDER BY `id` DESC LIMIT 10;"
/// );
/// # Ok::<(), SqlPoolError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    table: TableRef,
    fields: Fields,
    filter: Option<FilterNode>,
    order: OrderBy,
    limit: Option<Limit>,
}

impl Select {
    pub fn table(table: impl Into<TableRef>) -> Self {
        Self {
            table: table.into(),
            fields: Fields::All,
            filter: None,
            order: OrderBy::new(),
            limit: None,
        }
    }

    #[must_use]
    pub fn fields(mut self, fields: impl Into<Fields>) -> Self {
        self.fields = fields.into();
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: impl Into<Limit>) -> Self {
        self.limit = Some(limit.into());
        self
    }
}

impl BuildStatement for Select {
    fn build(&self) -> Result<String, SqlPoolError> {
        let fields = self.fields.to_string();
        let table = self.table.to_string();
        let filter = where_clause(self.filter.as_ref())?;
        let order = self.order.render();
        let limit = limit_clause(self.limit);
        Ok(assemble([
            "SELECT",
            fields.as_str(),
            "FROM",
            table.as_str(),
            filter.as_str(),
            order.as_str(),
            limit.as_str(),
        ]))
    }
}
