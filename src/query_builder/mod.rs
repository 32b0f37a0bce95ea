//! Structured statement generation.
//!
//! Every value is inlined through [`escape::quote`]; nothing here binds
//! parameters. Builders are plain data and render with
//! [`BuildStatement::build`], so they can be inspected without a pool.

pub mod escape;

mod clauses;
mod condition;
mod dml;
mod filter;
mod record;
mod select;

pub use clauses::{Direction, Fields, Limit, OrderBy, TableRef};
pub use dml::{Delete, Insert, Update};
pub use filter::{Connective, FilterNode};
pub use record::Record;
pub use select::Select;

use crate::error::SqlPoolError;

/// Something that renders to one complete SQL statement.
pub trait BuildStatement {
    /// Render the statement text, terminated with `;`.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] when the description is
    /// malformed or holds a value the escaper cannot inline.
    fn build(&self) -> Result<String, SqlPoolError>;
}

/// Join non-empty fragments with single spaces and terminate the statement.
fn assemble<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    let mut sql = parts
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    sql.push(';');
    sql
}

fn where_clause(filter: Option<&FilterNode>) -> Result<String, SqlPoolError> {
    filter.map_or_else(|| Ok(String::new()), |f| f.render(true))
}

fn limit_clause(limit: Option<Limit>) -> String {
    limit.map(|l| l.render()).unwrap_or_default()
}

/// WHERE clause for UPDATE/DELETE. A row cap becomes a rowid subquery, since
/// the stock engine has no LIMIT on those statements.
fn capped_where_clause(
    table: &str,
    filter: Option<&FilterNode>,
    limit: Option<Limit>,
) -> Result<String, SqlPoolError> {
    let filter = where_clause(filter)?;
    let Some(limit) = limit else {
        return Ok(filter);
    };
    let limit = limit.render();
    let subquery = ["SELECT rowid FROM", table, filter.as_str(), limit.as_str()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    Ok(format!("WHERE rowid IN ( {subquery} )"))
}
