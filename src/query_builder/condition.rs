use super::escape::{quote, quote_identifier};
use super::filter::FilterNode;
use crate::error::SqlPoolError;

impl FilterNode {
    /// Render the tree as a boolean expression, prefixed with `WHERE` when
    /// `with_keyword` is set. A tree with no leaves renders as an empty string
    /// either way.
    ///
    /// # Errors
    /// Returns [`SqlPoolError::InvalidArgument`] when a leaf value cannot be
    /// inlined.
    pub fn render(&self, with_keyword: bool) -> Result<String, SqlPoolError> {
        Ok(match render_node(self)? {
            Some(expr) if with_keyword => format!("WHERE {expr}"),
            Some(expr) => expr,
            None => String::new(),
        })
    }
}

/// `None` for groups without any leaf underneath. Groups with one surviving
/// child collapse to that child; larger groups are parenthesised.
fn render_node(node: &FilterNode) -> Result<Option<String>, SqlPoolError> {
    match node {
        FilterNode::Leaf {
            field,
            operator,
            value,
        } => Ok(Some(format!(
            "{} {operator} {}",
            quote_identifier(field),
            quote(value)?
        ))),
        FilterNode::Group {
            connective,
            children,
        } => {
            let mut parts = Vec::with_capacity(children.len());
            for child in children {
                if let Some(part) = render_node(child)? {
                    parts.push(part);
                }
            }
            Ok(match parts.len() {
                0 => None,
                1 => parts.pop(),
                _ => Some(format!("( {} )", parts.join(&format!(" {connective} ")))),
            })
        }
    }
}
