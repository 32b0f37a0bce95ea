use std::borrow::Cow;
use std::fmt::Write as _;

use crate::error::SqlPoolError;
use crate::types::SqlValue;

/// Render a value as a literal that can be inlined into a statement.
///
/// Numbers render bare, booleans as `1`/`0`, text single-quoted with quotes
/// doubled, NULL as `NULL`. Raw expressions pass through untouched.
///
/// # Errors
/// Returns [`SqlPoolError::InvalidArgument`] for JSON documents and non-finite
/// floats, which have no literal form.
pub fn quote(value: &SqlValue) -> Result<Cow<'_, str>, SqlPoolError> {
    match value {
        SqlValue::Null => Ok(Cow::Borrowed("NULL")),
        SqlValue::Int(i) => Ok(Cow::Owned(i.to_string())),
        SqlValue::Float(f) if f.is_finite() => Ok(Cow::Owned(format!("{f:?}"))),
        SqlValue::Float(f) => Err(SqlPoolError::invalid(format!(
            "cannot inline non-finite float {f}"
        ))),
        SqlValue::Bool(b) => Ok(Cow::Borrowed(if *b { "1" } else { "0" })),
        SqlValue::Text(s) => Ok(Cow::Owned(quote_text(s))),
        SqlValue::Timestamp(ts) => Ok(Cow::Owned(quote_text(
            &ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        ))),
        SqlValue::Raw(expr) => Ok(Cow::Borrowed(expr.as_str())),
        SqlValue::Blob(bytes) => Ok(Cow::Owned(quote_blob(bytes))),
        SqlValue::JSON(json) => Err(SqlPoolError::invalid(format!(
            "cannot inline structured value {json}"
        ))),
    }
}

/// Single-quote `text`, doubling embedded quotes. NUL bytes cannot appear in a
/// SQLite string literal, so they are spliced in with `char(0)`.
fn quote_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    for (i, part) in text.split('\0').enumerate() {
        if i > 0 {
            out.push_str(" || char(0) || ");
        }
        out.push('\'');
        out.push_str(&part.replace('\'', "''"));
        out.push('\'');
    }
    out
}

fn quote_blob(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("X'");
    for byte in bytes {
        let _ = write!(out, "{byte:02X}");
    }
    out.push('\'');
    out
}

/// Quote an identifier with backticks, doubling embedded backticks.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Leave plain identifiers bare, quote anything else.
pub(crate) fn bare_identifier(name: &str) -> Cow<'_, str> {
    let plain = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(quote_identifier(name))
    }
}
