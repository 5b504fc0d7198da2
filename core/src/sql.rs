//! Identifier and literal rendering for generated SQL.

use crate::error::{ModelError, Result};
use crate::value::Value;

/// Validates that a name can be used as a quoted identifier.
///
/// Any non-empty name without NUL characters is accepted since every
/// generated statement quotes identifiers.
pub(crate) fn validate_identifier(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.contains('\0') {
        return Err(ModelError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Quotes an identifier, doubling embedded quotes.
///
/// # Examples
///
/// ```
/// use objectsql_core::sql::quote_identifier;
///
/// assert_eq!(quote_identifier("Customer"), "\"Customer\"");
/// assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
/// ```
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Renders a stored value as a SQL literal.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Real(v) => {
            let text = v.to_string();
            if text.contains(['.', 'e', 'E']) || !v.is_finite() {
                text
            } else {
                format!("{text}.0")
            }
        }
        Value::Text(v) => format!("'{}'", v.replace('\'', "''")),
        Value::Blob(v) => {
            let hex: String = v.iter().map(|b| format!("{b:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

/// Normalizes a default-value expression for comparison: strips
/// whitespace and redundant outer parentheses, and uppercases keywords
/// outside of string literals.
pub fn normalize_default(expression: &str) -> String {
    let mut text = expression.trim();
    while text.starts_with('(') && text.ends_with(')') && wraps_whole(text) {
        text = text[1..text.len() - 1].trim();
    }

    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    for ch in text.chars() {
        if ch == '\'' {
            in_string = !in_string;
        }
        if in_string || ch == '\'' {
            out.push(ch);
        } else if !ch.is_whitespace() {
            out.push(ch.to_ascii_uppercase());
        }
    }
    out
}

/// Returns `true` when the opening parenthesis at index 0 closes at the end.
fn wraps_whole(text: &str) -> bool {
    let mut depth = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != text.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
