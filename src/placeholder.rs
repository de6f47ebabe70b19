//! Placeholder translation.
//!
//! Portable queries use `?` as a positional placeholder. Before a query
//! reaches the engine it is rewritten either to the engine's native numbered
//! parameters (`$1`, `$2`, ...) for prepared-statement binding, or to a fully
//! inlined form with each placeholder replaced by the bind's escaped literal
//! text for paths with no native binding.
//!
//! Both rewrites scan the query left to right exactly once. Placeholders
//! inside single-quoted string literals (including `''` escapes) are left
//! untouched; dollar-quoted and `E''` backslash-escaped literals are not
//! recognized.

use crate::error::{DriverError, Result};
use crate::types::SqlValue;

/// The portable positional placeholder character.
pub const MARKER: char = '?';

fn scan<F>(query: &str, mut on_marker: F) -> String
where
    F: FnMut(usize, &mut String),
{
    let mut out = String::with_capacity(query.len() + 8);
    let mut chars = query.chars().peekable();
    let mut in_literal = false;
    let mut index = 0usize;

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                if in_literal && chars.peek() == Some(&'\'') {
                    // doubled quote stays inside the literal
                    out.push('\'');
                    out.push(chars.next().unwrap());
                    continue;
                }
                in_literal = !in_literal;
                out.push(c);
            }
            MARKER if !in_literal => {
                index += 1;
                on_marker(index, &mut out);
            }
            _ => out.push(c),
        }
    }
    out
}

/// Rewrites each positional placeholder to the engine's numbered parameter
/// token, assigning indices 1..N in left-to-right order. Returns the rewritten
/// query and the marker count.
pub fn number_markers(query: &str) -> (String, usize) {
    let mut count = 0;
    let rewritten = scan(query, |index, out| {
        count = index;
        out.push('$');
        out.push_str(&index.to_string());
    });
    (rewritten, count)
}

/// Rewrites each positional placeholder to the corresponding bind value's
/// escaped literal text. `escape` must be the engine's canonical
/// string-escaping routine; anything weaker is an injection defect.
pub fn inline_binds<F>(query: &str, binds: &[SqlValue], escape: F) -> Result<String>
where
    F: Fn(&str) -> String,
{
    let mut missing = None;
    let inlined = scan(query, |index, out| {
        match binds.get(index - 1) {
            Some(value) => out.push_str(&value.to_literal(&escape)),
            None => missing = Some(index),
        }
    });
    if let Some(index) = missing {
        return Err(DriverError::Query(format!(
            "query expects at least {} bind values, got {}",
            index,
            binds.len()
        )));
    }
    Ok(inlined)
}

/// PostgreSQL's canonical string-literal escaping: single quotes are doubled;
/// when the input contains a backslash the `E''` form is used with doubled
/// backslashes, matching what libpq's PQescapeLiteral produces.
pub fn escape_literal(raw: &str) -> String {
    let escaped = raw.replace('\'', "''");
    if raw.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{escaped}'")
    }
}
