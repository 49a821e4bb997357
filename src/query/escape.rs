//! Identifier and literal escaping for dynamically built SQL.
//!
//! Every dynamic fragment in every operation must pass through
//! [`quote_identifier`] or [`quote_literal`]. Nothing else in the crate is
//! allowed to interpolate request data into SQL text.

use serde_json::Value;

/// Quote a schema object name (database, table, column) as a MySQL identifier.
///
/// Backticks inside the name are doubled, which is the only escape MySQL
/// recognizes inside a quoted identifier.
pub fn quote_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('`');
    for ch in name.chars() {
        if ch == '`' {
            out.push('`');
        }
        out.push(ch);
    }
    out.push('`');
    out
}

/// Quote a `database`.`table` pair.
pub fn quote_qualified(database: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(database), quote_identifier(table))
}

/// Render a JSON value as a MySQL literal.
///
/// Nested structured values (objects and arrays) are JSON-stringified and
/// embedded as string literals so a re-parse of the exported text yields an
/// equivalent document.
pub fn quote_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_string(s),
        Value::Array(_) | Value::Object(_) => {
            // serde_json never fails on its own Value tree
            quote_string(&value.to_string())
        }
    }
}

/// Quote a raw string as a MySQL string literal.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            '\u{1a}' => out.push_str("\\Z"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
    out
}

/// Build a `LIKE` pattern matching rows that contain `needle` anywhere.
///
/// `%`, `_` and `\` inside the needle are escaped so the match stays a plain
/// substring test.
pub fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.chars() {
        match ch {
            '%' | '_' | '\\' => {
                pattern.push('\\');
                pattern.push(ch);
            }
            _ => pattern.push(ch),
        }
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "`users`");
        assert_eq!(quote_identifier("weird`name"), "`weird``name`");
        assert_eq!(quote_qualified("app_db", "users"), "`app_db`.`users`");
    }

    #[test]
    fn test_quote_identifier_injection() {
        // A hostile table name cannot break out of the backticks
        assert_eq!(
            quote_identifier("t`; DROP TABLE users; --"),
            "`t``; DROP TABLE users; --`"
        );
    }

    #[test]
    fn test_quote_literal_scalars() {
        assert_eq!(quote_literal(&Value::Null), "NULL");
        assert_eq!(quote_literal(&json!(42)), "42");
        assert_eq!(quote_literal(&json!(-1.5)), "-1.5");
        assert_eq!(quote_literal(&json!(true)), "1");
        assert_eq!(quote_literal(&json!("plain")), "'plain'");
        assert_eq!(quote_literal(&json!("it's")), "'it\\'s'");
        assert_eq!(quote_literal(&json!("a\\b")), "'a\\\\b'");
        assert_eq!(quote_literal(&json!("line\nbreak")), "'line\\nbreak'");
    }

    #[test]
    fn test_quote_literal_nested() {
        let doc = json!({"tags": ["a", "b"], "n": 1});
        let literal = quote_literal(&doc);
        assert!(literal.starts_with('\''));
        assert!(literal.ends_with('\''));
        // The embedded text must round-trip back to the same document
        let inner = literal[1..literal.len() - 1]
            .replace("\\\"", "\"")
            .replace("\\\\", "\\");
        let reparsed: Value = serde_json::from_str(&inner).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("abc"), "%abc%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
    }
}
