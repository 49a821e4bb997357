//! Splitting raw query text into individual statements.
//!
//! The console accepts free-form SQL from the query editor, so a batch may
//! contain several `;`-separated statements. The split has to ignore
//! semicolons inside string literals, quoted identifiers, and comments.

/// Split `text` into trimmed, non-empty statements on top-level semicolons.
pub fn split_statements(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    #[derive(PartialEq)]
    enum Ctx {
        Plain,
        Single,
        Double,
        Backtick,
        LineComment,
        BlockComment,
    }
    let mut ctx = Ctx::Plain;

    while let Some(ch) = chars.next() {
        match ctx {
            Ctx::Plain => match ch {
                ';' => {
                    push_statement(&mut statements, &mut current);
                    continue;
                }
                '\'' => {
                    ctx = Ctx::Single;
                }
                '"' => {
                    ctx = Ctx::Double;
                }
                '`' => {
                    ctx = Ctx::Backtick;
                }
                '#' => {
                    ctx = Ctx::LineComment;
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    current.push_str("--");
                    ctx = Ctx::LineComment;
                    continue;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    current.push_str("/*");
                    ctx = Ctx::BlockComment;
                    continue;
                }
                _ => {}
            },
            Ctx::Single | Ctx::Double => {
                let quote = if ctx == Ctx::Single { '\'' } else { '"' };
                if ch == '\\' {
                    // Backslash escape consumes the next character verbatim
                    current.push(ch);
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                    continue;
                }
                if ch == quote {
                    ctx = Ctx::Plain;
                }
            }
            Ctx::Backtick => {
                if ch == '`' {
                    ctx = Ctx::Plain;
                }
            }
            Ctx::LineComment => {
                if ch == '\n' {
                    ctx = Ctx::Plain;
                }
            }
            Ctx::BlockComment => {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    current.push_str("*/");
                    ctx = Ctx::Plain;
                    continue;
                }
            }
        }
        current.push(ch);
    }
    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

/// If `statement` is a `USE <database>` context switch, return the database
/// name with any backtick quoting stripped.
pub fn parse_use(statement: &str) -> Option<String> {
    let trimmed = statement.trim();
    let rest = trimmed.strip_prefix("USE").or_else(|| {
        if trimmed.len() >= 3 && trimmed[..3].eq_ignore_ascii_case("USE") {
            Some(&trimmed[3..])
        } else {
            None
        }
    })?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let name = rest.trim().trim_end_matches(';').trim();
    let name = name.strip_prefix('`').unwrap_or(name);
    let name = name.strip_suffix('`').unwrap_or(name);
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some(name.replace("``", "`"))
}
