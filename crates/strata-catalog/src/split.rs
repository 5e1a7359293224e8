//! Split a script into individual SQL statements.
//!
//! Statements are separated by `;`. Separators inside single- or
//! double-quoted text, `--` line comments, and `/* */` block comments do not
//! count. Segments containing nothing but whitespace and comments are
//! dropped, so trailing `;` and commented-out blocks never reach the engine.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
}

/// Split `sql` into trimmed, non-empty statements, in source order.
///
/// Quotes are closed by the next matching quote character; an escaped
/// quote (`''`) simply closes and reopens the literal, which yields the
/// same split.
pub fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut state = State::Normal;
    let mut start = 0;
    let mut has_content = false;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        match state {
            State::Normal => match b {
                b';' => {
                    if has_content {
                        statements.push(sql[start..i].trim());
                    }
                    start = i + 1;
                    has_content = false;
                }
                b'\'' => {
                    state = State::SingleQuote;
                    has_content = true;
                }
                b'"' => {
                    state = State::DoubleQuote;
                    has_content = true;
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    i += 1;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    state = State::BlockComment;
                    i += 1;
                }
                _ if !b.is_ascii_whitespace() => has_content = true,
                _ => {}
            },
            State::SingleQuote => {
                if b == b'\'' {
                    state = State::Normal;
                }
            }
            State::DoubleQuote => {
                if b == b'"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if b == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    state = State::Normal;
                    i += 1;
                }
            }
        }
        i += 1;
    }

    if has_content {
        statements.push(sql[start..].trim());
    }
    statements
}

#[cfg(test)]
#[path = "split_test.rs"]
mod tests;
