//! Recursive tokenizer for `<%...%>` command markers
//!
//! Block text is split into alternating literal and command segments. Markers
//! nest: `<%IF:<%GET:x%>%>` is one command whose payload is `IF:<%GET:x%>`.
//! The escape character hides the byte after it from the depth scan, so `\%>`
//! never closes a marker. An opener without a matching close stays literal.

pub const OPEN: &str = "<%";
pub const CLOSE: &str = "%>";
pub const ESCAPE: u8 = b'\\';

/// A segment of block text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal text, emitted as-is
    Text(String),
    /// Marker payload without the delimiters, e.g. `SET:x,1`
    Command(String),
}

/// Split block text into literal and command segments
pub fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if !starts_with_at(bytes, i, OPEN) {
            i += 1;
            continue;
        }

        match find_close(bytes, i + OPEN.len()) {
            Some(close) => {
                if literal_start < i {
                    tokens.push(Token::Text(text[literal_start..i].to_string()));
                }
                tokens.push(Token::Command(text[i + OPEN.len()..close].to_string()));
                i = close + CLOSE.len();
                literal_start = i;
            }
            // Unbalanced: leave the opener as text and keep scanning after it
            None => i += OPEN.len(),
        }
    }

    if literal_start < bytes.len() {
        tokens.push(Token::Text(text[literal_start..].to_string()));
    }

    tokens
}

/// Find the byte offset of the `%>` that closes a marker opened just before `start`
fn find_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = start;

    while i < bytes.len() {
        if bytes[i] == ESCAPE {
            i += 2;
        } else if starts_with_at(bytes, i, OPEN) {
            depth += 1;
            i += OPEN.len();
        } else if starts_with_at(bytes, i, CLOSE) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            i += CLOSE.len();
        } else {
            i += 1;
        }
    }

    None
}

pub(crate) fn starts_with_at(bytes: &[u8], at: usize, pattern: &str) -> bool {
    bytes
        .get(at..at + pattern.len())
        .is_some_and(|window| window == pattern.as_bytes())
}

/// True when the text contains at least one complete marker
pub fn has_commands(text: &str) -> bool {
    tokenize(text)
        .iter()
        .any(|t| matches!(t, Token::Command(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Token {
        Token::Text(s.into())
    }

    fn cmd(s: &str) -> Token {
        Token::Command(s.into())
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(tokenize("just words"), vec![text("just words")]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_single_command() {
        assert_eq!(
            tokenize("Today is <%DATE:today%>."),
            vec![text("Today is "), cmd("DATE:today"), text(".")]
        );
    }

    #[test]
    fn test_adjacent_commands() {
        assert_eq!(
            tokenize("<%SET:x,1%><%GET:x%>"),
            vec![cmd("SET:x,1"), cmd("GET:x")]
        );
    }

    #[test]
    fn test_nested_markers_stay_in_one_command() {
        assert_eq!(
            tokenize("a <%IFVAR:x,<%GET:y%>%> b"),
            vec![text("a "), cmd("IFVAR:x,<%GET:y%>"), text(" b")]
        );
        assert_eq!(
            tokenize("<%A:<%B:<%C%>%>%>"),
            vec![cmd("A:<%B:<%C%>%>")]
        );
    }

    #[test]
    fn test_unbalanced_marker_is_literal() {
        assert_eq!(tokenize("text <%FOO"), vec![text("text <%FOO")]);
    }

    #[test]
    fn test_unbalanced_outer_with_balanced_inner() {
        assert_eq!(
            tokenize("<%A <%B%> tail"),
            vec![text("<%A "), cmd("B"), text(" tail")]
        );
    }

    #[test]
    fn test_escaped_close_does_not_end_marker() {
        assert_eq!(
            tokenize(r"<%SET:x,50\%>%>!"),
            vec![cmd(r"SET:x,50\%>"), text("!")]
        );
    }

    #[test]
    fn test_stray_close_is_literal() {
        assert_eq!(tokenize("100%> done"), vec![text("100%> done")]);
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        assert_eq!(
            tokenize("é <%TIME%> ü"),
            vec![text("é "), cmd("TIME"), text(" ü")]
        );
    }

    #[test]
    fn test_has_commands() {
        assert!(has_commands("x <%TIME%>"));
        assert!(!has_commands("x <%TIME"));
    }
}
