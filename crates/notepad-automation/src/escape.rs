//! Embedding untrusted text in PowerShell literals.
//!
//! User text (pasted content, save-as paths) is carried in single-quoted
//! here-strings (`@'` ... `'@`). Inside one, nothing is interpolated; the only
//! way out is a line that begins, after optional whitespace, with a quote
//! character followed by `@`. [`escape_for_literal`] splits the text right
//! between that quote and its `@`, emits each piece as its own here-string and
//! joins them with `+`, so the interpreter rebuilds the original text without
//! ever seeing a closing delimiter inside the source.
//!
//! Key specifications use plain single-quoted strings instead and go through
//! [`double_single_quotes`].

/// PowerShell accepts the ASCII apostrophe and the typographic single quotes
/// as interchangeable single-quote characters.
const SINGLE_QUOTES: [char; 5] = ['\'', '\u{2018}', '\u{2019}', '\u{201A}', '\u{201B}'];

pub fn is_single_quote(c: char) -> bool {
    SINGLE_QUOTES.contains(&c)
}

fn is_line_break(c: char) -> bool {
    c == '\n' || c == '\r'
}

/// Byte offsets of every `@` that would close a here-string together with
/// the quote right before it.
fn closing_delimiter_splits(text: &str) -> Vec<usize> {
    let mut splits = Vec::new();
    let mut at_line_start = true;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if is_line_break(c) {
            at_line_start = true;
        } else if at_line_start && c.is_whitespace() {
            // leading indentation does not protect the delimiter
        } else if at_line_start && is_single_quote(c) {
            if let Some(&(at, '@')) = chars.peek() {
                splits.push(at);
            }
            at_line_start = false;
        } else {
            at_line_start = false;
        }
    }
    splits
}

fn here_string(content: &str) -> String {
    format!("@'\n{content}\n'@")
}

/// Encode `text` as a PowerShell expression that evaluates to exactly `text`.
///
/// The common case is a single here-string. Text containing closing
/// delimiters, or ending in carriage returns (which the interpreter would
/// fold into the here-string's final line break), becomes a parenthesized
/// concatenation.
pub fn escape_for_literal(text: &str) -> String {
    let body = text.trim_end_matches('\r');
    let trailing_cr = text.len() - body.len();

    let mut pieces = Vec::new();
    let mut start = 0;
    for split in closing_delimiter_splits(body) {
        pieces.push(here_string(&body[start..split]));
        start = split;
    }
    pieces.push(here_string(&body[start..]));

    if trailing_cr > 0 {
        pieces.push(format!("\"{}\"", "`r".repeat(trailing_cr)));
    }

    if pieces.len() == 1 {
        pieces.remove(0)
    } else {
        format!("({})", pieces.join(" + "))
    }
}

/// Double every single-quote character so `spec` can sit inside `'...'`.
///
/// This is a one-shot transform: feeding its own output back in doubles the
/// quotes again. Apply it exactly once, right before interpolation.
pub fn double_single_quotes(spec: &str) -> String {
    let mut out = String::with_capacity(spec.len());
    for c in spec.chars() {
        out.push(c);
        if is_single_quote(c) {
            out.push(c);
        }
    }
    out
}

/// Evaluate an expression produced by [`escape_for_literal`] the way the
/// PowerShell tokenizer reads it: a here-string ends at the first line that
/// starts with a quote and `@`, wherever that line is.
///
/// Returns `None` when the expression is not a `+`-joined run of
/// here-strings and `` "`r" `` literals.
pub fn decode_literal(expr: &str) -> Option<String> {
    let mut rest = expr.trim();
    if let Some(inner) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        rest = inner;
    }

    let mut out = String::new();
    loop {
        rest = rest.trim_start_matches(' ');
        if let Some(body) = rest.strip_prefix("@'\n") {
            let (content, after) = read_here_string(body)?;
            out.push_str(content);
            rest = after;
        } else if let Some(body) = rest.strip_prefix('"') {
            let end = body.find('"')?;
            out.push_str(&body[..end].replace("`r", "\r"));
            rest = &body[end + 1..];
        } else {
            return None;
        }

        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return Some(out);
        }
        rest = rest.strip_prefix('+')?;
    }
}

/// Split a here-string body (text after `@'\n`) into its value and whatever
/// follows the closing delimiter.
fn read_here_string(body: &str) -> Option<(&str, &str)> {
    let mut line_start = 0;
    loop {
        let line = &body[line_start..];
        let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
        let mut tail = line[indent..].chars();
        if matches!(tail.next(), Some(q) if is_single_quote(q)) && tail.next() == Some('@') {
            let raw = &body[..line_start];
            let value = match raw.strip_suffix('\n') {
                Some(v) => v.strip_suffix('\r').unwrap_or(v),
                None => raw.strip_suffix('\r').unwrap_or(raw),
            };
            return Some((value, tail.as_str()));
        }
        let next_break = line.find(is_line_break)?;
        line_start += next_break + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(text: &str) {
        let expr = escape_for_literal(text);
        assert_eq!(
            decode_literal(&expr).as_deref(),
            Some(text),
            "round trip failed for {text:?} via {expr:?}"
        );
    }

    #[test]
    fn plain_text_is_single_here_string() {
        assert_eq!(escape_for_literal("hello"), "@'\nhello\n'@");
        round_trip("hello");
    }

    #[test]
    fn closing_delimiter_at_line_start_is_split() {
        let text = "first\n'@\nWrite-Host pwned";
        let expr = escape_for_literal(text);
        assert!(expr.starts_with('('));
        assert!(!expr.contains("\n'@\nWrite-Host"));
        round_trip(text);
    }

    #[test]
    fn indented_and_typographic_delimiters() {
        round_trip("a\n   '@ still text");
        round_trip("a\n\t\u{2019}@ curly");
        round_trip("\u{2018}@ at the very start");
        round_trip("'@");
        round_trip("x\r'@ after lone carriage return");
    }

    #[test]
    fn delimiter_not_at_line_start_is_left_alone() {
        let text = "line1\nline2\"@trick";
        assert_eq!(escape_for_literal(text), here_string(text));
        round_trip(text);
        round_trip("it's '@ mid line");
    }

    #[test]
    fn dollar_signs_and_backticks_stay_literal() {
        let text = "$env:USERPROFILE `n $(Remove-Item C:\\)";
        assert_eq!(escape_for_literal(text), here_string(text));
        round_trip(text);
    }

    #[test]
    fn line_endings_survive() {
        round_trip("");
        round_trip("\n");
        round_trip("trailing newline\n");
        round_trip("windows\r\nline endings\r\n");
        round_trip("ends with cr\r");
        round_trip("ends with two cr\r\r");
    }

    #[test]
    fn unicode_round_trips() {
        round_trip("héllo wörld\n日本語テキスト\n'@ 🎉");
    }

    #[test]
    fn many_delimiters_produce_many_pieces() {
        let text = "'@\n'@\n'@";
        let expr = escape_for_literal(text);
        assert_eq!(expr.matches(" + ").count(), 3);
        round_trip(text);
    }

    #[test]
    fn naive_here_string_would_break() {
        // Sanity check on the decoder: it must see the early terminator.
        let naive = here_string("a\n'@\nb");
        assert_ne!(decode_literal(&naive).as_deref(), Some("a\n'@\nb"));
    }

    #[test]
    fn double_single_quotes_doubles_every_quote() {
        assert_eq!(double_single_quotes("it's"), "it''s");
        assert_eq!(double_single_quotes("{ENTER}"), "{ENTER}");
        assert_eq!(double_single_quotes("\u{2019}"), "\u{2019}\u{2019}");
    }

    #[test]
    fn double_single_quotes_is_one_shot() {
        let once = double_single_quotes("a'b");
        let twice = double_single_quotes(&once);
        assert_eq!(once, "a''b");
        assert_eq!(twice, "a''''b");
        assert_ne!(once, twice);
    }
}
