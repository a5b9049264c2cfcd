//! ER7 escape sequences
//!
//! Delimiter escapes (`F S T R E`) decode to the owning message's
//! delimiters. `\.br\` maps to a newline and `\X0D\` to a carriage return.
//! A value that is literally `""` is sent as `\X22\"` so it is not read
//! back as a null.
//! Formatting and character-set sequences without a plain-text meaning are
//! kept verbatim so they survive a round trip.

use hl7v2_core::{EncodingCharacters, ParseErrorKind};

use crate::split::NULL_VALUE;

const LINE_BREAK: &str = ".br";
const CARRIAGE_RETURN: &str = "X0D";
const QUOTE: &str = "X22";

/// Sequences preserved verbatim in decoded text
pub fn is_passthrough_body(body: &str) -> bool {
    match body {
        "H" | "N" | ".fi" | ".nf" | ".ce" => return true,
        _ => {}
    }
    if let Some(arg) = [".sp", ".in", ".ti", ".sk"]
        .iter()
        .find_map(|cmd| body.strip_prefix(cmd))
    {
        let digits = arg.strip_prefix(['+', '-']).unwrap_or(arg);
        return digits.chars().all(|c| c.is_ascii_digit());
    }
    let mut chars = body.chars();
    match chars.next() {
        Some('X') => {
            let hex = chars.as_str();
            !hex.is_empty() && hex.len() % 2 == 0 && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        Some('Z') => chars.as_str().chars().all(|c| c.is_ascii_alphanumeric()),
        Some('C') => {
            let hex = chars.as_str();
            hex.len() == 4 && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        Some('M') => {
            let hex = chars.as_str();
            (hex.len() == 4 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit())
        }
        _ => false,
    }
}

/// Decode one leaf value.
///
/// In tolerant mode unterminated or unknown sequences stay literal.
pub fn unescape(
    text: &str,
    enc: &EncodingCharacters,
    tolerant: bool,
) -> Result<String, ParseErrorKind> {
    let esc = enc.escape;
    if !text.contains(esc) {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(esc) {
        out.push_str(&rest[..start]);
        let after = &rest[start + esc.len_utf8()..];
        let Some(end) = after.find(esc) else {
            if tolerant {
                out.push_str(&rest[start..]);
                return Ok(out);
            }
            return Err(ParseErrorKind::UnterminatedEscape);
        };
        let body = &after[..end];
        match body {
            "F" => out.push(enc.field),
            "S" => out.push(enc.component),
            "T" => out.push(enc.subcomponent),
            "R" => out.push(enc.repetition),
            "E" => out.push(esc),
            LINE_BREAK => out.push('\n'),
            CARRIAGE_RETURN => out.push('\r'),
            QUOTE => out.push('"'),
            _ if is_passthrough_body(body) || tolerant => {
                out.push(esc);
                out.push_str(body);
                out.push(esc);
            }
            _ => return Err(ParseErrorKind::InvalidEscape(body.to_string())),
        }
        rest = &after[end + esc.len_utf8()..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Encode one leaf value for the wire
pub fn escape(text: &str, enc: &EncodingCharacters) -> String {
    let esc = enc.escape;
    let mut out = String::with_capacity(text.len() + 8);
    if text == NULL_VALUE {
        push_escape(&mut out, esc, QUOTE);
        out.push('"');
        return out;
    }
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if c == esc {
            if let Some(len) = passthrough_len(rest, esc) {
                out.push_str(&rest[..len]);
                rest = &rest[len..];
                continue;
            }
            push_escape(&mut out, esc, "E");
        } else if c == enc.field {
            push_escape(&mut out, esc, "F");
        } else if c == enc.component {
            push_escape(&mut out, esc, "S");
        } else if c == enc.subcomponent {
            push_escape(&mut out, esc, "T");
        } else if c == enc.repetition {
            push_escape(&mut out, esc, "R");
        } else if c == '\n' {
            push_escape(&mut out, esc, LINE_BREAK);
        } else if c == '\r' {
            push_escape(&mut out, esc, CARRIAGE_RETURN);
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}

/// Byte length of a verbatim sequence at the start of `text`, if any.
/// `\X0D\` and `\X22\` are excluded since they decode to real characters.
fn passthrough_len(text: &str, esc: char) -> Option<usize> {
    let after = &text[esc.len_utf8()..];
    let end = after.find(esc)?;
    let body = &after[..end];
    if body != CARRIAGE_RETURN && body != QUOTE && is_passthrough_body(body) {
        Some(esc.len_utf8() * 2 + end)
    } else {
        None
    }
}

#[inline]
fn push_escape(out: &mut String, esc: char, body: &str) {
    out.push(esc);
    out.push_str(body);
    out.push(esc);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn enc() -> EncodingCharacters {
        EncodingCharacters::default()
    }

    #[test]
    fn test_unescape_delimiters() {
        let decoded = unescape("a\\F\\b\\S\\c\\T\\d\\R\\e\\E\\f", &enc(), false).unwrap();
        assert_eq!(decoded, "a|b^c&d~e\\f");
    }

    #[test]
    fn test_unescape_uses_message_delimiters() {
        let custom = EncodingCharacters::from_msh2('#', "$*!@");
        assert_eq!(unescape("x!F!y", &custom, false).unwrap(), "x#y");
        assert_eq!(unescape("x!S!y", &custom, false).unwrap(), "x$y");
    }

    #[test]
    fn test_unescape_line_break() {
        assert_eq!(unescape("one\\.br\\two", &enc(), false).unwrap(), "one\ntwo");
    }

    #[test]
    fn test_unescape_keeps_formatting() {
        let text = "\\H\\bold\\N\\ \\.sp2\\ \\X41\\";
        assert_eq!(unescape(text, &enc(), false).unwrap(), text);
    }

    #[test]
    fn test_unescape_unterminated() {
        assert_eq!(
            unescape("abc\\F", &enc(), false),
            Err(ParseErrorKind::UnterminatedEscape)
        );
        assert_eq!(unescape("abc\\F", &enc(), true).unwrap(), "abc\\F");
    }

    #[test]
    fn test_unescape_unknown() {
        assert_eq!(
            unescape("a\\Q\\b", &enc(), false),
            Err(ParseErrorKind::InvalidEscape("Q".into()))
        );
        assert_eq!(unescape("a\\Q\\b", &enc(), true).unwrap(), "a\\Q\\b");
    }

    #[test]
    fn test_escape_delimiters() {
        assert_eq!(escape("a|b^c&d~e\\f", &enc()), "a\\F\\b\\S\\c\\T\\d\\R\\e\\E\\f");
        assert_eq!(escape("l1\nl2", &enc()), "l1\\.br\\l2");
    }

    #[test]
    fn test_escape_passes_formatting_through() {
        assert_eq!(escape("\\H\\bold\\N\\", &enc()), "\\H\\bold\\N\\");
        assert_eq!(escape("C:\\temp", &enc()), "C:\\E\\temp");
    }

    #[test]
    fn test_literal_quote_pair() {
        assert_eq!(escape("\"\"", &enc()), "\\X22\\\"");
        assert_eq!(unescape("\\X22\\\"", &enc(), false).unwrap(), "\"\"");
        // only the exact null form is rewritten
        assert_eq!(escape("say \"\"", &enc()), "say \"\"");
        assert_eq!(escape("\\X22\\", &enc()), "\\E\\X22\\E\\");
    }

    #[test]
    fn test_passthrough_bodies() {
        assert!(is_passthrough_body(".sp"));
        assert!(is_passthrough_body(".in-4"));
        assert!(is_passthrough_body("XA0B1"));
        assert!(is_passthrough_body("C2842"));
        assert!(!is_passthrough_body("X1"));
        assert!(!is_passthrough_body("F"));
        assert!(!is_passthrough_body(""));
    }

    proptest! {
        #[test]
        fn prop_escape_unescape(text in "[a-zA-Z0-9 |^~&\"\\n\\r.-]{0,40}") {
            let encoded = escape(&text, &enc());
            prop_assert!(!encoded.contains('|'));
            prop_assert!(!encoded.contains('^'));
            prop_assert!(!encoded.contains('~'));
            prop_assert!(!encoded.contains('&'));
            prop_assert_eq!(unescape(&encoded, &enc(), false).unwrap(), text);
        }
    }
}
