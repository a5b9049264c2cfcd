//! Per-level ER7 splitting
//!
//! Each level is a pure function over a slice and the delimiter set.
//! Escape sequences are skipped as a unit while scanning, so a delimiter is
//! only ever recognized outside of one. Unescaping happens at the leaf.

use hl7v2_core::{Component, EncodingCharacters, Field, ParseErrorKind, Subcomponent};

use crate::escape::unescape;

/// Wire form of an explicit null
pub const NULL_VALUE: &str = "\"\"";

/// Split failure and the 0-based part it occurred in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitError {
    pub kind: ParseErrorKind,
    pub part: usize,
}

/// Split `text` on `sep`, skipping over escape sequences
pub fn split_level<'a>(
    text: &'a str,
    sep: char,
    esc: char,
    tolerant: bool,
) -> Result<Vec<&'a str>, SplitError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    while let Some(c) = text[pos..].chars().next() {
        if c == esc {
            let open_end = pos + c.len_utf8();
            match text[open_end..].find(esc) {
                Some(offset) => {
                    pos = open_end + offset + esc.len_utf8();
                    continue;
                }
                None if tolerant => {}
                None => {
                    return Err(SplitError {
                        kind: ParseErrorKind::UnterminatedEscape,
                        part: parts.len(),
                    })
                }
            }
        } else if c == sep {
            parts.push(&text[start..pos]);
            start = pos + c.len_utf8();
        }
        pos += c.len_utf8();
    }
    parts.push(&text[start..]);
    Ok(parts)
}

/// Parse one field position into its repetitions
pub fn parse_repetitions(
    text: &str,
    enc: &EncodingCharacters,
    tolerant: bool,
) -> Result<Vec<Field>, ParseErrorKind> {
    split_level(text, enc.repetition, enc.escape, tolerant)
        .map_err(|e| e.kind)?
        .into_iter()
        .map(|rep| parse_field(rep, enc, tolerant))
        .collect()
}

/// Parse a single repetition.
///
/// `""` is null, zero-length text is empty.
pub fn parse_field(
    text: &str,
    enc: &EncodingCharacters,
    tolerant: bool,
) -> Result<Field, ParseErrorKind> {
    if text == NULL_VALUE {
        return Ok(Field::null());
    }
    if text.is_empty() {
        return Ok(Field::empty());
    }
    let components = split_level(text, enc.component, enc.escape, tolerant)
        .map_err(|e| e.kind)?
        .into_iter()
        .map(|comp| parse_component(comp, enc, tolerant))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Field::new(components))
}

pub fn parse_component(
    text: &str,
    enc: &EncodingCharacters,
    tolerant: bool,
) -> Result<Component, ParseErrorKind> {
    let subcomponents = split_level(text, enc.subcomponent, enc.escape, tolerant)
        .map_err(|e| e.kind)?
        .into_iter()
        .map(|sub| unescape(sub, enc, tolerant).map(Subcomponent::new))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Component::new(subcomponents))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc() -> EncodingCharacters {
        EncodingCharacters::default()
    }

    #[test]
    fn test_split_plain() {
        assert_eq!(split_level("a|b||c", '|', '\\', false).unwrap(), vec!["a", "b", "", "c"]);
        assert_eq!(split_level("", '|', '\\', false).unwrap(), vec![""]);
        assert_eq!(split_level("a|", '|', '\\', false).unwrap(), vec!["a", ""]);
    }

    #[test]
    fn test_split_skips_escapes() {
        assert_eq!(
            split_level("a\\S\\b^c", '^', '\\', false).unwrap(),
            vec!["a\\S\\b", "c"]
        );
    }

    #[test]
    fn test_split_unterminated() {
        let err = split_level("a^b\\S^c", '^', '\\', false).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedEscape);
        assert_eq!(err.part, 1);
        assert_eq!(
            split_level("a^b\\S^c", '^', '\\', true).unwrap(),
            vec!["a", "b\\S", "c"]
        );
    }

    #[test]
    fn test_parse_field_levels() {
        let field = parse_field("Smith&Jr^John^^Q", &enc(), false).unwrap();
        assert_eq!(field.components.len(), 4);
        let family = field.component(1).unwrap();
        assert_eq!(family.subcomponent(1).unwrap().value, "Smith");
        assert_eq!(family.subcomponent(2).unwrap().value, "Jr");
        assert_eq!(field.component(2).unwrap().value(), "John");
        assert!(field.component(3).unwrap().is_empty());
    }

    #[test]
    fn test_null_and_empty() {
        assert_eq!(parse_field("\"\"", &enc(), false).unwrap(), Field::null());
        assert_eq!(parse_field("", &enc(), false).unwrap(), Field::empty());
    }

    #[test]
    fn test_repetitions() {
        let reps = parse_repetitions("A~\"\"~", &enc(), false).unwrap();
        assert_eq!(reps.len(), 3);
        assert_eq!(reps[0].value(), "A");
        assert!(reps[1].is_null);
        assert!(reps[2].is_empty());
    }

    #[test]
    fn test_escaped_delimiter_stays_in_leaf() {
        let field = parse_field("a\\F\\b", &enc(), false).unwrap();
        assert_eq!(field.components.len(), 1);
        assert_eq!(field.value(), "a|b");
    }
}
