//! ER7 delimiter set
//!
//! Every message carries its own delimiters, read from MSH-1 and MSH-2.
//! Codecs must use these rather than the defaults.

/// Default field separator
pub const DEFAULT_FIELD_SEPARATOR: char = '|';
/// Default component separator
pub const DEFAULT_COMPONENT_SEPARATOR: char = '^';
/// Default repetition separator
pub const DEFAULT_REPETITION_SEPARATOR: char = '~';
/// Default escape character
pub const DEFAULT_ESCAPE_CHARACTER: char = '\\';
/// Default subcomponent separator
pub const DEFAULT_SUBCOMPONENT_SEPARATOR: char = '&';

/// Delimiters used to encode one message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EncodingCharacters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
    /// Line continuation marker from MSH-14, if any
    pub continuation: Option<char>,
}

impl EncodingCharacters {
    pub const fn new(
        field: char,
        component: char,
        repetition: char,
        escape: char,
        subcomponent: char,
    ) -> Self {
        EncodingCharacters {
            field,
            component,
            repetition,
            escape,
            subcomponent,
            continuation: None,
        }
    }

    /// Build the delimiter set from MSH-1 and the raw MSH-2 text.
    ///
    /// MSH-2 shorter than four characters cannot be interpreted positionally,
    /// so the defaults are used for all four.
    pub fn from_msh2(field: char, msh2: &str) -> Self {
        let chars: Vec<char> = msh2.chars().collect();
        if chars.len() < 4 {
            tracing::warn!(
                "MSH-2 {:?} has fewer than 4 encoding characters, using defaults",
                msh2
            );
            return EncodingCharacters {
                field,
                ..Self::default()
            };
        }
        EncodingCharacters::new(field, chars[0], chars[1], chars[2], chars[3])
    }

    /// Set the continuation character
    pub fn with_continuation(mut self, continuation: Option<char>) -> Self {
        self.continuation = continuation;
        self
    }

    /// MSH-2 text for this set
    pub fn msh2(&self) -> String {
        [self.component, self.repetition, self.escape, self.subcomponent]
            .iter()
            .collect()
    }

    /// Whether `c` is one of the five delimiters
    #[inline]
    pub fn is_delimiter(&self, c: char) -> bool {
        c == self.field
            || c == self.component
            || c == self.repetition
            || c == self.escape
            || c == self.subcomponent
    }
}

impl Default for EncodingCharacters {
    fn default() -> Self {
        EncodingCharacters::new(
            DEFAULT_FIELD_SEPARATOR,
            DEFAULT_COMPONENT_SEPARATOR,
            DEFAULT_REPETITION_SEPARATOR,
            DEFAULT_ESCAPE_CHARACTER,
            DEFAULT_SUBCOMPONENT_SEPARATOR,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let enc = EncodingCharacters::default();
        assert_eq!(enc.field, '|');
        assert_eq!(enc.msh2(), "^~\\&");
        assert_eq!(enc.continuation, None);
    }

    #[test]
    fn test_from_msh2_custom() {
        let enc = EncodingCharacters::from_msh2('#', "$*!@");
        assert_eq!(enc.field, '#');
        assert_eq!(enc.component, '$');
        assert_eq!(enc.repetition, '*');
        assert_eq!(enc.escape, '!');
        assert_eq!(enc.subcomponent, '@');
        assert!(enc.is_delimiter('!'));
        assert!(!enc.is_delimiter('|'));
    }

    #[test]
    fn test_from_msh2_short_falls_back() {
        let enc = EncodingCharacters::from_msh2('|', "^~");
        assert_eq!(enc, EncodingCharacters::default());
    }

    #[test]
    fn test_from_msh2_ignores_truncation_char() {
        let enc = EncodingCharacters::from_msh2('|', "^~\\&#");
        assert_eq!(enc.msh2(), "^~\\&");
    }
}
