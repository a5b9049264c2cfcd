//! Opaque tracking identifiers
//!
//! Ids are random 128-bit tokens. They never encode message content.

use std::fmt;
use std::str::FromStr;

const PREFIX: &str = "CORR-";

/// Conversation identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationId(pub u128);

/// Correlation ids share the conversation id space
pub type CorrelationId = ConversationId;

impl ConversationId {
    #[inline]
    pub fn new(id: u128) -> Self {
        ConversationId(id)
    }

    /// Fresh random id
    pub fn generate() -> Self {
        ConversationId(rand::random())
    }
}

impl fmt::Debug for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Conversation({:032x})", self.0)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:032X}", PREFIX, self.0)
    }
}

impl FromStr for ConversationId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix(PREFIX).unwrap_or(s);
        u128::from_str_radix(hex, 16).map(ConversationId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_roundtrip() {
        let id = ConversationId::new(0xDEAD_BEEF);
        let text = id.to_string();
        assert!(text.starts_with("CORR-"));
        assert_eq!(text.len(), 5 + 32);
        assert_eq!(text.parse::<ConversationId>().unwrap(), id);
    }

    proptest::proptest! {
        #[test]
        fn prop_display_parses_back(raw in proptest::prelude::any::<u128>()) {
            let id = ConversationId::new(raw);
            proptest::prop_assert_eq!(id.to_string().parse::<ConversationId>().unwrap(), id);
        }
    }

    #[test]
    fn test_generate_unique() {
        let a = ConversationId::generate();
        let b = ConversationId::generate();
        assert_ne!(a, b);
    }
}
