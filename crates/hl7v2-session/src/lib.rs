//! HL7 v2 Session State
//!
//! This crate holds per-conversation state that sits beside the codec:
//! - Lock-guarded conversation storage
//! - Request/response correlation and conversation tracking
//! - MSH-13 sequence numbering and gap detection
//! - ACK generation

pub mod store;
pub mod correlation;
pub mod sequence;
pub mod ack;

pub use store::*;
pub use correlation::*;
pub use sequence::*;
pub use ack::*;
