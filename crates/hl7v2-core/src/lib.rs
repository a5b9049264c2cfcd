//! HL7 v2 Core - Message model and shared types
//!
//! This crate defines the types used throughout the HL7 v2 workspace:
//! - Encoding characters (delimiter sets)
//! - Message model (Message, Segment, Field, Component, Subcomponent)
//! - Version ordering helpers
//! - Tracking identifiers
//! - Error taxonomy

pub mod encoding;
pub mod model;
pub mod version;
pub mod id;
pub mod error;

pub use encoding::*;
pub use model::*;
pub use version::*;
pub use id::*;
pub use error::*;
