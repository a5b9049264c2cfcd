//! HL7 v2 Version Migration
//!
//! This crate converts messages between HL7 v2.x versions:
//! - Profile lookup trait and an in-memory registry
//! - Migration plans (segment and field differences)
//! - Field-by-field conversion with accumulated warnings

pub mod profile;
pub mod plan;
pub mod warning;
pub mod convert;

pub use profile::*;
pub use plan::*;
pub use warning::*;
pub use convert::*;
