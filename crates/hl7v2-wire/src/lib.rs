//! HL7 v2 Wire Format - ER7 encoding
//!
//! This crate implements the pipe-delimited ER7 text format:
//! - Escape sequence decoding and encoding
//! - Per-level field/repetition/component/subcomponent splitting
//! - Message parsing (strict and tolerant)
//! - Message serialization with normalization and line continuation

pub mod escape;
pub mod split;
pub mod parser;
pub mod serializer;

pub use escape::*;
pub use split::*;
pub use parser::*;
pub use serializer::*;
