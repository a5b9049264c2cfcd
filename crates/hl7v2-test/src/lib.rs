//! HL7 v2 Test Harness - Fixtures, scenarios, and stress tools
//!
//! This crate provides:
//! - Sample messages and a fixture profile registry
//! - A simulated receiving endpoint (parse, sequence, track, acknowledge)
//! - Seeded message fuzzing for codec round trips
//! - Threaded stress runs for the session state

pub mod fixtures;
pub mod endpoint;
pub mod message_fuzzer;
pub mod stress;

pub use fixtures::*;
pub use endpoint::*;
pub use message_fuzzer::*;
pub use stress::*;

use tracing_subscriber::EnvFilter;

/// Install a `RUST_LOG`-driven subscriber for tests. Safe to call repeatedly.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
