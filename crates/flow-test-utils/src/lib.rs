//! Testing utilities for the Flow runtime.
//!
//! This crate provides fakes for every runtime collaborator, `mockall` mocks
//! of the collaborator traits, a harness that wires fakes into a runner, and a
//! tracing initializer for tests.

pub mod harness;
pub mod implementations;
pub mod mocks;
pub mod util;

/// Re-export commonly used types for convenience
pub use mockall;

pub use harness::TestHarness;
pub use implementations::{RecordingApi, ScriptedUi, StaticPermissions};
pub use util::init_test_tracing;
