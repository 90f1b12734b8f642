//! `mockall` mocks of the runtime collaborator traits.
//!
//! Use these when a test needs to assert on exact calls; the fakes in
//! [`crate::implementations`] are simpler for scripted behaviour.

pub mod collaborators;

pub use collaborators::*;
