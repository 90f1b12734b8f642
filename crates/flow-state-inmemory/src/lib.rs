//! In-memory persistent store for Flow programs
//!
//! This crate provides an in-memory implementation of the `PersistentStore`
//! collaborator defined in flow-core. It is primarily useful for development,
//! testing, and hosts that have no platform key-value store.

pub mod store;
pub use store::InMemoryPersistentStore;
