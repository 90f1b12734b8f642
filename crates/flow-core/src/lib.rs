//!
//! Flow Core - Interpreter and scheduler for Flow programs
//!
//! Flow programs are sequential scripts of typed operations (UI prompts,
//! API calls, permission requests, key-value storage) whose effects are
//! delegated to host-supplied collaborators. This crate defines the program
//! model, the shared state container, and the runner that executes programs
//! with lightweight concurrency (fork, race, await, delay) and a single
//! error-recovery boundary.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - program model, shared state and control handles
pub mod domain;

/// Application services - collaborators, dispatcher and runner
pub mod application;

/// Core value types
pub mod types;

/// Error types
pub mod error;

/// Runner configuration
pub mod config;

/// Tracing setup
pub mod telemetry;

// Re-export key types
pub use error::{CollaboratorKind, FlowError};
pub use types::{
    ApiRequest, ApiResponse, ErrorResponse, ForeignState, Headers, HttpMethod, Outcome,
    Permission, PermissionResponse, PermissionStatus, RestEndpoint, RunId, Store,
};

pub use domain::control::Control;
pub use domain::program::{Flow, Operation};
pub use domain::shared_state::{SharedState, StateMaps};

pub use application::collaborators::{
    ApiRunner, Collaborators, CollaboratorsBuilder, PermissionProvider, PersistentStore,
    UiRunner, Unconfigured,
};
pub use application::runner::Runner;

pub use config::RunnerConfig;
pub use telemetry::init_tracing;
