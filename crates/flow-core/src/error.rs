use std::fmt;
use thiserror::Error;

/// Runtime collaborator that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollaboratorKind {
    /// UI execution provider
    Ui,
    /// API execution provider
    Api,
    /// Permission check/request provider
    Permissions,
    /// Persistent key-value storage provider
    Storage,
    /// An external asynchronous action run through `RunExternalAsync`
    External,
}

impl fmt::Display for CollaboratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CollaboratorKind::Ui => "ui",
            CollaboratorKind::Api => "api",
            CollaboratorKind::Permissions => "permissions",
            CollaboratorKind::Storage => "storage",
            CollaboratorKind::External => "external",
        };
        f.write_str(name)
    }
}

/// Core error type for Flow runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A UI response (or typed result) could not be decoded
    #[error("Decode error: {reason} (payload: {payload})")]
    Decode {
        /// The malformed payload as received
        payload: String,
        /// Parser diagnostic
        reason: String,
    },

    /// A host-supplied collaborator failed
    #[error("Collaborator failure ({collaborator}): {message}")]
    Collaborator {
        /// Which collaborator failed
        collaborator: CollaboratorKind,
        /// Failure description
        message: String,
    },

    /// A `Fail` outcome surfaced through a Recover boundary
    #[error("{0}")]
    Explicit(String),

    /// An interaction could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A forked task ended without populating its control handle
    #[error("Forked task abandoned: {0}")]
    ForkAbandoned(String),

    /// A spawned task panicked or was aborted by the scheduler
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// Race was started without any branch
    #[error("Race has no branches")]
    EmptyRace,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A continuation received a result of a different type than it expects
    #[error("Operation result type mismatch: expected {0}")]
    TypeMismatch(String),
}

impl FlowError {
    /// Build a decode error for the given payload
    pub fn decode(payload: impl Into<String>, reason: impl fmt::Display) -> Self {
        FlowError::Decode {
            payload: payload.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a collaborator failure
    pub fn collaborator(collaborator: CollaboratorKind, message: impl Into<String>) -> Self {
        FlowError::Collaborator {
            collaborator,
            message: message.into(),
        }
    }

    /// Whether this failure came from an explicit `Fail` outcome
    pub fn is_explicit(&self) -> bool {
        matches!(self, FlowError::Explicit(_))
    }
}

impl From<serde_json::Error> for FlowError {
    fn from(err: serde_json::Error) -> Self {
        FlowError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for FlowError {
    fn from(err: serde_yaml::Error) -> Self {
        FlowError::Configuration(err.to_string())
    }
}

impl From<anyhow::Error> for FlowError {
    fn from(err: anyhow::Error) -> Self {
        FlowError::collaborator(CollaboratorKind::External, format!("{:#}", err))
    }
}
