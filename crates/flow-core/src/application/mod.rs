/// Host-supplied runtime collaborators
pub mod collaborators;

/// Single-operation dispatcher
pub mod dispatcher;

/// Program runner (fork/race/recover orchestration)
pub mod runner;
