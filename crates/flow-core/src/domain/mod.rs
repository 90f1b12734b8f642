/// Flow programs and operations
pub mod program;

/// Shared state container
pub mod shared_state;

/// Control handles for forked programs
pub mod control;
