//! agent-smith: relay AI coding agent events to a Matrix room
//!
//! Besides sending messages, the crate can register its own hook commands in
//! an agent runtime's settings file (see [`install`]).

pub mod agents;
pub mod config;
pub mod error;
pub mod install;
pub mod matrix;
