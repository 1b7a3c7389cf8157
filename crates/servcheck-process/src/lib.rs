//! # servcheck process
//!
//! Supervision of the server under test.
//!
//! This crate provides:
//! - Process existence checks and signal delivery (`check`, `terminate`)
//! - Append-mode capture of server output (`log`)
//! - Readiness policies: fixed settle delay or connect-polling (`readiness`)
//! - [`ServerLauncher`] / [`ServerProcess`] with guaranteed teardown, and the
//!   scoped [`with_server`] helper (`supervisor`)

pub mod check;
pub mod log;
pub mod readiness;
pub mod supervisor;
pub mod terminate;
pub mod validation;

// Re-export main types
pub use check::process_exists;
pub use log::LogHandle;
pub use readiness::{probe_address, wait_until_ready, ReadinessPolicy};
pub use supervisor::{with_server, ServerInfo, ServerLauncher, ServerProcess};
pub use terminate::{force_kill, terminate_gracefully};
pub use validation::validate_executable;
