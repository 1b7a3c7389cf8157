//! # servcheck common
//!
//! Error types, identifiers and run outcomes shared by every servcheck crate.
//!
//! The drivers (scenario suites, load gate, config validation) never print
//! or exit on their own: they return [`Failure`] records that the
//! orchestrator folds into a [`RunSummary`], which decides the exit status.

pub mod errors;
pub mod outcome;
pub mod types;

// Re-export commonly used items
pub use errors::{Error, ProcessError, ProcessResult, Result, ResultExt};
pub use outcome::{Failure, FailureKind, RunSummary};
pub use types::SuiteName;
