//! # servcheck harness
//!
//! Drivers and orchestration.
//!
//! - `config_check`: invalid-config set must be rejected with exit code 1
//! - `suites`: suite selection for the scenario runner
//! - `load`: load test with CLI overrides
//! - `orchestrator`: sequential run loop observing a cancellation token
//! - `signals`: SIGINT/SIGTERM to cancellation

pub mod config_check;
pub mod load;
pub mod orchestrator;
pub mod signals;
pub mod suites;

pub use config_check::check_invalid_configs;
pub use load::{run_load, LoadOverrides};
pub use orchestrator::{Harness, RunPlan, SuitePlan};
pub use signals::{cancel_on_signal, shutdown_signal};
pub use suites::select_suites;
