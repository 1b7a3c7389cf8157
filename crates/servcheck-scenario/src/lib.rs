//! # servcheck scenario
//!
//! Declarative HTTP scenario suites.
//!
//! A suite binds one configuration artifact to an ordered list of scenarios.
//! [`SuiteRunner::run_suite`] starts a server for the suite, runs every
//! scenario against it in order and always stops the server afterwards.
//!
//! - `model`: suite/scenario definitions (YAML)
//! - `loader`: suite discovery, duplicate handling, validation
//! - `context`: per-suite variables and `${var}` interpolation
//! - `fixtures`: request payloads and HTML oracles
//! - `client`: HTTP transport (redirects not followed by default)
//! - `assertions`: status/header/body checks
//! - `runner`: suite and scenario execution

pub mod assertions;
pub mod client;
pub mod context;
pub mod fixtures;
pub mod loader;
pub mod model;
pub mod runner;

pub use assertions::{evaluate, Mismatch};
pub use client::{HttpClient, HttpResponse, PreparedBody};
pub use context::SuiteContext;
pub use loader::{load_suite_file, load_suites, parse_suite};
pub use model::{BodyExpectation, BodySource, Capture, Expectation, RequestSpec, Scenario, Suite};
pub use runner::{run_scenarios, SuiteRunner, SERVER_CASE, STARTUP_CASE};
