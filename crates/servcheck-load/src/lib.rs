//! # servcheck load
//!
//! Load generation through an external benchmark client and a binary
//! availability gate.
//!
//! - `params`: target, concurrency and repetition bounds
//! - `report`: the client's JSON report
//! - `gate`: threshold policy and the [`LoadVerdict`] classes
//! - `runner`: warm-up and benchmark invocations
//!
//! [`run_load_test`] keeps a supervised server alive for the duration of the
//! benchmark.

pub mod gate;
pub mod params;
pub mod report;
pub mod runner;

pub use gate::LoadVerdict;
pub use params::{clamp_repetitions, LoadTestParams};
pub use report::SiegeReport;
pub use runner::LoadRunner;

use servcheck_common::ProcessResult;
use servcheck_process::{probe_address, with_server, ServerLauncher};
use std::path::Path;
use tracing::info;

/// Start the server (with `server_config`, or its built-in default when
/// `None`), run the benchmark against it and stop the server.
pub async fn run_load_test(
    launcher: &ServerLauncher,
    server_config: Option<&Path>,
    params: LoadTestParams,
) -> ProcessResult<LoadVerdict> {
    let runner = LoadRunner::new(params);
    let probe = probe_address(&runner.params().target_url);

    with_server(launcher, server_config, probe.as_deref(), |server| {
        let runner = &runner;
        async move {
            info!("Load test against {} (PID: {})", server.id, server.pid);
            runner.run().await
        }
    })
    .await
}
