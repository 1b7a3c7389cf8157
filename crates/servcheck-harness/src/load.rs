//! Load test driver.

use servcheck_common::{Failure, RunSummary};
use servcheck_config::LoadConfig;
use servcheck_load::{clamp_repetitions, run_load_test, LoadTestParams};
use servcheck_process::ServerLauncher;
use std::path::PathBuf;
use tracing::warn;

/// Command-line overrides for the configured load test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadOverrides {
    /// Requested repetitions; out-of-range values fall back to the default
    pub repetitions: Option<i64>,
    pub client: Option<PathBuf>,
    pub target_url: Option<String>,
}

/// Merge overrides into the configured parameters and clamp them.
pub fn load_params(config: &LoadConfig, overrides: &LoadOverrides) -> LoadTestParams {
    let mut params = LoadTestParams::from_config(config);
    if let Some(reps) = overrides.repetitions {
        params.repetitions = clamp_repetitions(reps);
    }
    if let Some(client) = &overrides.client {
        params.client = client.clone();
    }
    if let Some(url) = &overrides.target_url {
        params.target_url = url.clone();
    }
    params.clamped()
}

/// Run the load test with a supervised server and fold the verdict into a
/// single-check summary.
pub async fn run_load(
    launcher: &ServerLauncher,
    config: &LoadConfig,
    overrides: &LoadOverrides,
) -> RunSummary {
    let params = load_params(config, overrides);
    let source = params.client.display().to_string();
    let case = params.target_url.clone();

    match run_load_test(launcher, config.server_config.as_deref(), params).await {
        Ok(verdict) => verdict.into_summary(&source, &case),
        Err(e) => {
            warn!("Load test aborted: {}", e);
            let mut summary = RunSummary::new();
            summary.record_failure(Failure::from_process_error(source, case, &e));
            summary
        }
    }
}
