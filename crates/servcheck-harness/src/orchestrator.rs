//! Sequential, cancellable run loop.
//!
//! Units of work (one validation case, one suite, one load test) run one at a
//! time. Each unit races the cancellation token; when the token fires the
//! in-flight unit is dropped, which tears its server down, a `Cancelled`
//! failure is recorded and no further units start.

use crate::config_check::{check_invalid_config, invalid_config_files, CHECK_CONFIGS_SOURCE};
use crate::load::{run_load, LoadOverrides};
use crate::suites::{select_suites, SUITES_SOURCE};
use servcheck_common::{Failure, FailureKind, RunSummary, SuiteName};
use servcheck_config::HarnessConfig;
use servcheck_process::ServerLauncher;
use servcheck_scenario::SuiteRunner;
use std::future::Future;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Which suites to run and from where.
#[derive(Debug, Clone, PartialEq)]
pub struct SuitePlan {
    pub path: PathBuf,
    /// Empty means every suite found under `path`
    pub names: Vec<SuiteName>,
}

/// What a single invocation runs, in this order: config validation, suites,
/// load test.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunPlan {
    pub check_configs: Option<PathBuf>,
    pub suites: Option<SuitePlan>,
    pub load: Option<LoadOverrides>,
}

impl RunPlan {
    /// Every driver with the configured locations.
    pub fn all(config: &HarnessConfig) -> Self {
        Self {
            check_configs: Some(config.invalid_configs_dir.clone()),
            suites: Some(SuitePlan {
                path: config.suites_dir.clone(),
                names: Vec::new(),
            }),
            load: Some(LoadOverrides::default()),
        }
    }
}

/// Owns the harness configuration and runs plans against it.
#[derive(Debug, Clone)]
pub struct Harness {
    config: HarnessConfig,
    launcher: ServerLauncher,
}

impl Harness {
    pub fn new(config: HarnessConfig) -> Self {
        let launcher = ServerLauncher::from_config(&config.server);
        Self { config, launcher }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Execute `plan`, stopping early if `cancel` fires.
    pub async fn run(&self, plan: &RunPlan, cancel: &CancellationToken) -> RunSummary {
        let mut summary = RunSummary::new();

        if let Some(dir) = &plan.check_configs {
            info!("Checking invalid configurations in {}", dir.display());
            match invalid_config_files(dir) {
                Ok(files) => {
                    for file in &files {
                        let case = file.display().to_string();
                        let unit =
                            check_invalid_config(&self.launcher, file, &self.config.validation);
                        if !run_unit(cancel, &mut summary, CHECK_CONFIGS_SOURCE, &case, unit).await {
                            return summary;
                        }
                    }
                }
                Err(e) => summary.record_failure(Failure::new(
                    CHECK_CONFIGS_SOURCE,
                    dir.display().to_string(),
                    FailureKind::ProcessStart,
                    "readable invalid-config directory",
                    e.to_string(),
                )),
            }
        }

        if let Some(suite_plan) = &plan.suites {
            let (suites, load_summary) = select_suites(&suite_plan.path, &suite_plan.names);
            summary.merge(load_summary);

            let runner = SuiteRunner::from_config(&self.config);
            for suite in &suites {
                let unit = runner.run_suite(suite);
                if !run_unit(cancel, &mut summary, SUITES_SOURCE, suite.name.as_str(), unit).await {
                    return summary;
                }
            }
        }

        if let Some(overrides) = &plan.load {
            info!("Running load test");
            let unit = run_load(&self.launcher, &self.config.load, overrides);
            let case = overrides
                .target_url
                .clone()
                .unwrap_or_else(|| self.config.load.target_url.clone());
            run_unit(cancel, &mut summary, "load", &case, unit).await;
        }

        summary
    }
}

/// Race one unit against the token. Returns `false` when the run was
/// cancelled and must stop.
async fn run_unit<F>(
    cancel: &CancellationToken,
    summary: &mut RunSummary,
    source: &str,
    case: &str,
    unit: F,
) -> bool
where
    F: Future<Output = RunSummary>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("Run cancelled during {} :: {}", source, case);
            summary.record_failure(Failure::new(
                source,
                case,
                FailureKind::Cancelled,
                "unit of work to finish",
                "interrupted",
            ));
            false
        }
        unit_summary = unit => {
            summary.merge(unit_summary);
            true
        }
    }
}
