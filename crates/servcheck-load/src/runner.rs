//! Benchmark client invocation.

use crate::gate::LoadVerdict;
use crate::params::LoadTestParams;
use crate::report::SiegeReport;
use servcheck_process::validate_executable;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Stderr kept in a tool-failure reason.
const STDERR_TAIL: usize = 300;

/// Drives the benchmark client: a warm-up invocation with no arguments, then
/// the measured run.
#[derive(Debug, Clone)]
pub struct LoadRunner {
    params: LoadTestParams,
}

impl LoadRunner {
    /// Parameters are clamped on construction.
    pub fn new(params: LoadTestParams) -> Self {
        Self {
            params: params.clamped(),
        }
    }

    pub fn params(&self) -> &LoadTestParams {
        &self.params
    }

    /// Run warm-up and benchmark, then apply the availability threshold.
    ///
    /// Both child processes are killed if this future is dropped.
    pub async fn run(&self) -> LoadVerdict {
        if let Err(e) = validate_executable(&self.params.client) {
            return LoadVerdict::ToolFailure {
                reason: e.to_string(),
            };
        }

        if let Err(reason) = self.warm_up().await {
            return LoadVerdict::ToolFailure { reason };
        }

        info!(
            "Benchmarking {} ({} concurrent, {} reps)",
            self.params.target_url, self.params.concurrency, self.params.repetitions
        );
        let output = match self
            .command()
            .args(self.params.benchmark_args())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return LoadVerdict::ToolFailure {
                    reason: format!("failed to run {}: {}", self.params.client.display(), e),
                }
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return LoadVerdict::ToolFailure {
                reason: format!(
                    "benchmark exited with {}{}",
                    describe(&output.status),
                    stderr_tail(&stderr)
                ),
            };
        }

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!("Benchmark output: {}", stdout.trim());
        let verdict = match SiegeReport::parse(&stdout) {
            Ok(report) => LoadVerdict::judge(report, self.params.threshold),
            Err(reason) => LoadVerdict::ReportUnparsable {
                reason,
                raw: stdout,
            },
        };

        if verdict.is_pass() {
            info!("{}", verdict);
        } else {
            warn!("{}", verdict);
        }
        verdict
    }

    /// First invocation materializes the client's default configuration.
    async fn warm_up(&self) -> Result<(), String> {
        debug!("Warm-up run of {}", self.params.client.display());
        let status = self
            .command()
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| format!("failed to run {}: {}", self.params.client.display(), e))?;

        if status.success() {
            Ok(())
        } else {
            Err(format!("warm-up exited with {}", describe(&status)))
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.params.client);
        cmd.envs(&self.params.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }
}

fn describe(status: &ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit code {}", code),
        None => "termination by signal".to_string(),
    }
}

fn stderr_tail(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        return String::new();
    }
    let start = stderr
        .char_indices()
        .rev()
        .nth(STDERR_TAIL)
        .map(|(idx, _)| idx)
        .unwrap_or(0);
    format!(": {}", &stderr[start..])
}
