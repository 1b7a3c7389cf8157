//! Config validation driver: every artifact in the invalid-config set must
//! make the server exit with the expected status without ever serving.

use servcheck_common::{Failure, FailureKind, ProcessError, RunSummary};
use servcheck_config::ValidationConfig;
use servcheck_process::ServerLauncher;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const CHECK_CONFIGS_SOURCE: &str = "check-configs";

/// List the invalid-config artifacts in file-name order.
pub fn invalid_config_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}

/// Run one invalid artifact and record whether it was rejected.
pub async fn check_invalid_config(
    launcher: &ServerLauncher,
    file: &Path,
    validation: &ValidationConfig,
) -> RunSummary {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    println!("Testing: {}", name);

    let mut summary = RunSummary::new();
    let expected = validation.expected_exit_code;

    match launcher.run_to_exit(file, validation.exit_timeout).await {
        Ok(Some(code)) if code == expected => {
            info!("{} rejected with exit code {}", name, code);
            summary.record_pass();
        }
        Ok(code) => {
            let actual = match code {
                Some(code) => format!("exit code {}", code),
                None => "termination by signal".to_string(),
            };
            error!("Error: {} should have failed ({})", name, actual);
            summary.record_failure(Failure::new(
                file.display().to_string(),
                name,
                FailureKind::UnexpectedExit,
                format!("exit code {}", expected),
                actual,
            ));
        }
        Err(ProcessError::Timeout { .. }) => {
            error!("Error: {} should have failed (still running after {:?})", name, validation.exit_timeout);
            summary.record_failure(Failure::new(
                file.display().to_string(),
                name,
                FailureKind::UnexpectedExit,
                format!("exit code {}", expected),
                format!("still running after {:?}", validation.exit_timeout),
            ));
        }
        Err(e) => {
            error!("Error: {} could not be checked: {}", name, e);
            summary.record_failure(Failure::from_process_error(file.display().to_string(), name, &e));
        }
    }

    summary
}

/// Check every artifact in `dir`. An unreadable directory is itself a failure.
pub async fn check_invalid_configs(
    launcher: &ServerLauncher,
    dir: &Path,
    validation: &ValidationConfig,
) -> RunSummary {
    let files = match invalid_config_files(dir) {
        Ok(files) => files,
        Err(e) => {
            let mut summary = RunSummary::new();
            summary.record_failure(Failure::new(
                CHECK_CONFIGS_SOURCE,
                dir.display().to_string(),
                FailureKind::ProcessStart,
                "readable invalid-config directory",
                e.to_string(),
            ));
            return summary;
        }
    };

    let mut summary = RunSummary::new();
    for file in &files {
        summary.merge(check_invalid_config(launcher, file, validation).await);
    }
    summary
}
