//! Custom assertions for E2E tests

use servcheck_common::{FailureKind, RunSummary};
use std::path::Path;
use std::time::{Duration, Instant};

/// Assert the whole run passed with exactly `total` checks
pub fn assert_all_passed(summary: &RunSummary, total: usize) -> Result<(), String> {
    if summary.is_success() && summary.total() == total {
        Ok(())
    } else {
        Err(format!(
            "Expected {} passing checks, got:\n{}",
            total, summary
        ))
    }
}

/// Assert there is a failure of `kind` whose case contains `case`
pub fn assert_failed_with(
    summary: &RunSummary,
    kind: FailureKind,
    case: &str,
) -> Result<(), String> {
    let found = summary
        .failures()
        .iter()
        .any(|f| f.kind == kind && f.case.contains(case));

    if found {
        Ok(())
    } else {
        Err(format!(
            "Expected a {} failure for '{}', got:\n{}",
            kind, case, summary
        ))
    }
}

/// Assert the summary's counts
pub fn assert_counts(summary: &RunSummary, passed: usize, failed: usize) -> Result<(), String> {
    if summary.passed() == passed && summary.failed() == failed {
        Ok(())
    } else {
        Err(format!(
            "Expected {} passed / {} failed, got {} / {}:\n{}",
            passed,
            failed,
            summary.passed(),
            summary.failed(),
            summary
        ))
    }
}

/// Assert nothing listens on `port` any more, allowing a short grace period
pub fn assert_port_released(port: u16, within: Duration) -> Result<(), String> {
    let start = Instant::now();
    loop {
        let refused = std::net::TcpStream::connect_timeout(
            &([127, 0, 0, 1], port).into(),
            Duration::from_millis(100),
        )
        .is_err();
        if refused {
            return Ok(());
        }
        if start.elapsed() >= within {
            return Err(format!("Port {} still accepting connections", port));
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

/// Assert that a log file contains a pattern
pub fn assert_log_file_contains(file_path: &Path, pattern: &str) -> Result<(), String> {
    let content = std::fs::read_to_string(file_path)
        .map_err(|e| format!("Failed to read log file {}: {}", file_path.display(), e))?;

    if content.contains(pattern) {
        Ok(())
    } else {
        Err(format!(
            "Log file {} does not contain '{}'. Content:\n{}",
            file_path.display(),
            pattern,
            content
        ))
    }
}

/// Count occurrences of a pattern in a log file
pub fn count_in_log_file(file_path: &Path, pattern: &str) -> usize {
    std::fs::read_to_string(file_path)
        .map(|c| c.matches(pattern).count())
        .unwrap_or(0)
}
