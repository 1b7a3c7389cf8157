//! Check outcomes and the aggregate run summary.
//!
//! Each driver reports independent pass/fail records; nothing is swallowed.
//! The summary is printed once at the end of a batch and maps to the
//! process exit status.

use crate::errors::ProcessError;
use serde::Serialize;
use std::fmt;

/// Classification of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Server binary missing or could not be spawned.
    ProcessStart,
    /// Server never accepted a connection, or exited before it did.
    Readiness,
    /// Benchmark client exited non-zero or its report was unparsable.
    BenchmarkTool,
    /// Report parsed, but availability was below the threshold.
    Availability,
    /// Scenario status/header/body mismatch, or the request failed.
    Assertion,
    /// Config validation case did not exit with the expected status.
    UnexpectedExit,
    /// The run was interrupted before the unit of work finished.
    Cancelled,
}

impl FailureKind {
    /// Classify a supervision error raised while a check was running.
    pub fn from_process_error(err: &ProcessError) -> Self {
        match err {
            ProcessError::SpawnFailed { .. }
            | ProcessError::Configuration { .. }
            | ProcessError::LoggingError { .. } => FailureKind::ProcessStart,
            ProcessError::NotReady { .. } | ProcessError::ExitedEarly { .. } => {
                FailureKind::Readiness
            }
            ProcessError::TaskPanic { .. } => FailureKind::Assertion,
            ProcessError::ExitedDuringRun { .. }
            | ProcessError::StopFailed { .. }
            | ProcessError::Timeout { .. }
            | ProcessError::Signal { .. } => FailureKind::UnexpectedExit,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::ProcessStart => "process-start",
            FailureKind::Readiness => "readiness",
            FailureKind::BenchmarkTool => "benchmark-tool",
            FailureKind::Availability => "availability",
            FailureKind::Assertion => "assertion",
            FailureKind::UnexpectedExit => "unexpected-exit",
            FailureKind::Cancelled => "cancelled",
        };
        write!(f, "{}", label)
    }
}

/// One failed check with enough context to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    /// Config artifact, suite file or tool the failure belongs to.
    pub source: String,
    /// Scenario name or validation case.
    pub case: String,
    pub kind: FailureKind,
    pub expected: String,
    pub actual: String,
}

impl Failure {
    pub fn new(
        source: impl Into<String>,
        case: impl Into<String>,
        kind: FailureKind,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            case: case.into(),
            kind,
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Failure for a check that could not run because supervision failed.
    pub fn from_process_error(
        source: impl Into<String>,
        case: impl Into<String>,
        err: &ProcessError,
    ) -> Self {
        let kind = FailureKind::from_process_error(err);
        let expected = match kind {
            _ if matches!(err, ProcessError::ExitedDuringRun { .. }) => {
                "server to keep running until stopped"
            }
            FailureKind::ProcessStart => "server process to start",
            FailureKind::Readiness => "server to accept connections",
            FailureKind::Assertion => "checks to complete",
            _ => "clean server lifecycle",
        };
        Self::new(source, case, kind, expected, err.to_string())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} :: {} - expected {}, got {}",
            self.kind, self.source, self.case, self.expected, self.actual
        )
    }
}

/// Aggregate of every check executed in a batch.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    passed: usize,
    failures: Vec<Failure>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pass(&mut self) {
        self.passed += 1;
    }

    pub fn record_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    /// Folds another summary into this one.
    pub fn merge(&mut self, other: RunSummary) {
        self.passed += other.passed;
        self.failures.extend(other.failures);
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn total(&self) -> usize {
        self.passed + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn has_kind(&self, kind: FailureKind) -> bool {
        self.failures.iter().any(|f| f.kind == kind)
    }

    /// `0` when every check passed, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    /// One-line aggregate printed at the end of a batch.
    pub fn headline(&self) -> String {
        if self.is_success() {
            format!("All checks passed ({} total)", self.total())
        } else {
            format!("{} of {} checks failed", self.failed(), self.total())
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in &self.failures {
            writeln!(f, "{}", failure)?;
        }
        write!(f, "{}", self.headline())
    }
}
