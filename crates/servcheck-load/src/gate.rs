//! Availability gate.

use crate::report::SiegeReport;
use servcheck_common::{Failure, FailureKind, RunSummary};
use std::fmt;

/// Raw output longer than this is truncated in failure messages.
const RAW_PREVIEW_LIMIT: usize = 200;

/// Outcome of one load run. Tool and parse failures are kept apart from a
/// measured availability shortfall.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadVerdict {
    Pass { report: SiegeReport },
    BelowThreshold { availability: f64, threshold: f64 },
    ToolFailure { reason: String },
    ReportUnparsable { reason: String, raw: String },
}

impl LoadVerdict {
    /// Apply the threshold to a parsed report.
    pub fn judge(report: SiegeReport, threshold: f64) -> Self {
        if report.availability >= threshold {
            LoadVerdict::Pass { report }
        } else {
            LoadVerdict::BelowThreshold {
                availability: report.availability,
                threshold,
            }
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, LoadVerdict::Pass { .. })
    }

    /// Convert into a failure record; `None` for a pass.
    pub fn to_failure(&self, source: &str, case: &str) -> Option<Failure> {
        let (kind, expected, actual) = match self {
            LoadVerdict::Pass { .. } => return None,
            LoadVerdict::BelowThreshold {
                availability,
                threshold,
            } => (
                FailureKind::Availability,
                format!("availability >= {:.2}", threshold),
                format!("{:.2}", availability),
            ),
            LoadVerdict::ToolFailure { reason } => (
                FailureKind::BenchmarkTool,
                "benchmark client to succeed".to_string(),
                reason.clone(),
            ),
            LoadVerdict::ReportUnparsable { reason, raw } => (
                FailureKind::BenchmarkTool,
                "JSON report with availability".to_string(),
                format!("{} (output: {})", reason, truncate(raw)),
            ),
        };
        Some(Failure::new(source, case, kind, expected, actual))
    }

    /// Single-check summary for this verdict.
    pub fn into_summary(self, source: &str, case: &str) -> RunSummary {
        let mut summary = RunSummary::new();
        match self.to_failure(source, case) {
            Some(failure) => summary.record_failure(failure),
            None => summary.record_pass(),
        }
        summary
    }
}

impl fmt::Display for LoadVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadVerdict::Pass { report } => write!(f, "availability ok ({})", report.summary_line()),
            LoadVerdict::BelowThreshold {
                availability,
                threshold,
            } => write!(
                f,
                "availability too low: {:.2} < {:.2}",
                availability, threshold
            ),
            LoadVerdict::ToolFailure { reason } => write!(f, "benchmark client failed: {}", reason),
            LoadVerdict::ReportUnparsable { reason, .. } => {
                write!(f, "error while parsing benchmark output: {}", reason)
            }
        }
    }
}

fn truncate(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return "<empty>".to_string();
    }
    match raw.char_indices().nth(RAW_PREVIEW_LIMIT) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    }
}
