//! Scenario suite driver.

use servcheck_common::{Failure, FailureKind, RunSummary, SuiteName};
use servcheck_scenario::{load_suites, Suite};
use std::path::Path;
use tracing::warn;

pub const SUITES_SOURCE: &str = "suites";

/// Load suites from `path` and keep only the selected names (all when
/// `selected` is empty). Unknown names and load errors become failures.
pub fn select_suites(path: &Path, selected: &[SuiteName]) -> (Vec<Suite>, RunSummary) {
    let mut summary = RunSummary::new();

    let suites = match load_suites(path) {
        Ok(suites) => suites,
        Err(e) => {
            summary.record_failure(Failure::new(
                SUITES_SOURCE,
                path.display().to_string(),
                FailureKind::Assertion,
                "loadable suite definitions",
                e.to_string(),
            ));
            return (Vec::new(), summary);
        }
    };

    if selected.is_empty() {
        return (suites, summary);
    }

    for name in selected {
        if !suites.iter().any(|s| &s.name == name) {
            warn!("Suite '{}' not found in {}", name, path.display());
            summary.record_failure(Failure::new(
                SUITES_SOURCE,
                name.as_str(),
                FailureKind::Assertion,
                "a suite with this name",
                "not found",
            ));
        }
    }

    let suites = suites
        .into_iter()
        .filter(|s| selected.contains(&s.name))
        .collect();
    (suites, summary)
}
