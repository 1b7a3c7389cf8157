//! Load test parameters and their bounds.

use servcheck_config::{LoadConfig, MAX_CONCURRENCY};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// Repetitions used when the requested count is out of range.
pub const FALLBACK_REPETITIONS: u32 = 100;

/// Exclusive upper bound on accepted repetitions.
pub const REPETITIONS_LIMIT: u32 = 10_000;

#[derive(Debug, Clone, PartialEq)]
pub struct LoadTestParams {
    pub client: PathBuf,
    pub target_url: String,
    pub concurrency: u32,
    pub repetitions: u32,
    /// Minimum availability percentage for a pass
    pub threshold: f64,
    pub env: HashMap<String, String>,
}

impl LoadTestParams {
    pub fn from_config(config: &LoadConfig) -> Self {
        Self {
            client: config.client.clone(),
            target_url: config.target_url.clone(),
            concurrency: config.concurrency,
            repetitions: config.repetitions,
            threshold: config.threshold,
            env: config.environment.clone(),
        }
    }

    /// Bring concurrency and repetitions into their accepted ranges.
    pub fn clamped(mut self) -> Self {
        self.repetitions = clamp_repetitions(i64::from(self.repetitions));
        let concurrency = self.concurrency.clamp(1, MAX_CONCURRENCY);
        if concurrency != self.concurrency {
            warn!(
                "Concurrency {} out of range, using {}",
                self.concurrency, concurrency
            );
            self.concurrency = concurrency;
        }
        self
    }

    /// Arguments for the measured benchmark invocation.
    pub fn benchmark_args(&self) -> Vec<String> {
        vec![
            self.target_url.clone(),
            "--concurrent".to_string(),
            self.concurrency.to_string(),
            "--reps".to_string(),
            self.repetitions.to_string(),
            "--benchmark".to_string(),
            "--quiet".to_string(),
            "--json-output".to_string(),
        ]
    }
}

/// Requested repetitions outside `1..10000` fall back to 100.
pub fn clamp_repetitions(requested: i64) -> u32 {
    if requested <= 0 || requested >= i64::from(REPETITIONS_LIMIT) {
        warn!(
            "Repetitions {} out of range, using {}",
            requested, FALLBACK_REPETITIONS
        );
        FALLBACK_REPETITIONS
    } else {
        requested as u32
    }
}
