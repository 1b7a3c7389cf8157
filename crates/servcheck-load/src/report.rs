//! Benchmark client report.

use serde::{Deserialize, Serialize};

/// JSON report printed by the benchmark client with `--json-output`.
///
/// Only `availability` is required; the gate does not look at anything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiegeReport {
    /// Percentage of requests that received a valid response
    pub availability: f64,
    #[serde(default)]
    pub transactions: Option<u64>,
    #[serde(default)]
    pub elapsed_time: Option<f64>,
    #[serde(default)]
    pub data_transferred: Option<f64>,
    #[serde(default)]
    pub response_time: Option<f64>,
    #[serde(default)]
    pub transaction_rate: Option<f64>,
    #[serde(default)]
    pub throughput: Option<f64>,
    #[serde(default)]
    pub concurrency: Option<f64>,
    #[serde(default)]
    pub successful_transactions: Option<u64>,
    #[serde(default)]
    pub failed_transactions: Option<u64>,
    #[serde(default)]
    pub longest_transaction: Option<f64>,
    #[serde(default)]
    pub shortest_transaction: Option<f64>,
}

impl SiegeReport {
    /// Parse client stdout. Text around the JSON object is tolerated.
    pub fn parse(output: &str) -> Result<Self, String> {
        let trimmed = output.trim();
        if trimmed.is_empty() {
            return Err("benchmark client produced no output".to_string());
        }

        match serde_json::from_str::<SiegeReport>(trimmed) {
            Ok(report) => Ok(report),
            Err(first) => {
                let object = trimmed
                    .find('{')
                    .zip(trimmed.rfind('}'))
                    .filter(|(start, end)| start < end)
                    .map(|(start, end)| &trimmed[start..=end]);
                match object {
                    Some(json) if json.len() != trimmed.len() => {
                        serde_json::from_str(json).map_err(|e| e.to_string())
                    }
                    _ => Err(first.to_string()),
                }
            }
        }
    }

    /// One-line summary for logs.
    pub fn summary_line(&self) -> String {
        let mut line = format!("availability {:.2}%", self.availability);
        if let Some(transactions) = self.transactions {
            line.push_str(&format!(", {} transactions", transactions));
        }
        if let Some(failed) = self.failed_transactions {
            line.push_str(&format!(", {} failed", failed));
        }
        if let Some(rate) = self.transaction_rate {
            line.push_str(&format!(", {:.2} trans/sec", rate));
        }
        line
    }
}
