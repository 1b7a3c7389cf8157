use super::*;
use anyhow::{anyhow, Result};

/// Validate the complete configuration
pub fn validate_config(config: &HarnessConfig) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_validation_config(&config.validation)?;
    validate_load_config(&config.load)?;

    if config.http.timeout.is_zero() {
        return Err(anyhow!("HTTP request timeout must be greater than 0"));
    }

    Ok(())
}

/// Validate server launch settings
fn validate_server_config(server: &ServerConfig) -> Result<()> {
    if server.binary.as_os_str().is_empty() {
        return Err(anyhow!("Server binary path cannot be empty"));
    }

    if server.log_file.as_os_str().is_empty() {
        return Err(anyhow!("Server log file path cannot be empty"));
    }

    if server.graceful_timeout.is_zero() {
        return Err(anyhow!("Graceful stop timeout must be greater than 0"));
    }

    validate_readiness_config(&server.readiness)
}

fn validate_readiness_config(readiness: &ReadinessConfig) -> Result<()> {
    match readiness.mode {
        ReadinessMode::Settle => {
            if readiness.settle_delay < MIN_SETTLE_DELAY {
                return Err(anyhow!(
                    "Settle delay must be at least {:?}, got: {:?}",
                    MIN_SETTLE_DELAY,
                    readiness.settle_delay
                ));
            }
        }
        ReadinessMode::Poll => {
            if readiness.timeout.is_zero() {
                return Err(anyhow!("Readiness timeout must be greater than 0"));
            }
            if readiness.initial_backoff.is_zero() {
                return Err(anyhow!("Readiness initial backoff must be greater than 0"));
            }
            if readiness.max_backoff < readiness.initial_backoff {
                return Err(anyhow!(
                    "Readiness max backoff ({:?}) must not be below initial backoff ({:?})",
                    readiness.max_backoff,
                    readiness.initial_backoff
                ));
            }
        }
    }

    Ok(())
}

fn validate_validation_config(validation: &ValidationConfig) -> Result<()> {
    if validation.exit_timeout.is_zero() {
        return Err(anyhow!("Config validation exit timeout must be greater than 0"));
    }
    Ok(())
}

/// Validate benchmark settings
fn validate_load_config(load: &LoadConfig) -> Result<()> {
    if load.client.as_os_str().is_empty() {
        return Err(anyhow!("Benchmark client path cannot be empty"));
    }

    if !(load.target_url.starts_with("http://") || load.target_url.starts_with("https://")) {
        return Err(anyhow!("Load target must be an http(s) URL, got: {}", load.target_url));
    }

    if load.concurrency == 0 || load.concurrency > MAX_CONCURRENCY {
        return Err(anyhow!(
            "Concurrency must be between 1 and {}, got: {}",
            MAX_CONCURRENCY,
            load.concurrency
        ));
    }

    if !(0.0..=100.0).contains(&load.threshold) {
        return Err(anyhow!(
            "Availability threshold must be between 0 and 100, got: {}",
            load.threshold
        ));
    }

    Ok(())
}
