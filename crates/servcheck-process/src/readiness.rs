//! Readiness detection for a freshly spawned server.
//!
//! The server has no health endpoint or handshake. Two policies exist:
//!
//! - `Settle`: sleep a fixed interval. Readiness is probabilistic.
//! - `Poll`: retry TCP connects with exponential backoff until the listening
//!   port accepts, and fail explicitly once the overall timeout elapses.
//!
//! Both policies fail fast if the child exits before becoming ready.

use servcheck_common::{ProcessError, ProcessResult};
use reqwest::Url;
use servcheck_config::{ReadinessConfig, ReadinessMode};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::Child;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info, warn};

/// Upper bound for a single connect attempt.
const CONNECT_ATTEMPT_TIMEOUT: Duration = Duration::from_millis(500);

/// Poll granularity used while sleeping through a settle delay.
const SETTLE_EXIT_CHECK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessPolicy {
    Settle {
        delay: Duration,
    },
    Poll {
        address: String,
        timeout: Duration,
        initial_backoff: Duration,
        max_backoff: Duration,
    },
}

impl ReadinessPolicy {
    /// Build the policy for one launch.
    ///
    /// Poll mode needs a `host:port` to probe; without one it degrades to the
    /// settle delay.
    pub fn from_config(config: &ReadinessConfig, address: Option<&str>) -> Self {
        match (config.mode, address) {
            (ReadinessMode::Poll, Some(address)) => ReadinessPolicy::Poll {
                address: address.to_string(),
                timeout: config.timeout,
                initial_backoff: config.initial_backoff,
                max_backoff: config.max_backoff,
            },
            (ReadinessMode::Poll, None) => {
                warn!("Readiness poll requested without a probe address, using settle delay");
                ReadinessPolicy::Settle {
                    delay: config.settle_delay,
                }
            }
            (ReadinessMode::Settle, _) => ReadinessPolicy::Settle {
                delay: config.settle_delay,
            },
        }
    }
}

/// Block until `child` is considered ready according to `policy`.
pub async fn wait_until_ready(
    id: &str,
    child: &mut Child,
    policy: &ReadinessPolicy,
) -> ProcessResult<Duration> {
    let started = Instant::now();

    match policy {
        ReadinessPolicy::Settle { delay } => {
            let deadline = started + *delay;
            while Instant::now() < deadline {
                check_still_running(id, child)?;
                let remaining = deadline.saturating_duration_since(Instant::now());
                sleep(remaining.min(SETTLE_EXIT_CHECK_INTERVAL)).await;
            }
            check_still_running(id, child)?;
            debug!("Settle delay elapsed for {} ({:?})", id, delay);
        }
        ReadinessPolicy::Poll {
            address,
            timeout: overall,
            initial_backoff,
            max_backoff,
        } => {
            let deadline = started + *overall;
            let mut backoff = *initial_backoff;
            let mut attempts = 0u32;

            loop {
                check_still_running(id, child)?;
                attempts += 1;

                let remaining = deadline.saturating_duration_since(Instant::now());
                let attempt_budget = remaining.min(CONNECT_ATTEMPT_TIMEOUT);
                match timeout(attempt_budget, TcpStream::connect(address.as_str())).await {
                    Ok(Ok(_stream)) => {
                        debug!("{} accepted a connection after {} attempt(s)", address, attempts);
                        break;
                    }
                    Ok(Err(e)) => debug!("Readiness probe {} failed: {}", address, e),
                    Err(_) => debug!("Readiness probe {} timed out", address),
                }

                let now = Instant::now();
                if now >= deadline {
                    return Err(ProcessError::not_ready(id, address.clone(), *overall));
                }
                sleep(backoff.min(deadline - now)).await;
                backoff = (backoff * 2).min(*max_backoff);
            }
        }
    }

    let waited = started.elapsed();
    info!("Server {} ready after {:?}", id, waited);
    Ok(waited)
}

fn check_still_running(id: &str, child: &mut Child) -> ProcessResult<()> {
    match child.try_wait() {
        Ok(None) => Ok(()),
        Ok(Some(status)) => Err(ProcessError::exited_early(id, status.code())),
        Err(e) => Err(ProcessError::spawn_failed(
            id,
            format!("Failed to query child status: {}", e),
        )),
    }
}

/// Extract the `host:port` to probe from an `http://` or `https://` URL.
///
/// ```
/// use servcheck_process::probe_address;
///
/// assert_eq!(probe_address("http://localhost:8000/uploads/").as_deref(), Some("localhost:8000"));
/// assert_eq!(probe_address("http://example.com").as_deref(), Some("example.com:80"));
/// ```
pub fn probe_address(url: &str) -> Option<String> {
    let url = Url::parse(url.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?;
    let port = url.port_or_known_default()?;
    Some(format!("{}:{}", host, port))
}
