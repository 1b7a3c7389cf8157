//! Suite execution.
//!
//! One suite owns one server process and one [`SuiteContext`] for its whole
//! lifetime. Scenarios run strictly in declaration order with a single
//! request in flight. Each scenario's outcome is recorded independently and
//! a failing scenario never stops the rest of the suite.

use crate::assertions::{evaluate, Mismatch};
use crate::client::{HttpClient, PreparedBody};
use crate::context::SuiteContext;
use crate::fixtures::prepare_body;
use crate::model::{Scenario, Suite};
use servcheck_common::{Failure, FailureKind, Result, RunSummary};
use servcheck_config::{FixturesConfig, HarnessConfig};
use servcheck_process::{probe_address, with_server, ServerLauncher};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Case label used when the whole suite fails before any scenario runs.
pub const STARTUP_CASE: &str = "<startup>";

/// Case label for server lifecycle failures after startup.
pub const SERVER_CASE: &str = "<server>";

/// Runs suites against freshly supervised server instances.
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    launcher: ServerLauncher,
    fixtures: FixturesConfig,
    http_timeout: Duration,
}

impl SuiteRunner {
    pub fn new(launcher: ServerLauncher, fixtures: FixturesConfig, http_timeout: Duration) -> Self {
        Self {
            launcher,
            fixtures,
            http_timeout,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(
            ServerLauncher::from_config(&config.server),
            config.fixtures.clone(),
            config.http.timeout,
        )
    }

    /// Start the suite's server, run every scenario, stop the server.
    ///
    /// The server is stopped on every exit path, including a panic inside a
    /// scenario and the returned future being dropped.
    pub async fn run_suite(&self, suite: &Suite) -> RunSummary {
        let source = suite.source_label();
        info!("Running suite '{}' ({} scenarios) with {}", suite.name, suite.scenarios.len(), source);

        let client = match HttpClient::new(self.http_timeout, suite.follow_redirects) {
            Ok(client) => client,
            Err(e) => {
                let mut summary = RunSummary::new();
                summary.record_failure(Failure::new(
                    source,
                    STARTUP_CASE,
                    FailureKind::Assertion,
                    "usable HTTP client",
                    e.to_string(),
                ));
                return summary;
            }
        };

        let probe = probe_address(&suite.base_url);
        let fixtures = &self.fixtures;
        let mut scenarios: Option<RunSummary> = None;
        let slot = &mut scenarios;
        let result = with_server(&self.launcher, Some(&suite.config), probe.as_deref(), |server| async move {
            debug!("Suite '{}' server ready (PID: {})", suite.name, server.pid);
            let mut ctx = SuiteContext::new(suite.name.clone(), suite.base_url.clone(), fixtures, client);
            *slot = Some(run_scenarios(suite, &mut ctx).await);
        })
        .await;

        // Scenario results survive a server that died under them
        let mut summary = scenarios.unwrap_or_default();
        if let Err(e) = result {
            warn!("Suite '{}' aborted: {}", suite.name, e);
            let case = if e.is_startup_failure() {
                STARTUP_CASE
            } else {
                SERVER_CASE
            };
            summary.record_failure(Failure::from_process_error(source, case, &e));
        }

        info!("Suite '{}': {}", suite.name, summary.headline());
        summary
    }
}

/// Run a suite's scenarios against an already running server.
pub async fn run_scenarios(suite: &Suite, ctx: &mut SuiteContext) -> RunSummary {
    let source = suite.source_label();
    let mut summary = RunSummary::new();
    let mut broken_chains: HashSet<String> = HashSet::new();

    for scenario in &suite.scenarios {
        let mismatches = run_scenario(scenario, &suite.default_headers, ctx).await;
        if mismatches.is_empty() {
            debug!("PASS {} :: {}", suite.name, scenario.name);
            summary.record_pass();
            continue;
        }

        let mut failure = scenario_failure(&source, &scenario.name, &mismatches);
        if let Some(chain) = &scenario.chain {
            if !broken_chains.insert(chain.clone()) {
                failure
                    .actual
                    .push_str(&format!(" (chain '{}' already failing)", chain));
            }
        }
        warn!("FAIL {}", failure);
        summary.record_failure(failure);
    }

    summary
}

/// Execute one scenario. An empty result means it passed.
pub async fn run_scenario(
    scenario: &Scenario,
    default_headers: &BTreeMap<String, String>,
    ctx: &mut SuiteContext,
) -> Vec<Mismatch> {
    let request = match build_request(scenario, default_headers, ctx) {
        Ok(request) => request,
        Err(e) => return vec![Mismatch {
            check: "request".to_string(),
            expected: "valid request".to_string(),
            actual: e.to_string(),
        }],
    };

    let response = match ctx
        .client()
        .send(&scenario.request.method, &request.url, &request.headers, request.body)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            return vec![Mismatch {
                check: "request".to_string(),
                expected: "a response".to_string(),
                actual: format!("request failed: {}", e),
            }]
        }
    };

    let mut mismatches = evaluate(&scenario.expect, &response, ctx);

    for capture in &scenario.capture {
        match response.header(&capture.header) {
            Some(value) => {
                let value = if capture.cookie_pair {
                    value.split(';').next().unwrap_or_default().trim().to_string()
                } else {
                    value
                };
                debug!("Captured {} = {}", capture.save_as, value);
                ctx.set_var(capture.save_as.clone(), value);
            }
            None => mismatches.push(Mismatch {
                check: format!("capture {}", capture.header),
                expected: "header present".to_string(),
                actual: "missing".to_string(),
            }),
        }
    }

    mismatches
}

struct BuiltRequest {
    url: String,
    headers: BTreeMap<String, String>,
    body: PreparedBody,
}

fn build_request(
    scenario: &Scenario,
    default_headers: &BTreeMap<String, String>,
    ctx: &mut SuiteContext,
) -> Result<BuiltRequest> {
    let url = ctx.url_for(&scenario.request.path)?;

    let mut headers = BTreeMap::new();
    for (name, value) in default_headers {
        let overridden = scenario
            .request
            .headers
            .keys()
            .any(|k| k.eq_ignore_ascii_case(name));
        if !overridden {
            headers.insert(name.clone(), ctx.interpolate(value)?);
        }
    }
    for (name, value) in &scenario.request.headers {
        headers.insert(name.clone(), ctx.interpolate(value)?);
    }

    let body = match &scenario.request.body {
        Some(source) => prepare_body(ctx, source)?,
        None => PreparedBody::Empty,
    };

    Ok(BuiltRequest { url, headers, body })
}

fn scenario_failure(source: &str, case: &str, mismatches: &[Mismatch]) -> Failure {
    let join = |f: fn(&Mismatch) -> String| {
        mismatches.iter().map(f).collect::<Vec<_>>().join("; ")
    };
    Failure::new(
        source,
        case,
        FailureKind::Assertion,
        join(|m| format!("{} {}", m.check, m.expected)),
        join(|m| format!("{} {}", m.check, m.actual)),
    )
}
