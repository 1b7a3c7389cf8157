//! Load test gate with the benchmark double against the mock server.

use e2e_tests::assertions::{assert_all_passed, assert_failed_with, assert_port_released};
use e2e_tests::TestWorkspace;
use servcheck_common::FailureKind;
use servcheck_config::HarnessConfig;
use servcheck_harness::{run_load, LoadOverrides};
use servcheck_process::ServerLauncher;
use std::time::Duration;

fn with_env(mut config: HarnessConfig, pairs: &[(&str, &str)]) -> HarnessConfig {
    for (k, v) in pairs {
        config.load.environment.insert(k.to_string(), v.to_string());
    }
    config
}

async fn run(config: &HarnessConfig, overrides: LoadOverrides) -> servcheck_common::RunSummary {
    let launcher = ServerLauncher::from_config(&config.server);
    run_load(&launcher, &config.load, &overrides).await
}

#[tokio::test]
async fn test_live_load_passes() {
    let ws = TestWorkspace::new();
    let config = ws.harness_config();

    let summary = run(&config, LoadOverrides::default()).await;

    assert_all_passed(&summary, 1).unwrap();
    assert!(ws.log_contents().contains("GET /ping/index.html"));
    assert_port_released(ws.port, Duration::from_secs(2)).unwrap();
}

#[tokio::test]
async fn test_unreachable_target_fails_readiness() {
    let ws = TestWorkspace::new();
    let mut config = ws.harness_config();
    config.server.readiness.timeout = Duration::from_secs(1);

    // The server listens elsewhere, so the probe on the target never connects
    let overrides = LoadOverrides {
        target_url: Some(format!("http://127.0.0.1:{}/", e2e_tests::free_port())),
        repetitions: Some(2),
        ..LoadOverrides::default()
    };
    let summary = run(&config, overrides).await;

    assert_failed_with(&summary, FailureKind::Readiness, "http://127.0.0.1").unwrap();
}

#[tokio::test]
async fn test_reported_availability_below_threshold() {
    let ws = TestWorkspace::new();
    let config = with_env(ws.harness_config(), &[("MOCKSIEGE_AVAILABILITY", "97.5")]);

    let summary = run(&config, LoadOverrides::default()).await;

    assert_failed_with(&summary, FailureKind::Availability, "/ping/index.html").unwrap();
    assert_eq!(summary.failures()[0].actual, "97.50");
    assert_port_released(ws.port, Duration::from_secs(2)).unwrap();
}

#[tokio::test]
async fn test_client_failure_is_reported() {
    let ws = TestWorkspace::new();
    let config = with_env(ws.harness_config(), &[("MOCKSIEGE_MODE", "fail")]);

    let summary = run(&config, LoadOverrides::default()).await;

    assert_failed_with(&summary, FailureKind::BenchmarkTool, "/ping/index.html").unwrap();
    assert!(summary.failures()[0].actual.contains("exit code 2"));
}

#[tokio::test]
async fn test_warm_up_failure_is_reported() {
    let ws = TestWorkspace::new();
    let config = with_env(ws.harness_config(), &[("MOCKSIEGE_WARMUP_EXIT", "3")]);

    let summary = run(&config, LoadOverrides::default()).await;

    assert_failed_with(&summary, FailureKind::BenchmarkTool, "/ping/index.html").unwrap();
    assert!(summary.failures()[0].actual.contains("warm-up"));
}

#[tokio::test]
async fn test_unparsable_report_is_reported() {
    let ws = TestWorkspace::new();
    let config = with_env(ws.harness_config(), &[("MOCKSIEGE_MODE", "garbage")]);

    let summary = run(&config, LoadOverrides::default()).await;

    assert_failed_with(&summary, FailureKind::BenchmarkTool, "/ping/index.html").unwrap();
    assert!(summary.failures()[0].actual.contains("not a report"));
}

#[tokio::test]
async fn test_missing_client_binary() {
    let ws = TestWorkspace::new();
    let config = ws.harness_config();
    let overrides = LoadOverrides {
        client: Some(ws.path().join("no-such-siege")),
        ..LoadOverrides::default()
    };

    let summary = run(&config, overrides).await;

    assert_eq!(summary.failed(), 1);
    assert_port_released(ws.port, Duration::from_secs(2)).unwrap();
}
