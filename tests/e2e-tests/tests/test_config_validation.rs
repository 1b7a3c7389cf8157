//! Invalid-configuration checks against the mock server.

use e2e_tests::assertions::{
    assert_all_passed, assert_counts, assert_failed_with, assert_port_released,
    count_in_log_file,
};
use e2e_tests::TestWorkspace;
use servcheck_common::FailureKind;
use servcheck_harness::check_invalid_configs;
use servcheck_process::ServerLauncher;
use std::time::Duration;

#[tokio::test]
async fn test_every_invalid_config_is_rejected() {
    let ws = TestWorkspace::new();
    let config = ws.harness_config();
    let launcher = ServerLauncher::from_config(&config.server);

    let summary = check_invalid_configs(&launcher, &ws.errors_dir(), &config.validation).await;

    assert_all_passed(&summary, 5).unwrap();
    assert_eq!(count_in_log_file(&ws.log_file(), "exited (exit code 1)"), 5);
}

#[tokio::test]
async fn test_accepted_config_is_reported_and_killed() {
    let ws = TestWorkspace::new();
    ws.write(
        "errors/zz_actually_valid.yaml",
        &format!(
            "servers:\n  - listen: 127.0.0.1:{}\n    root: ../site_a\n",
            ws.port
        ),
    );
    let config = ws.harness_config();
    let launcher = ServerLauncher::from_config(&config.server);

    let summary = check_invalid_configs(&launcher, &ws.errors_dir(), &config.validation).await;

    assert_counts(&summary, 5, 1).unwrap();
    assert_failed_with(&summary, FailureKind::UnexpectedExit, "zz_actually_valid.yaml").unwrap();
    assert!(summary.failures()[0].actual.contains("still running"));
    assert_port_released(ws.port, Duration::from_secs(2)).unwrap();
}

#[tokio::test]
async fn test_missing_directory_is_a_failure() {
    let ws = TestWorkspace::new();
    let config = ws.harness_config();
    let launcher = ServerLauncher::from_config(&config.server);

    let summary =
        check_invalid_configs(&launcher, &ws.path().join("no-such-dir"), &config.validation).await;

    assert_counts(&summary, 0, 1).unwrap();
    assert_eq!(summary.exit_code(), 1);
}
