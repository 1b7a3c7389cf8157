//! The `servcheck` binary: exit codes, printed summary and interrupts.

use e2e_tests::assertions::assert_port_released;
use e2e_tests::cli::run_servcheck;
use e2e_tests::TestWorkspace;
use std::time::Duration;

const PASSING: &str = r#"
  - name: index
    request: { path: / }
    expect: { status: 200 }
"#;

const FAILING: &str = r#"
  - name: expects teapot
    request: { path: / }
    expect: { status: 418 }
"#;

const TIMEOUT: Duration = Duration::from_secs(60);

#[test]
fn test_check_configs_exit_zero() {
    let ws = TestWorkspace::new();
    ws.write_harness_file(&ws.harness_config());

    let run = run_servcheck(ws.path(), &["check-configs"], TIMEOUT);

    assert!(run.succeeded(), "{:?}", run);
    assert!(run.stdout.contains("Testing: bad_listen.yaml"));
    assert!(run.stdout.contains("Testing: not_yaml.yaml"));
    assert_eq!(run.headline(), "All checks passed (5 total)");
}

#[test]
fn test_failing_suite_exit_one() {
    let ws = TestWorkspace::new();
    let server = ws.standard_server_config();
    ws.write_suite("a_pass", &server, PASSING);
    ws.write_suite("b_fail", &server, FAILING);
    let harness = ws.write_harness_file(&ws.harness_config());

    let run = run_servcheck(
        ws.path(),
        &["--config", harness.to_str().unwrap(), "suites"],
        TIMEOUT,
    );

    assert_eq!(run.exit_code, Some(1), "{:?}", run);
    assert_eq!(run.headline(), "1 of 2 checks failed");
    assert!(run.stdout.contains("[assertion]"));
    assert!(run.stdout.contains("expects teapot"));
    assert_eq!(run.stdout.matches("checks failed").count(), 1);
    assert_port_released(ws.port, Duration::from_secs(2)).unwrap();
}

#[test]
fn test_suite_selection_by_name() {
    let ws = TestWorkspace::new();
    let server = ws.standard_server_config();
    ws.write_suite("a_pass", &server, PASSING);
    ws.write_suite("b_fail", &server, FAILING);
    ws.write_harness_file(&ws.harness_config());

    let run = run_servcheck(ws.path(), &["suites", "--suite", "a_pass"], TIMEOUT);

    assert!(run.succeeded(), "{:?}", run);
    assert_eq!(run.headline(), "All checks passed (1 total)");
}

#[test]
fn test_load_with_out_of_range_reps() {
    let ws = TestWorkspace::new();
    let mut config = ws.harness_config();
    config.load.concurrency = 2;
    ws.write_harness_file(&config);

    // -1 falls back to 100 repetitions
    let run = run_servcheck(ws.path(), &["load", "--reps", "-1"], TIMEOUT);

    assert!(run.succeeded(), "{:?}", run);
    assert_eq!(run.headline(), "All checks passed (1 total)");
    assert!(ws.log_contents().matches("GET /ping/index.html").count() >= 200);
}

#[test]
fn test_all_runs_every_driver() {
    let ws = TestWorkspace::new();
    ws.write_suite("a_pass", &ws.standard_server_config(), PASSING);
    ws.write_harness_file(&ws.harness_config());

    let run = run_servcheck(ws.path(), &["all"], TIMEOUT);

    // 5 invalid configs, 1 scenario, 1 load gate
    assert!(run.succeeded(), "{:?}", run);
    assert_eq!(run.headline(), "All checks passed (7 total)");
}

#[test]
fn test_unreadable_harness_config() {
    let ws = TestWorkspace::new();
    ws.write("broken.yaml", "server: [\n");

    let run = run_servcheck(ws.path(), &["--config", "broken.yaml", "all"], TIMEOUT);

    assert_eq!(run.exit_code, Some(1));
    assert!(run.stderr.contains("Failed to load harness config"), "{}", run.stderr);
}

#[cfg(unix)]
#[test]
fn test_interrupt_cancels_run() {
    use e2e_tests::cli::{finish, interrupt, spawn_servcheck};

    let ws = TestWorkspace::new();
    ws.write_suite("a_slow", &ws.slow_server_config(3000), PASSING);
    ws.write_harness_file(&ws.harness_config());

    let child = spawn_servcheck(ws.path(), &["suites"]);
    std::thread::sleep(Duration::from_millis(800));
    interrupt(&child);
    let run = finish(child, TIMEOUT);

    assert_eq!(run.exit_code, Some(1), "{:?}", run);
    assert!(run.stdout.contains("[cancelled]"), "{}", run.stdout);

    std::thread::sleep(Duration::from_millis(3000));
    assert_port_released(ws.port, Duration::from_millis(200)).unwrap();
}
