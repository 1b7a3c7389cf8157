//! Scenario suites against the mock server: virtual hosts, body limits,
//! upload lifecycle, error pages, redirects, sessions and multipart uploads.

use e2e_tests::assertions::{
    assert_all_passed, assert_counts, assert_failed_with, assert_log_file_contains,
    assert_port_released,
};
use e2e_tests::TestWorkspace;
use servcheck_common::{FailureKind, SuiteName};
use servcheck_harness::select_suites;
use servcheck_scenario::{load_suite_file, SuiteRunner};
use std::time::Duration;

const VHOSTS: &str = r#"
  - name: root
    request: { path: / }
    expect: { status: 200 }
  - name: root on webservB
    request: { path: /, headers: { Host: webservB } }
    expect: { status: 200 }
  - name: index on webservA
    request: { path: /index.html, headers: { Host: webservA } }
    expect: { status: 200, body: { equals_file: webservA/index.html } }
  - name: index without host match
    request: { path: /index.html }
    expect: { status: 200, body: { equals_file: webservA/index.html } }
  - name: index on webservB
    request: { path: /index.html, headers: { Host: webservB } }
    expect: { status: 200, body: { equals_file: webservB/index.html } }
"#;

const BODY_LIMIT: &str = r#"
  - name: index
    request: { path: / }
    expect: { status: 200, body: { equals_file: index.html } }
  - name: uploads listing
    request: { path: /uploads/ }
    expect: { status: 200, body: { contains: ["Index of /uploads/"] } }
  - name: post small file
    chain: file_a
    request:
      method: POST
      path: /uploads/file_a
      headers: { Content-Type: text/plain }
      body: { random: { length: 5, save_as: file_a } }
    expect: { status: 204 }
  - name: read small file
    chain: file_a
    request: { path: /uploads/file_a }
    expect: { status: 200, body: { equals_var: file_a } }
  - name: post small file again
    chain: file_a
    request: { method: POST, path: /uploads/file_a, body: { var: file_a } }
    expect: { status: 409 }
  - name: delete small file
    chain: file_a
    request: { method: DELETE, path: /uploads/file_a }
    expect: { status: 204, body: { empty: true } }
  - name: small file gone
    chain: file_a
    request: { path: /uploads/file_a }
    expect: { status: 404 }
  - name: post file at limit
    chain: file_alimit
    request:
      method: POST
      path: /uploads/file_alimit
      headers: { Content-Type: text/plain }
      body: { random: { length: 10, save_as: file_alimit } }
    expect: { status: 204 }
  - name: read file at limit
    chain: file_alimit
    request: { path: /uploads/file_alimit }
    expect: { status: 200, body: { equals_var: file_alimit, length: 10 } }
  - name: delete file at limit
    chain: file_alimit
    request: { method: DELETE, path: /uploads/file_alimit }
    expect: { status: 204 }
  - name: post one byte over limit
    chain: file_a11
    request:
      method: POST
      path: /uploads/file_a11
      headers: { Content-Type: text/plain }
      body: { random: { length: 11 } }
    expect: { status: 413 }
  - name: one byte over limit not stored
    chain: file_a11
    request: { path: /uploads/file_a11 }
    expect: { status: 404 }
  - name: post file over limit
    chain: file_too_big
    request:
      method: POST
      path: /uploads/file_too_big
      headers: { Content-Type: text/plain }
      body: { random: { length: 100 } }
    expect: { status: 413 }
  - name: file over limit not stored
    chain: file_too_big
    request: { path: /uploads/file_too_big }
    expect: { status: 404 }
  - name: server B index
    request: { path: /, headers: { Host: webserv2 } }
    expect: { status: 200, body: { equals_file: index2.html } }
  - name: server B accepts 50000 bytes
    chain: file_b
    request:
      method: POST
      path: /uploads/file_b
      headers: { Host: webserv2, Content-Type: text/plain }
      body: { random: { length: 50000, save_as: file_b } }
    expect: { status: 204 }
  - name: server B reads 50000 bytes
    chain: file_b
    request: { path: /uploads/file_b, headers: { Host: webserv2 } }
    expect: { status: 200, body: { equals_var: file_b } }
  - name: server B accepts its limit
    request:
      method: POST
      path: /uploads/file_blimit
      headers: { Host: webserv2 }
      body: { random: { length: 100000 } }
    expect: { status: 204 }
  - name: server B rejects one byte over limit
    chain: file_b100001
    request:
      method: POST
      path: /uploads/file_b100001
      headers: { Host: webserv2 }
      body: { random: { length: 100001 } }
    expect: { status: 413 }
  - name: server B did not store it
    chain: file_b100001
    request: { path: /uploads/file_b100001, headers: { Host: webserv2 } }
    expect: { status: 404 }
"#;

const ERROR_PAGE: &str = r#"
  - name: custom not found page
    request: { path: /not_found }
    expect: { status: 404, body: { equals_file: custom_error.html } }
  - name: method not allowed
    request: { method: DELETE, path: /readonly/thing }
    expect: { status: 405, headers_present: [Allow] }
"#;

const DEFAULT: &str = r#"
  - name: ping
    request: { path: /ping/ }
    expect: { status: 200, body: { equals_file: ping.html } }
  - name: redirect
    request: { path: /redirect }
    expect: { status: 301, headers: { Location: /index.html }, body: { empty: true } }
  - name: first visit sets cookie
    chain: session
    request: { path: /session }
    expect: { status: 200, headers_present: [Set-Cookie], body: { contains: ["visits 1"] } }
    capture:
      - { header: Set-Cookie, save_as: cookie, cookie_pair: true }
  - name: second visit reuses cookie
    chain: session
    request: { path: /session, headers: { Cookie: "${cookie}" } }
    expect: { status: 200, headers_absent: [Set-Cookie], body: { contains: ["visits 2"] } }
  - name: fixture file over server A limit
    request: { method: POST, path: /uploads/sample.txt, body: { file: sample.txt } }
    expect: { status: 413 }
  - name: multipart upload of three files
    chain: multi
    request:
      method: POST
      path: /uploads/
      headers: { Host: webserv2 }
      body:
        multipart:
          - { name: file1, filename: file1, body: { random: { length: 10000, save_as: file1 } } }
          - { name: file2, filename: file2, body: { random: { length: 10000, save_as: file2 } } }
          - { name: file3, filename: file3, body: { random: { length: 10000, save_as: file3 } } }
    expect: { status: 201, body: { contains: [file1, file2, file3] } }
  - name: read file1
    chain: multi
    request: { path: /uploads/file1, headers: { Host: webserv2 } }
    expect: { status: 200, body: { equals_var: file1, length: 10000 } }
  - name: read file2
    chain: multi
    request: { path: /uploads/file2, headers: { Host: webserv2 } }
    expect: { status: 200, body: { equals_var: file2, length: 10000 } }
  - name: read file3
    chain: multi
    request: { path: /uploads/file3, headers: { Host: webserv2 } }
    expect: { status: 200, body: { equals_var: file3, length: 10000 } }
  - name: delete file1
    chain: multi
    request: { method: DELETE, path: /uploads/file1, headers: { Host: webserv2 } }
    expect: { status: 204 }
  - name: delete file2
    chain: multi
    request: { method: DELETE, path: /uploads/file2, headers: { Host: webserv2 } }
    expect: { status: 204 }
  - name: delete file3
    chain: multi
    request: { method: DELETE, path: /uploads/file3, headers: { Host: webserv2 } }
    expect: { status: 204 }
  - name: file1 gone
    chain: multi
    request: { path: /uploads/file1, headers: { Host: webserv2 } }
    expect: { status: 404 }
  - name: file2 gone
    chain: multi
    request: { path: /uploads/file2, headers: { Host: webserv2 } }
    expect: { status: 404 }
  - name: file3 gone
    chain: multi
    request: { path: /uploads/file3, headers: { Host: webserv2 } }
    expect: { status: 404 }
"#;

fn write_all_suites(ws: &TestWorkspace) {
    let server = ws.standard_server_config();
    ws.write_suite("vhosts", &server, VHOSTS);
    ws.write_suite("body_limit", &server, BODY_LIMIT);
    ws.write_suite("error_page", &server, ERROR_PAGE);
    ws.write_suite("default", &server, DEFAULT);
}

#[tokio::test]
async fn test_suites_pass_against_mock_server() {
    let ws = TestWorkspace::new();
    write_all_suites(&ws);
    let config = ws.harness_config();
    let runner = SuiteRunner::from_config(&config);

    let (suites, load_summary) = select_suites(&ws.suites_dir(), &[]);
    assert!(load_summary.is_success(), "{}", load_summary);
    assert_eq!(suites.len(), 4);

    for suite in &suites {
        let summary = runner.run_suite(suite).await;
        assert_all_passed(&summary, suite.scenarios.len()).unwrap();
        assert_port_released(ws.port, Duration::from_secs(2)).unwrap();
    }

    // One start and one stop marker per suite
    assert_log_file_contains(&ws.log_file(), "stopped (").unwrap();
    assert_eq!(ws.log_contents().matches("[servcheck] starting ").count(), 4);
}

#[tokio::test]
async fn test_failing_scenarios_are_aggregated() {
    let ws = TestWorkspace::new();
    let server = ws.standard_server_config();
    let path = ws.write_suite(
        "mixed",
        &server,
        r#"
  - name: index ok
    request: { path: / }
    expect: { status: 200 }
  - name: wrong status
    request: { path: /not_found }
    expect: { status: 200 }
  - name: wrong body and header
    request: { path: / }
    expect:
      status: 200
      headers: { Content-Type: application/json }
      body: { contains: ["never there"] }
  - name: still runs after failures
    request: { path: /index.html }
    expect: { status: 200 }
"#,
    );
    let suite = load_suite_file(&path).unwrap();
    let runner = SuiteRunner::from_config(&ws.harness_config());

    let summary = runner.run_suite(&suite).await;

    assert_counts(&summary, 2, 2).unwrap();
    assert_failed_with(&summary, FailureKind::Assertion, "wrong status").unwrap();
    let both = summary
        .failures()
        .iter()
        .find(|f| f.case == "wrong body and header")
        .unwrap();
    assert!(both.expected.contains("; "), "mismatches joined: {}", both);
    assert_eq!(summary.exit_code(), 1);
    assert_port_released(ws.port, Duration::from_secs(2)).unwrap();
}

#[tokio::test]
async fn test_chain_failure_annotates_followers() {
    let ws = TestWorkspace::new();
    let server = ws.standard_server_config();
    let path = ws.write_suite(
        "chained",
        &server,
        r#"
  - name: create over limit
    chain: doc
    request: { method: POST, path: /uploads/doc, body: { random: { length: 50, save_as: doc } } }
    expect: { status: 204 }
  - name: read back
    chain: doc
    request: { path: /uploads/doc }
    expect: { status: 200, body: { equals_var: doc } }
"#,
    );
    let suite = load_suite_file(&path).unwrap();
    let runner = SuiteRunner::from_config(&ws.harness_config());

    let summary = runner.run_suite(&suite).await;

    assert_counts(&summary, 0, 2).unwrap();
    assert!(summary.failures()[1].actual.contains("chain 'doc' already failing"));
}

#[tokio::test]
async fn test_selecting_unknown_suite_is_reported() {
    let ws = TestWorkspace::new();
    write_all_suites(&ws);

    let (suites, summary) = select_suites(
        &ws.suites_dir(),
        &[SuiteName::from("vhosts"), SuiteName::from("full")],
    );

    assert_eq!(suites.len(), 1);
    assert_eq!(suites[0].name.as_str(), "vhosts");
    assert_counts(&summary, 0, 1).unwrap();
    assert!(summary.failures()[0].case.contains("full"));
}
