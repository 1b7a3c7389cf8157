//! Throwaway directory holding everything one end-to-end test needs: site
//! content for the mock server, oracle fixtures, server configurations,
//! suites and a harness configuration pointing at the built binaries.

use crate::{mocksiege_path, mockserv_path};
use servcheck_config::{HarnessConfig, ReadinessConfig, ReadinessMode};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub const INDEX_A: &str = "<html><body><h1>webservA</h1></body></html>\n";
pub const INDEX_B: &str = "<html><body><h1>webservB</h1></body></html>\n";
pub const CUSTOM_ERROR: &str = "<html><body><h1>Custom not found</h1></body></html>\n";
pub const PING: &str = "pong\n";

/// Reserve an ephemeral port by binding and releasing it.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .expect("Failed to reserve a port")
}

pub struct TestWorkspace {
    dir: TempDir,
    pub port: u16,
}

impl TestWorkspace {
    /// Lay out site roots, oracle fixtures and the invalid-config set.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create test directory");
        let ws = Self {
            dir,
            port: free_port(),
        };

        ws.write("site_a/index.html", INDEX_A);
        ws.write("site_a/ping/index.html", PING);
        ws.write("site_b/index.html", INDEX_B);

        ws.write("fixtures/html/index.html", INDEX_A);
        ws.write("fixtures/html/index2.html", INDEX_B);
        ws.write("fixtures/html/webservA/index.html", INDEX_A);
        ws.write("fixtures/html/webservB/index.html", INDEX_B);
        ws.write("fixtures/html/custom_error.html", CUSTOM_ERROR);
        ws.write("fixtures/html/ping.html", PING);
        ws.write("fixtures/uploads/sample.txt", "sample upload\n");
        ws.write("fixtures/pages/custom_error.html", CUSTOM_ERROR);

        ws.write("errors/empty_servers.yaml", "servers: []\n");
        ws.write(
            "errors/bad_listen.yaml",
            "servers:\n  - listen: not-an-address\n    root: .\n",
        );
        ws.write(
            "errors/missing_root.yaml",
            "servers:\n  - listen: 127.0.0.1:1\n    root: no/such/dir\n",
        );
        ws.write(
            "errors/unknown_directive.yaml",
            "servers:\n  - listen: 127.0.0.1:1\n    root: .\n    gzip: on\n",
        );
        ws.write("errors/not_yaml.yaml", "servers: [\n");

        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create fixture dir");
        }
        std::fs::write(&path, contents).expect("Failed to write fixture");
        path
    }

    pub fn log_file(&self) -> PathBuf {
        self.dir.path().join("logs").join("stdout")
    }

    pub fn log_contents(&self) -> String {
        std::fs::read_to_string(self.log_file()).unwrap_or_default()
    }

    /// Two virtual servers on one port: A with a 10-byte body limit and a
    /// custom 404 page, B (`webserv2`) with a 100000-byte limit.
    pub fn standard_server_config(&self) -> PathBuf {
        let yaml = format!(
            r#"
servers:
  - listen: 127.0.0.1:{port}
    server_names: [localhost, webservA]
    root: site_a
    client_max_body_size: 10
    error_pages:
      404: fixtures/pages/custom_error.html
    locations:
      - path: /
        methods: [GET, HEAD]
      - path: /uploads/
        methods: [GET, POST, DELETE]
        autoindex: true
        upload_dir: store_a
      - path: /redirect
        redirect: /index.html
      - path: /session
        session: true
      - path: /readonly/
        methods: [GET]
  - listen: 127.0.0.1:{port}
    server_names: [webserv2, webservB]
    root: site_b
    client_max_body_size: 100000
    locations:
      - path: /uploads/
        methods: [GET, POST, DELETE]
        autoindex: true
        upload_dir: store_b
"#,
            port = self.port
        );
        self.write("server.yaml", &yaml)
    }

    /// Server that waits before binding.
    pub fn slow_server_config(&self, delay_ms: u64) -> PathBuf {
        let yaml = format!(
            "startup_delay_ms: {}\nservers:\n  - listen: 127.0.0.1:{}\n    root: site_a\n",
            delay_ms, self.port
        );
        self.write("slow_server.yaml", &yaml)
    }

    /// Suite file under `suites/` with the header filled in.
    pub fn write_suite(&self, name: &str, config: &Path, scenarios: &str) -> PathBuf {
        let yaml = format!(
            "name: {name}\nconfig: {config}\nbase_url: {base}\nscenarios:\n{scenarios}",
            name = name,
            config = config.display(),
            base = self.base_url(),
            scenarios = scenarios
        );
        self.write(&format!("suites/{}.yaml", name), &yaml)
    }

    pub fn suites_dir(&self) -> PathBuf {
        self.dir.path().join("suites")
    }

    pub fn errors_dir(&self) -> PathBuf {
        self.dir.path().join("errors")
    }

    /// Harness configuration driving the mock server and benchmark client.
    pub fn harness_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::default();
        config.server.binary = mockserv_path();
        config.server.working_directory = Some(self.path().to_path_buf());
        config.server.log_file = self.log_file();
        config.server.graceful_timeout = Duration::from_secs(5);
        config.server.readiness = ReadinessConfig {
            mode: ReadinessMode::Poll,
            timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(20),
            max_backoff: Duration::from_millis(200),
            ..ReadinessConfig::default()
        };
        config.fixtures.html_dir = self.path().join("fixtures/html");
        config.fixtures.uploads_dir = self.path().join("fixtures/uploads");
        config.suites_dir = self.suites_dir();
        config.invalid_configs_dir = self.errors_dir();
        config.validation.exit_timeout = Duration::from_secs(3);
        config.load.client = mocksiege_path();
        config.load.target_url = format!("{}/ping/index.html", self.base_url());
        config.load.concurrency = 4;
        config.load.repetitions = 5;
        config.load.server_config = Some(self.standard_server_config());
        config.http.timeout = Duration::from_secs(5);
        config
    }

    /// Same settings serialized for the CLI.
    pub fn write_harness_file(&self, config: &HarnessConfig) -> PathBuf {
        let yaml = serde_yaml::to_string(config).expect("Failed to serialize harness config");
        self.write("harness.yaml", &yaml)
    }

    /// True once nothing accepts connections on the workspace port.
    pub fn port_is_free(&self) -> bool {
        std::net::TcpStream::connect_timeout(
            &([127, 0, 0, 1], self.port).into(),
            Duration::from_millis(200),
        )
        .is_err()
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
