//! Harness configuration.
//!
//! A single YAML document describes where the server binary lives, how to
//! decide it is ready, which fixture directories to use, and the load test
//! parameters. Every field has a default so an empty file is valid.
//!
//! ```yaml
//! server:
//!   binary: ./webserv
//!   log_file: tests/logs/stdout
//!   readiness:
//!     mode: poll
//!     timeout: 10s
//! load:
//!   client: siege
//!   repetitions: 1000
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub mod duration_serde;
pub mod validation;

/// Maximum simultaneous connections the benchmark client is allowed to open.
pub const MAX_CONCURRENCY: u32 = 255;

/// Shortest settle interval accepted in settle mode.
pub const MIN_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub server: ServerConfig,
    pub fixtures: FixturesConfig,
    /// Directory (or single file) of scenario suite definitions
    pub suites_dir: PathBuf,
    /// Directory of configuration artifacts the server must reject
    pub invalid_configs_dir: PathBuf,
    pub validation: ValidationConfig,
    pub load: LoadConfig,
    pub http: HttpConfig,
}

/// How to launch and supervise the server under test
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub binary: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
    /// Append-mode destination for captured server output
    pub log_file: PathBuf,
    pub readiness: ReadinessConfig,
    /// Time allowed between SIGTERM and a forced kill
    #[serde(with = "duration_serde")]
    pub graceful_timeout: Duration,
}

/// Readiness strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessMode {
    /// Sleep a fixed interval after spawn
    Settle,
    /// Retry TCP connects with backoff until the port accepts
    Poll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    pub mode: ReadinessMode,
    #[serde(with = "duration_serde")]
    pub settle_delay: Duration,
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
    #[serde(with = "duration_serde")]
    pub initial_backoff: Duration,
    #[serde(with = "duration_serde")]
    pub max_backoff: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FixturesConfig {
    /// Static HTML used as expected-response oracles
    pub html_dir: PathBuf,
    /// Files used as request bodies for upload scenarios
    pub uploads_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// How long a rejected config may take to make the server exit
    #[serde(with = "duration_serde")]
    pub exit_timeout: Duration,
    pub expected_exit_code: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    /// Benchmark client binary (PATH lookup when it has no separator)
    pub client: PathBuf,
    pub target_url: String,
    pub concurrency: u32,
    pub repetitions: u32,
    /// Minimum availability percentage for a passing run
    pub threshold: f64,
    /// Config artifact for the server; `None` lets the server use its built-in default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_config: Option<PathBuf>,
    /// Extra environment for the benchmark client
    pub environment: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout for scenario requests
    #[serde(with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("./webserv"),
            working_directory: None,
            log_file: PathBuf::from("tests/logs/stdout"),
            readiness: ReadinessConfig::default(),
            graceful_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            mode: ReadinessMode::Poll,
            settle_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(10),
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(1),
        }
    }
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            html_dir: PathBuf::from("tests/www/html"),
            uploads_dir: PathBuf::from("tests/www/uploads"),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            exit_timeout: Duration::from_secs(5),
            expected_exit_code: 1,
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            client: PathBuf::from("siege"),
            target_url: "http://127.0.0.1:8000/ping/index.html".to_string(),
            concurrency: MAX_CONCURRENCY,
            repetitions: 1000,
            threshold: 100.0,
            server_config: None,
            environment: HashMap::new(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            fixtures: FixturesConfig::default(),
            suites_dir: PathBuf::from("suites"),
            invalid_configs_dir: PathBuf::from("tests/configs/errors"),
            validation: ValidationConfig::default(),
            load: LoadConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a YAML file.
    ///
    /// Relative paths in the file are anchored to the file's directory.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::load_from_string(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        debug!("Loaded harness config from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        // serde_yaml rejects an empty document; treat it as all-defaults
        let config: HarnessConfig = if content.trim().is_empty() {
            HarnessConfig::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Anchors every relative path onto `base`.
    ///
    /// Binaries without a path separator are left alone so they resolve
    /// through `PATH` (e.g. `siege`).
    pub fn rebase(&mut self, base: &Path) {
        rebase_binary(&mut self.server.binary, base);
        rebase_binary(&mut self.load.client, base);
        rebase_path(&mut self.server.log_file, base);
        rebase_path(&mut self.fixtures.html_dir, base);
        rebase_path(&mut self.fixtures.uploads_dir, base);
        rebase_path(&mut self.suites_dir, base);
        rebase_path(&mut self.invalid_configs_dir, base);
        if let Some(dir) = self.server.working_directory.as_mut() {
            rebase_path(dir, base);
        }
        if let Some(cfg) = self.load.server_config.as_mut() {
            rebase_path(cfg, base);
        }
    }
}

fn rebase_path(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn rebase_binary(path: &mut PathBuf, base: &Path) {
    if path.components().count() > 1 {
        rebase_path(path, base);
    }
}
