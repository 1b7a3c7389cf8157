//! Server configuration: a YAML file with one or more virtual server blocks.
//!
//! Relative paths are resolved against the directory holding the file.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";

const KNOWN_METHODS: &[&str] = &["GET", "HEAD", "POST", "DELETE"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MockConfig {
    #[serde(default)]
    pub pid_file: Option<PathBuf>,

    /// Delay before binding, to exercise readiness polling
    #[serde(default)]
    pub startup_delay_ms: u64,

    pub servers: Vec<ServerBlock>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerBlock {
    pub listen: String,

    #[serde(default)]
    pub server_names: Vec<String>,

    pub root: PathBuf,

    #[serde(default = "default_index")]
    pub index: String,

    /// Request bodies larger than this are rejected with 413
    #[serde(default)]
    pub client_max_body_size: Option<usize>,

    #[serde(default)]
    pub error_pages: BTreeMap<u16, PathBuf>,

    #[serde(default)]
    pub locations: Vec<Location>,

    #[serde(skip)]
    pub addr: Option<SocketAddr>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub path: String,

    #[serde(default = "default_methods")]
    pub methods: Vec<String>,

    #[serde(default)]
    pub autoindex: bool,

    #[serde(default)]
    pub upload_dir: Option<PathBuf>,

    #[serde(default)]
    pub redirect: Option<String>,

    #[serde(default)]
    pub session: bool,
}

fn default_index() -> String {
    "index.html".to_string()
}

fn default_methods() -> Vec<String> {
    vec!["GET".to_string(), "HEAD".to_string()]
}

impl Location {
    pub fn allows(&self, method: &str) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(method))
    }
}

impl ServerBlock {
    /// Longest-prefix location match.
    pub fn location_for(&self, path: &str) -> Option<&Location> {
        self.locations
            .iter()
            .filter(|loc| path_has_prefix(path, &loc.path))
            .max_by_key(|loc| loc.path.len())
    }

    pub fn answers_to(&self, host: &str) -> bool {
        self.server_names.iter().any(|n| n.eq_ignore_ascii_case(host))
    }
}

fn path_has_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" || prefix.ends_with('/') {
        return path.starts_with(prefix) || path == prefix.trim_end_matches('/');
    }
    path == prefix || path.starts_with(&format!("{}/", prefix))
}

impl MockConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base)
    }

    pub fn parse(content: &str, base: &Path) -> Result<Self, ConfigError> {
        let mut config: MockConfig = serde_yaml::from_str(content)?;
        config.resolve(base);
        config.validate()?;
        Ok(config)
    }

    /// Served when no file is given: `./html` on the default port.
    pub fn fallback() -> Result<Self, ConfigError> {
        let mut config = MockConfig {
            pid_file: None,
            startup_delay_ms: 0,
            servers: vec![ServerBlock {
                listen: DEFAULT_LISTEN.to_string(),
                server_names: Vec::new(),
                root: PathBuf::from("html"),
                index: default_index(),
                client_max_body_size: None,
                error_pages: BTreeMap::new(),
                locations: Vec::new(),
                addr: None,
            }],
        };
        config.validate()?;
        Ok(config)
    }

    fn resolve(&mut self, base: &Path) {
        let rebase = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        if let Some(pid) = self.pid_file.as_mut() {
            rebase(pid);
        }
        for server in &mut self.servers {
            rebase(&mut server.root);
            for page in server.error_pages.values_mut() {
                rebase(page);
            }
            for loc in &mut server.locations {
                if let Some(dir) = loc.upload_dir.as_mut() {
                    rebase(dir);
                }
            }
        }
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        if self.servers.is_empty() {
            return Err(invalid("at least one server block is required"));
        }

        let mut names = HashSet::new();
        for server in &mut self.servers {
            let addr: SocketAddr = server
                .listen
                .parse()
                .map_err(|_| invalid(format!("bad listen address '{}'", server.listen)))?;
            server.addr = Some(addr);

            if !server.root.is_dir() {
                return Err(invalid(format!(
                    "root {} is not a directory",
                    server.root.display()
                )));
            }
            if server.index.is_empty() || server.index.contains('/') {
                return Err(invalid(format!("bad index '{}'", server.index)));
            }

            let host_keys: Vec<String> = if server.server_names.is_empty() {
                vec![String::new()]
            } else {
                server.server_names.iter().map(|n| n.to_ascii_lowercase()).collect()
            };
            for key in host_keys {
                if !names.insert((addr, key.clone())) {
                    return Err(invalid(format!(
                        "duplicate server '{}' on {}",
                        key, server.listen
                    )));
                }
            }

            for code in server.error_pages.keys() {
                if !(400..=599).contains(code) {
                    return Err(invalid(format!("error page for non-error status {}", code)));
                }
            }

            let mut paths = HashSet::new();
            for loc in &server.locations {
                if !loc.path.starts_with('/') {
                    return Err(invalid(format!("location '{}' must start with '/'", loc.path)));
                }
                if !paths.insert(loc.path.clone()) {
                    return Err(invalid(format!("duplicate location '{}'", loc.path)));
                }
                if loc.methods.is_empty() {
                    return Err(invalid(format!("location '{}' allows no methods", loc.path)));
                }
                if let Some(m) = loc
                    .methods
                    .iter()
                    .find(|m| !KNOWN_METHODS.iter().any(|k| k.eq_ignore_ascii_case(m)))
                {
                    return Err(invalid(format!("unknown method '{}'", m)));
                }
                if let Some(dir) = &loc.upload_dir {
                    std::fs::create_dir_all(dir).map_err(|e| {
                        invalid(format!("upload_dir {}: {}", dir.display(), e))
                    })?;
                }
            }
        }

        Ok(())
    }
}
