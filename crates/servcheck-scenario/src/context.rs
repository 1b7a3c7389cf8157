//! Per-suite state, owned for exactly the lifetime of one suite run.

use crate::client::HttpClient;
use servcheck_common::{Error, Result, SuiteName};
use servcheck_config::FixturesConfig;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Everything a scenario needs besides its own definition.
///
/// Replaces process-wide shared state: a fresh context is built for each
/// suite and dropped when the suite ends, so variables never leak between
/// suites.
#[derive(Debug)]
pub struct SuiteContext {
    suite: SuiteName,
    base_url: String,
    html_dir: PathBuf,
    uploads_dir: PathBuf,
    vars: HashMap<String, String>,
    client: HttpClient,
}

impl SuiteContext {
    pub fn new(
        suite: SuiteName,
        base_url: impl Into<String>,
        fixtures: &FixturesConfig,
        client: HttpClient,
    ) -> Self {
        Self {
            suite,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            html_dir: fixtures.html_dir.clone(),
            uploads_dir: fixtures.uploads_dir.clone(),
            vars: HashMap::new(),
            client,
        }
    }

    pub fn suite(&self) -> &SuiteName {
        &self.suite
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &HttpClient {
        &self.client
    }

    /// Absolute request URL for a scenario path.
    pub fn url_for(&self, path: &str) -> Result<String> {
        let path = self.interpolate(path)?;
        if path.starts_with('/') {
            Ok(format!("{}{}", self.base_url, path))
        } else {
            Ok(format!("{}/{}", self.base_url, path))
        }
    }

    pub fn html_fixture(&self, name: &Path) -> PathBuf {
        self.html_dir.join(name)
    }

    pub fn upload_fixture(&self, name: &Path) -> PathBuf {
        self.uploads_dir.join(name)
    }

    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn var(&self, name: &str) -> Result<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| Error::not_found(format!("variable '{}'", name)))
    }

    /// Replace every `${name}` with the stored variable.
    ///
    /// An unterminated `${` is kept literally. Unknown names are an error.
    pub fn interpolate(&self, input: &str) -> Result<String> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    out.push_str(self.var(&after[..end])?);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}
