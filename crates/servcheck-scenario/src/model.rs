//! Suite and scenario definitions as they appear in suite YAML files.
//!
//! ```yaml
//! name: body_limit_a
//! config: tests/configs/body_limit.conf
//! base_url: http://localhost:8000
//! scenarios:
//!   - name: upload_at_limit
//!     chain: file_a
//!     request:
//!       method: POST
//!       path: /uploads/file_a
//!       headers: { Content-Type: text/plain }
//!       body: { random: { length: 10, save_as: file_a } }
//!     expect:
//!       status: 204
//!       body: { empty: true }
//! ```

use serde::{Deserialize, Serialize};
use servcheck_common::SuiteName;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A named, ordered collection of scenarios sharing one server process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suite {
    pub name: SuiteName,
    /// Configuration artifact handed to the server binary
    pub config: PathBuf,
    pub base_url: String,
    /// Headers added to every request unless the scenario overrides them
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    #[serde(default)]
    pub follow_redirects: bool,
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    /// File the suite was loaded from
    #[serde(skip)]
    pub origin: Option<PathBuf>,
}

impl Suite {
    /// Label used as the failure source: the config artifact name.
    pub fn source_label(&self) -> String {
        self.config.display().to_string()
    }
}

/// One request/assertion pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    /// Scenarios sharing a chain label depend on each other's side effects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    pub request: RequestSpec,
    #[serde(default)]
    pub expect: Expectation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capture: Vec<Capture>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestSpec {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodySource>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// Where a request body comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySource {
    /// Literal text, `${var}` interpolated
    Text(String),
    /// File under the uploads fixture directory
    File(PathBuf),
    /// Random alphanumeric payload
    Random {
        length: usize,
        /// Store the payload in the suite context for later comparison
        #[serde(default, skip_serializing_if = "Option::is_none")]
        save_as: Option<String>,
    },
    /// Value previously stored in the suite context
    Var(String),
    /// `multipart/form-data` with one entry per part
    Multipart(Vec<MultipartPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipartPart {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub body: BodySource,
}

/// Assertions evaluated against a response. Every populated field must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Expectation {
    pub status: Option<u16>,
    /// Exact header values (`${var}` interpolated)
    pub headers: BTreeMap<String, String>,
    pub headers_present: Vec<String>,
    pub headers_absent: Vec<String>,
    pub body: Option<BodyExpectation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyExpectation {
    pub equals: Option<String>,
    /// File under the HTML fixture directory whose contents are the oracle
    pub equals_file: Option<PathBuf>,
    pub equals_var: Option<String>,
    pub contains: Vec<String>,
    pub empty: bool,
    pub length: Option<usize>,
}

/// Save part of a response into the suite context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub header: String,
    pub save_as: String,
    /// Keep only `name=value` from a `Set-Cookie` style value
    #[serde(default)]
    pub cookie_pair: bool,
}
