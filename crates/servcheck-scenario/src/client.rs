//! HTTP transport for scenario requests.

use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::redirect::Policy;
use reqwest::{Client, Method};
use servcheck_common::{Error, Result};
use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::debug;

/// Maximum redirects followed when a suite opts into following them.
const MAX_REDIRECTS: usize = 10;

/// Request body ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum PreparedBody {
    Empty,
    Bytes(Vec<u8>),
    Multipart(Vec<PreparedPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// All values of a header, in order received. Non-UTF-8 values are skipped.
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.header_values(name).into_iter().next()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One client per suite; never follows redirects unless asked to.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
}

impl HttpClient {
    pub fn new(timeout: Duration, follow_redirects: bool) -> Result<Self> {
        let policy = if follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let inner = Client::builder()
            .timeout(timeout)
            .redirect(policy)
            .build()
            .map_err(|e| Error::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { inner })
    }

    pub async fn send(
        &self,
        method: &str,
        url: &str,
        headers: &BTreeMap<String, String>,
        body: PreparedBody,
    ) -> Result<HttpResponse> {
        let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::validation(format!("invalid HTTP method '{}'", method)))?;

        debug!("{} {}", method, url);
        let mut request = self.inner.request(method, url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        request = match body {
            PreparedBody::Empty => request,
            PreparedBody::Bytes(data) => request.body(data),
            PreparedBody::Multipart(parts) => request.multipart(build_form(parts)?),
        };

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(transport_error)?.to_vec();

        debug!("-> {} ({} bytes)", status, body.len());
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn build_form(parts: Vec<PreparedPart>) -> Result<Form> {
    let mut form = Form::new();
    for part in parts {
        let mut body = Part::bytes(part.data);
        if let Some(filename) = part.filename {
            body = body.file_name(filename);
        }
        if let Some(content_type) = part.content_type {
            body = body
                .mime_str(&content_type)
                .map_err(|e| Error::validation(format!("invalid content type '{}': {}", content_type, e)))?;
        }
        form = form.part(part.name, body);
    }
    Ok(form)
}

/// Flatten the error chain so "connection refused" style causes are visible.
fn transport_error(err: reqwest::Error) -> Error {
    let mut message = err.to_string();
    let mut source = StdError::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = StdError::source(cause);
    }
    Error::Http(message)
}
