//! Response assertions.

use crate::client::HttpResponse;
use crate::context::SuiteContext;
use crate::fixtures::html_oracle;
use crate::model::{BodyExpectation, Expectation};
use std::fmt;

/// Bodies longer than this are summarized instead of printed.
const PREVIEW_LIMIT: usize = 80;

/// One failed assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub check: String,
    pub expected: String,
    pub actual: String,
}

impl Mismatch {
    fn new(check: impl Into<String>, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self {
            check: check.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.check, self.expected, self.actual)
    }
}

/// Evaluate every populated field of `expect`. Returns all mismatches, not
/// only the first.
pub fn evaluate(expect: &Expectation, response: &HttpResponse, ctx: &SuiteContext) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    if let Some(status) = expect.status {
        if response.status != status {
            mismatches.push(Mismatch::new(
                "status",
                status.to_string(),
                response.status.to_string(),
            ));
        }
    }

    for (name, expected) in &expect.headers {
        let check = format!("header {}", name);
        let expected = match ctx.interpolate(expected) {
            Ok(value) => value,
            Err(e) => {
                mismatches.push(Mismatch::new(check, expected.clone(), e.to_string()));
                continue;
            }
        };
        let values = response.header_values(name);
        if values.is_empty() {
            mismatches.push(Mismatch::new(check, quoted(&expected), "missing"));
        } else if !values.iter().any(|v| *v == expected) {
            mismatches.push(Mismatch::new(check, quoted(&expected), quoted(&values.join(", "))));
        }
    }

    for name in &expect.headers_present {
        if response.header_values(name).is_empty() {
            mismatches.push(Mismatch::new(format!("header {}", name), "present", "missing"));
        }
    }

    for name in &expect.headers_absent {
        let values = response.header_values(name);
        if !values.is_empty() {
            mismatches.push(Mismatch::new(
                format!("header {}", name),
                "absent",
                quoted(&values.join(", ")),
            ));
        }
    }

    if let Some(body) = &expect.body {
        evaluate_body(body, response, ctx, &mut mismatches);
    }

    mismatches
}

fn evaluate_body(
    expect: &BodyExpectation,
    response: &HttpResponse,
    ctx: &SuiteContext,
    mismatches: &mut Vec<Mismatch>,
) {
    let actual = &response.body;

    if let Some(text) = &expect.equals {
        match ctx.interpolate(text) {
            Ok(expected) => compare_exact("body", expected.as_bytes(), actual, mismatches),
            Err(e) => mismatches.push(Mismatch::new("body", text.clone(), e.to_string())),
        }
    }

    if let Some(name) = &expect.equals_file {
        let check = format!("body == {}", name.display());
        match html_oracle(ctx, name) {
            Ok(expected) => compare_exact(&check, &expected, actual, mismatches),
            Err(e) => mismatches.push(Mismatch::new(check, "readable fixture", e.to_string())),
        }
    }

    if let Some(name) = &expect.equals_var {
        let check = format!("body == ${{{}}}", name);
        match ctx.var(name) {
            Ok(expected) => compare_exact(&check, expected.as_bytes(), actual, mismatches),
            Err(e) => mismatches.push(Mismatch::new(check, "stored value", e.to_string())),
        }
    }

    if !expect.contains.is_empty() {
        let text = response.text();
        for needle in &expect.contains {
            match ctx.interpolate(needle) {
                Ok(needle) if !text.contains(&needle) => mismatches.push(Mismatch::new(
                    "body contains",
                    quoted(&needle),
                    preview(actual),
                )),
                Ok(_) => {}
                Err(e) => mismatches.push(Mismatch::new("body contains", needle.clone(), e.to_string())),
            }
        }
    }

    if expect.empty && !actual.is_empty() {
        mismatches.push(Mismatch::new("body", "empty", preview(actual)));
    }

    if let Some(length) = expect.length {
        if actual.len() != length {
            mismatches.push(Mismatch::new(
                "body length",
                length.to_string(),
                actual.len().to_string(),
            ));
        }
    }
}

fn compare_exact(check: &str, expected: &[u8], actual: &[u8], mismatches: &mut Vec<Mismatch>) {
    if expected != actual {
        mismatches.push(Mismatch::new(check, preview(expected), preview(actual)));
    }
}

fn quoted(value: &str) -> String {
    format!("'{}'", value)
}

fn preview(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "empty body".to_string();
    }
    if bytes.len() > PREVIEW_LIMIT {
        return format!("<{} bytes>", bytes.len());
    }
    quoted(&String::from_utf8_lossy(bytes))
}
