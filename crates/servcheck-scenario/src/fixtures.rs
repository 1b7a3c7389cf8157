//! Request payloads and expected-response oracles.

use crate::client::{PreparedBody, PreparedPart};
use crate::context::SuiteContext;
use crate::model::BodySource;
use rand::distr::Alphanumeric;
use rand::Rng;
use servcheck_common::{Error, Result, ResultExt};
use std::path::Path;

/// Random payload drawn from `[A-Za-z0-9]`.
pub fn random_payload(length: usize) -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Read a fixture file, naming it in the error.
pub fn read_fixture(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(Error::from)
        .context(format!("Failed to read fixture {}", path.display()))
}

/// Expected body for an `equals_file` assertion.
pub fn html_oracle(ctx: &SuiteContext, name: &Path) -> Result<Vec<u8>> {
    read_fixture(&ctx.html_fixture(name))
}

/// Materialize a body source. Random payloads with `save_as` are stored in
/// the context so later scenarios can compare against them.
pub fn prepare_body(ctx: &mut SuiteContext, source: &BodySource) -> Result<PreparedBody> {
    match source {
        BodySource::Multipart(parts) => {
            let mut prepared = Vec::with_capacity(parts.len());
            for part in parts {
                let data = prepare_bytes(ctx, &part.body)?;
                prepared.push(PreparedPart {
                    name: ctx.interpolate(&part.name)?,
                    filename: part
                        .filename
                        .as_deref()
                        .map(|f| ctx.interpolate(f))
                        .transpose()?,
                    content_type: part.content_type.clone(),
                    data,
                });
            }
            Ok(PreparedBody::Multipart(prepared))
        }
        other => Ok(PreparedBody::Bytes(prepare_bytes(ctx, other)?)),
    }
}

fn prepare_bytes(ctx: &mut SuiteContext, source: &BodySource) -> Result<Vec<u8>> {
    match source {
        BodySource::Text(text) => Ok(ctx.interpolate(text)?.into_bytes()),
        BodySource::File(name) => read_fixture(&ctx.upload_fixture(name)),
        BodySource::Random { length, save_as } => {
            let payload = random_payload(*length);
            if let Some(name) = save_as {
                ctx.set_var(name.clone(), payload.clone());
            }
            Ok(payload.into_bytes())
        }
        BodySource::Var(name) => Ok(ctx.var(name)?.as_bytes().to_vec()),
        BodySource::Multipart(_) => Err(Error::validation("multipart bodies cannot be nested")),
    }
}
