//! Suite file discovery and parsing.

use crate::model::{BodySource, Suite};
use servcheck_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Load suites from a single YAML file or every `.yaml`/`.yml` file in a
/// directory, in file-name order.
///
/// When two files declare the same suite name the later one wins and the
/// superseded definition is logged.
pub fn load_suites(path: &Path) -> Result<Vec<Suite>> {
    let files = if path.is_dir() {
        suite_files(path)?
    } else if path.is_file() {
        vec![path.to_path_buf()]
    } else {
        return Err(Error::not_found(format!("suite path {}", path.display())));
    };

    let mut suites: Vec<Suite> = Vec::new();
    for file in files {
        let suite = load_suite_file(&file)?;
        if let Some(pos) = suites.iter().position(|s| s.name == suite.name) {
            let previous = suites.remove(pos);
            warn!(
                "Suite '{}' from {} supersedes the definition in {}",
                suite.name,
                file.display(),
                previous
                    .origin
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        }
        suites.push(suite);
    }

    debug!("Loaded {} suite(s) from {}", suites.len(), path.display());
    Ok(suites)
}

/// Parse and validate one suite file.
pub fn load_suite_file(path: &Path) -> Result<Suite> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::config(path.display().to_string(), e.to_string()))?;
    let mut suite = parse_suite(&content).map_err(|e| match e {
        Error::Validation { message } => Error::config(path.display().to_string(), message),
        other => other,
    })?;
    suite.origin = Some(path.to_path_buf());
    Ok(suite)
}

/// Parse and validate a suite from YAML text.
pub fn parse_suite(content: &str) -> Result<Suite> {
    let suite: Suite =
        serde_yaml::from_str(content).map_err(|e| Error::validation(e.to_string()))?;
    validate_suite(&suite)?;
    Ok(suite)
}

fn validate_suite(suite: &Suite) -> Result<()> {
    if suite.name.as_str().trim().is_empty() {
        return Err(Error::validation("suite name cannot be empty"));
    }
    if suite.config.as_os_str().is_empty() {
        return Err(Error::validation(format!(
            "suite '{}': config path cannot be empty",
            suite.name
        )));
    }
    if !suite.base_url.starts_with("http://") && !suite.base_url.starts_with("https://") {
        return Err(Error::validation(format!(
            "suite '{}': base_url must start with http:// or https://",
            suite.name
        )));
    }
    if suite.scenarios.is_empty() {
        warn!("Suite '{}' declares no scenarios", suite.name);
    }

    for scenario in &suite.scenarios {
        if scenario.name.trim().is_empty() {
            return Err(Error::validation(format!(
                "suite '{}': scenario name cannot be empty",
                suite.name
            )));
        }
        if let Some(BodySource::Multipart(parts)) = &scenario.request.body {
            if parts
                .iter()
                .any(|p| matches!(p.body, BodySource::Multipart(_)))
            {
                return Err(Error::validation(format!(
                    "suite '{}', scenario '{}': multipart parts cannot be multipart",
                    suite.name, scenario.name
                )));
            }
        }
    }

    Ok(())
}

fn suite_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            )
        })
        .collect();
    files.sort();
    Ok(files)
}
