//! Validation of executables before spawning.

use servcheck_common::{ProcessError, ProcessResult};
use std::path::Path;

/// Validate that an executable path is usable.
///
/// Bare names (`siege`) are resolved through `PATH` at spawn time and only
/// checked for emptiness. Paths with a directory component must point at an
/// existing regular file, executable on Unix.
pub fn validate_executable(path: &Path) -> ProcessResult<()> {
    let display = path.display().to_string();

    if path.as_os_str().is_empty() {
        return Err(ProcessError::Configuration {
            id: "validation".to_string(),
            reason: "Executable path cannot be empty".to_string(),
        });
    }

    if path.components().count() == 1 {
        return Ok(());
    }

    let metadata = std::fs::metadata(path).map_err(|e| {
        ProcessError::spawn_failed(display.clone(), format!("cannot access executable: {}", e))
    })?;

    if !metadata.is_file() {
        return Err(ProcessError::spawn_failed(display, "not a regular file"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(ProcessError::spawn_failed(display, "file is not executable"));
        }
    }

    Ok(())
}
