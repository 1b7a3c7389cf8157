//! Append-mode capture of server output.
//!
//! Every run appends to the same file; a marker line separates runs so a
//! failing suite's server output can be found without re-instrumenting.

use chrono::Utc;
use servcheck_common::{ProcessError, ProcessResult};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// Exclusive handle on the server log file for one supervised run.
#[derive(Debug)]
pub struct LogHandle {
    path: PathBuf,
    file: Option<File>,
}

impl LogHandle {
    /// Open (or create) the log file in append mode.
    pub fn open_append(path: &Path) -> ProcessResult<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                ProcessError::logging(
                    path.display().to_string(),
                    format!("Failed to create log directory: {}", e),
                )
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                ProcessError::logging(
                    path.display().to_string(),
                    format!("Failed to open log file: {}", e),
                )
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Write a timestamped harness marker line.
    pub fn write_marker(&mut self, message: &str) -> ProcessResult<()> {
        let id = self.path.display().to_string();
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| ProcessError::logging(id.clone(), "log handle already closed"))?;
        let line = format!(
            "[{}] [servcheck] {}\n",
            Utc::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            message
        );
        file.write_all(line.as_bytes())
            .map_err(|e| ProcessError::logging(id, format!("Failed to write to log file: {}", e)))
    }

    /// Stdio pair (stdout, stderr) that both append to this log.
    pub fn stdio_pair(&self) -> ProcessResult<(Stdio, Stdio)> {
        let file = self.file.as_ref().ok_or_else(|| self.closed_error())?;
        let clone = |f: &File| {
            f.try_clone().map_err(|e| {
                ProcessError::logging(
                    self.path.display().to_string(),
                    format!("Failed to clone log file: {}", e),
                )
            })
        };
        Ok((Stdio::from(clone(file)?), Stdio::from(clone(file)?)))
    }

    /// Flush and release the file. Idempotent.
    pub fn close(&mut self) -> ProcessResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|e| {
                ProcessError::logging(
                    self.path.display().to_string(),
                    format!("Failed to flush log file: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn closed_error(&self) -> ProcessError {
        ProcessError::logging(self.path.display().to_string(), "log handle already closed")
    }
}
