//! End-to-end test support for servcheck.
//!
//! Tests drive the harness crates and the `servcheck` binary against the
//! `mockserv` server double and the `mocksiege` benchmark double. All three
//! binaries must be built before the tests run (`cargo build --workspace`).

pub mod assertions;
pub mod cli;
pub mod workspace;

pub use cli::ServcheckRun;
pub use workspace::{free_port, TestWorkspace};

use std::env;
use std::path::PathBuf;

/// Path of a workspace binary next to the running test executable.
pub fn binary_path(name: &str) -> PathBuf {
    let mut path = env::current_exe()
        .expect("Failed to get current exe path")
        .parent()
        .expect("Failed to get parent dir")
        .to_path_buf();

    // If we're in deps/, go up one level
    if path.ends_with("deps") {
        path.pop();
    }

    path.push(format!("{}{}", name, env::consts::EXE_SUFFIX));

    if !path.exists() {
        panic!("{} binary not found at: {}", name, path.display());
    }

    path
}

pub fn servcheck_path() -> PathBuf {
    binary_path("servcheck")
}

pub fn mockserv_path() -> PathBuf {
    binary_path("mockserv")
}

pub fn mocksiege_path() -> PathBuf {
    binary_path("mocksiege")
}
