//! Runs the `servcheck` binary as a child process.

use crate::servcheck_path;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Finished CLI invocation.
#[derive(Debug)]
pub struct ServcheckRun {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ServcheckRun {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last non-empty stdout line; the summary headline.
    pub fn headline(&self) -> &str {
        self.stdout
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("")
    }
}

/// Start `servcheck` in `cwd` with piped output. Logging is limited to
/// warnings so the pipes cannot fill up before the run ends.
pub fn spawn_servcheck(cwd: &Path, args: &[&str]) -> Child {
    println!("Starting servcheck {:?} in {}", args, cwd.display());
    Command::new(servcheck_path())
        .args(args)
        .env("RUST_LOG", "warn")
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn servcheck")
}

/// Wait for a spawned run, killing it after `timeout`.
pub fn finish(mut child: Child, timeout: Duration) -> ServcheckRun {
    let status = match child.wait_timeout(timeout).expect("Error waiting for servcheck") {
        Some(status) => status,
        None => {
            println!("servcheck did not exit in time, forcing kill");
            child.kill().ok();
            child.wait().expect("Failed to reap servcheck")
        }
    };

    let mut stdout = String::new();
    if let Some(mut s) = child.stdout.take() {
        s.read_to_string(&mut stdout).ok();
    }
    let mut stderr = String::new();
    if let Some(mut s) = child.stderr.take() {
        s.read_to_string(&mut stderr).ok();
    }

    println!("servcheck exited with {:?}\n{}", status.code(), stdout);
    ServcheckRun {
        exit_code: status.code(),
        stdout,
        stderr,
    }
}

/// Run `servcheck` to completion.
pub fn run_servcheck(cwd: &Path, args: &[&str], timeout: Duration) -> ServcheckRun {
    finish(spawn_servcheck(cwd, args), timeout)
}

/// Deliver SIGINT to a running `servcheck`.
#[cfg(unix)]
pub fn interrupt(child: &Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(child.id() as i32), Signal::SIGINT).expect("Failed to send SIGINT");
}
