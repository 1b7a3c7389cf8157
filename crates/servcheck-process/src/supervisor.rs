//! Server supervision with guaranteed teardown.
//!
//! A [`ServerProcess`] owns the child handle and its log. Teardown happens on
//! every path out of a scenario:
//!
//! - explicit [`ServerProcess::stop`] (SIGTERM, graceful wait, force kill, reap)
//! - [`with_server`] calls `stop` after the body returns or panics
//! - `Drop` sends SIGTERM and falls back to a kill if the future holding the
//!   process is cancelled mid-run
//!
//! A server that exits on its own while checks are running is reported as
//! [`ProcessError::ExitedDuringRun`].

use crate::log::LogHandle;
use crate::readiness::{wait_until_ready, ReadinessPolicy};
use crate::terminate::{force_kill, terminate_gracefully};
use crate::validation::validate_executable;
use futures::FutureExt;
use servcheck_common::{ProcessError, ProcessResult};
use servcheck_config::{ReadinessConfig, ServerConfig};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Time allowed for the child to be reaped after SIGKILL.
const FORCE_KILL_TIMEOUT: Duration = Duration::from_secs(2);

/// Upper bound on the blocking wait performed from `Drop`. `Drop` cannot
/// await, so this blocks the current runtime worker; only the cancellation
/// path gets here.
const DROP_GRACE_LIMIT: Duration = Duration::from_millis(500);

const DROP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Knows how to spawn the server binary. Cheap to clone and share across suites.
#[derive(Debug, Clone)]
pub struct ServerLauncher {
    binary: PathBuf,
    working_directory: Option<PathBuf>,
    log_file: PathBuf,
    readiness: ReadinessConfig,
    graceful_timeout: Duration,
}

impl ServerLauncher {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            working_directory: config.working_directory.clone(),
            log_file: config.log_file.clone(),
            readiness: config.readiness.clone(),
            graceful_timeout: config.graceful_timeout,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn log_file(&self) -> &Path {
        &self.log_file
    }

    /// Spawn the server with an optional configuration argument and wait for
    /// it to become ready.
    ///
    /// `probe` is the `host:port` used by the poll readiness policy. If
    /// readiness fails the child is torn down before the error is returned.
    pub async fn start(
        &self,
        config: Option<&Path>,
        probe: Option<&str>,
    ) -> ProcessResult<ServerProcess> {
        let id = self.process_id(config);
        let (child, log) = self.spawn(&id, config)?;
        let pid = child.id().unwrap_or_default();

        info!("Started server {} (PID: {})", id, pid);

        let mut process = ServerProcess {
            id,
            pid,
            child: Some(child),
            log,
            graceful_timeout: self.graceful_timeout,
            exit_code: None,
        };

        let policy = ReadinessPolicy::from_config(&self.readiness, probe);
        let readiness = match process.child.as_mut() {
            Some(child) => wait_until_ready(&process.id, child, &policy).await,
            None => Err(ProcessError::spawn_failed(&process.id, "child handle missing")),
        };

        if let Err(e) = readiness {
            warn!("Server {} failed to become ready: {}", process.id, e);
            match process.stop().await {
                Ok(_) | Err(ProcessError::ExitedDuringRun { .. }) => {}
                Err(stop_err) => {
                    error!("Teardown after failed start of {} failed: {}", process.id, stop_err)
                }
            }
            return Err(e);
        }

        Ok(process)
    }

    /// Run the server until it exits on its own and return its exit code.
    ///
    /// Used for configuration artifacts the server must reject. A process
    /// still alive after `limit` is killed and reported as a timeout.
    pub async fn run_to_exit(&self, config: &Path, limit: Duration) -> ProcessResult<Option<i32>> {
        let id = self.process_id(Some(config));
        let (mut child, mut log) = self.spawn(&id, Some(config))?;

        let status = match timeout(limit, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                let _ = log.close();
                return Err(ProcessError::stop_failed(&id, format!("wait failed: {}", e)));
            }
            Err(_) => {
                warn!("Server {} still running after {:?}, killing it", id, limit);
                if let Err(e) = child.kill().await {
                    error!("Failed to kill {}: {}", id, e);
                }
                let _ = log.write_marker(&format!("killed {} after {:?}", id, limit));
                let _ = log.close();
                return Err(ProcessError::timeout(
                    id,
                    format!("expected exit within {:?}", limit),
                ));
            }
        };

        let code = status.code();
        debug!("Server {} exited with {:?}", id, code);
        log.write_marker(&format!("{} exited ({})", id, describe_status(&status)))?;
        log.close()?;
        Ok(code)
    }

    fn process_id(&self, config: Option<&Path>) -> String {
        match config {
            Some(path) => path.display().to_string(),
            None => format!("{} (default configuration)", self.binary.display()),
        }
    }

    fn spawn(&self, id: &str, config: Option<&Path>) -> ProcessResult<(Child, LogHandle)> {
        validate_executable(&self.binary)?;

        let mut log = LogHandle::open_append(&self.log_file)?;
        log.write_marker(&format!("starting {}", id))?;
        let (stdout, stderr) = log.stdio_pair()?;

        let mut cmd = Command::new(&self.binary);
        if let Some(config) = config {
            cmd.arg(config);
        }
        if let Some(dir) = &self.working_directory {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);

        debug!("Spawning {:?} for {}", self.binary, id);
        let child = cmd.spawn().map_err(|e| {
            let _ = log.write_marker(&format!("spawn failed: {}", e));
            ProcessError::spawn_failed(id, format!("Failed to spawn {}: {}", self.binary.display(), e))
        })?;

        Ok((child, log))
    }
}

/// Identity of a running server, handed to scenario bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub id: String,
    pub pid: u32,
    pub log_path: PathBuf,
}

/// A live server process. Stops itself on drop.
#[derive(Debug)]
pub struct ServerProcess {
    id: String,
    pid: u32,
    child: Option<Child>,
    log: LogHandle,
    graceful_timeout: Duration,
    exit_code: Option<i32>,
}

impl ServerProcess {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            id: self.id.clone(),
            pid: self.pid,
            log_path: self.log.path().to_path_buf(),
        }
    }

    /// True until the process has been observed to exit.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Stop the server: SIGTERM, wait up to the graceful timeout, then force
    /// kill and reap. Returns the exit code if the process exited normally.
    ///
    /// A process found already exited is reaped and reported as
    /// [`ProcessError::ExitedDuringRun`]. Calling `stop` again afterwards is a
    /// no-op.
    pub async fn stop(&mut self) -> ProcessResult<Option<i32>> {
        let Some(mut child) = self.child.take() else {
            return Ok(self.exit_code);
        };

        if let Ok(Some(status)) = child.try_wait() {
            let described = describe_status(&status);
            warn!("Server {} had already exited ({})", self.id, described);
            self.finish(status)?;
            return Err(ProcessError::exited_during_run(&self.id, described));
        }

        info!("Stopping server {} (PID: {})", self.id, self.pid);
        self.send_terminate(&mut child);

        let status = match timeout(self.graceful_timeout, child.wait()).await {
            Ok(Ok(status)) => status,
            Ok(Err(e)) => {
                let _ = self.log.close();
                return Err(ProcessError::stop_failed(&self.id, format!("wait failed: {}", e)));
            }
            Err(_) => {
                warn!(
                    "Graceful shutdown timed out for {} (PID: {}), attempting force kill",
                    self.id, self.pid
                );
                if let Err(e) = child.start_kill() {
                    error!("Force kill failed for {}: {}", self.id, e);
                }
                match timeout(FORCE_KILL_TIMEOUT, child.wait()).await {
                    Ok(Ok(status)) => status,
                    Ok(Err(e)) => {
                        let _ = self.log.close();
                        return Err(ProcessError::stop_failed(
                            &self.id,
                            format!("wait after kill failed: {}", e),
                        ));
                    }
                    Err(_) => {
                        let _ = self.log.close();
                        return Err(ProcessError::timeout(
                            &self.id,
                            format!(
                                "stop (did not exit after graceful timeout {:?} + force-kill timeout {:?})",
                                self.graceful_timeout, FORCE_KILL_TIMEOUT
                            ),
                        ));
                    }
                }
            }
        };

        info!("Server {} stopped ({})", self.id, describe_status(&status));
        self.finish(status)
    }

    fn send_terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        {
            let _ = child;
            if let Err(e) = terminate_gracefully(self.pid) {
                warn!("Failed to send SIGTERM to {}: {}", self.id, e);
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = child.start_kill() {
                warn!("Failed to terminate {}: {}", self.id, e);
            }
        }
    }

    fn finish(&mut self, status: ExitStatus) -> ProcessResult<Option<i32>> {
        self.exit_code = status.code();
        self.log
            .write_marker(&format!("{} stopped ({})", self.id, describe_status(&status)))?;
        self.log.close()?;
        Ok(self.exit_code)
    }
}

impl Drop for ServerProcess {
    fn drop(&mut self) {
        if !self.is_running() {
            return;
        }
        let Some(child) = self.child.as_mut() else {
            return;
        };

        warn!("Server {} dropped while running, tearing down", self.id);

        #[cfg(unix)]
        {
            if terminate_gracefully(self.pid).is_ok() {
                let limit = self.graceful_timeout.min(DROP_GRACE_LIMIT);
                let started = std::time::Instant::now();
                while started.elapsed() < limit {
                    if !matches!(child.try_wait(), Ok(None)) {
                        let _ = self.log.close();
                        return;
                    }
                    std::thread::sleep(DROP_POLL_INTERVAL);
                }
            }
        }

        #[cfg(unix)]
        let killed = force_kill(self.pid).map_err(|e| e.to_string());
        #[cfg(not(unix))]
        let killed = child.start_kill().map_err(|e| e.to_string());
        if let Err(e) = killed {
            error!("Failed to kill {} on drop: {}", self.id, e);
        }
        // Reap if the kill already landed; tokio reaps stragglers otherwise
        let _ = child.try_wait();
        let _ = self.log.close();
    }
}

/// Run `body` against a freshly started server and stop the server afterwards,
/// whether the body returns normally or panics.
///
/// A panic inside the body is converted into [`ProcessError::TaskPanic`] after
/// teardown. A server that exited before `stop` reached it yields
/// [`ProcessError::ExitedDuringRun`]. If the returned future is dropped before
/// completion, the server is torn down by `ServerProcess::drop`.
pub async fn with_server<F, Fut, T>(
    launcher: &ServerLauncher,
    config: Option<&Path>,
    probe: Option<&str>,
    body: F,
) -> ProcessResult<T>
where
    F: FnOnce(ServerInfo) -> Fut,
    Fut: Future<Output = T>,
{
    let mut server = launcher.start(config, probe).await?;
    let outcome = AssertUnwindSafe(body(server.info())).catch_unwind().await;
    let stopped = server.stop().await;

    let output = outcome
        .map_err(|panic| ProcessError::task_panic(server.id(), panic_message(panic.as_ref())))?;

    match stopped {
        Err(e @ ProcessError::ExitedDuringRun { .. }) => Err(e),
        Err(e) => {
            warn!("Failed to stop server {}: {}", server.id(), e);
            Ok(output)
        }
        Ok(_) => Ok(output),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit code {}", code);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("signal {}", signal);
        }
    }

    "unknown status".to_string()
}
