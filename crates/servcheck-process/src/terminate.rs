//! Process termination primitives.

use servcheck_common::{ProcessError, ProcessResult};

/// Terminate a process gracefully (SIGTERM).
pub fn terminate_gracefully(pid: u32) -> ProcessResult<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
            .map_err(|e| ProcessError::signal(pid.to_string(), format!("SIGTERM: {}", e)))
    }

    #[cfg(not(unix))]
    {
        Err(ProcessError::signal(
            pid.to_string(),
            "graceful termination is only supported on Unix",
        ))
    }
}

/// Force kill a process (SIGKILL).
pub fn force_kill(pid: u32) -> ProcessResult<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        kill(Pid::from_raw(pid as i32), Signal::SIGKILL)
            .map_err(|e| ProcessError::signal(pid.to_string(), format!("SIGKILL: {}", e)))
    }

    #[cfg(not(unix))]
    {
        Err(ProcessError::signal(
            pid.to_string(),
            "force kill by PID is only supported on Unix",
        ))
    }
}
