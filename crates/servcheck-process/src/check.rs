//! Process existence checking.

use servcheck_common::ProcessResult;

/// Check if a process with the given PID exists.
///
/// On Unix this uses `kill(pid, 0)`, which delivers no signal but reports
/// whether the target exists. Zombies (exited, not yet reaped) still count
/// as existing.
///
/// # Returns
///
/// * `Ok(true)` - Process exists
/// * `Ok(false)` - Process does not exist
/// * `Err(_)` - The check itself failed
pub fn process_exists(pid: u32) -> ProcessResult<bool> {
    #[cfg(unix)]
    {
        process_exists_unix(pid)
    }

    #[cfg(not(unix))]
    {
        Err(servcheck_common::ProcessError::Configuration {
            id: pid.to_string(),
            reason: "process existence checks are only supported on Unix".to_string(),
        })
    }
}

#[cfg(unix)]
fn process_exists_unix(pid: u32) -> ProcessResult<bool> {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let nix_pid = Pid::from_raw(pid as i32);

    match kill(nix_pid, None) {
        Ok(_) => Ok(true),
        Err(nix::errno::Errno::ESRCH) => Ok(false),
        // Exists, but owned by someone else
        Err(nix::errno::Errno::EPERM) => Ok(true),
        Err(e) => Err(servcheck_common::ProcessError::Configuration {
            id: pid.to_string(),
            reason: format!("Failed to check process: {}", e),
        }),
    }
}
