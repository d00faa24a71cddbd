//! Job-control signals for pause and resume.
#[cfg(unix)]
use crate::ExecError;

/// Suspend the process with `SIGSTOP`.
#[cfg(unix)]
pub fn suspend(pid: u32) -> Result<(), ExecError> {
    send(pid, libc::SIGSTOP)
}

/// Continue a suspended process with `SIGCONT`.
#[cfg(unix)]
pub fn resume(pid: u32) -> Result<(), ExecError> {
    send(pid, libc::SIGCONT)
}

#[cfg(unix)]
fn send(pid: u32, signal: libc::c_int) -> Result<(), ExecError> {
    let raw = libc::pid_t::try_from(pid)
        .map_err(|_| ExecError::InvalidArgument(format!("pid {pid} out of range")))?;

    // SAFETY: kill(2) has no memory-safety preconditions.
    let rc = unsafe { libc::kill(raw, signal) };
    if rc == -1 {
        return Err(ExecError::Signal {
            pid,
            source: std::io::Error::last_os_error(),
        });
    }
    Ok(())
}
