// PID file guarding against two schedulers sharing one output directory

use crate::error::{ReportError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// A PID file owned by this process. Removed on drop.
#[derive(Debug)]
pub struct PidGuard {
    path: PathBuf,
}

impl PidGuard {
    /// Write the current PID to `path`.
    ///
    /// Fails with `AlreadyRunning` if the file names a live process. A stale
    /// file left behind by a dead process is replaced.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(pid) = read_pid(&path) {
            if pid != std::process::id() && is_process_alive(pid) {
                return Err(ReportError::AlreadyRunning(pid));
            }
            tracing::warn!("Replacing stale PID file {} (pid {})", path.display(), pid);
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&path, std::process::id().to_string()).map_err(|e| {
            ReportError::ConfigError(format!("Failed to write PID file {}: {}", path.display(), e))
        })?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidGuard {
    fn drop(&mut self) {
        if read_pid(&self.path) == Some(std::process::id()) {
            if let Err(e) = fs::remove_file(&self.path) {
                tracing::warn!("Failed to remove PID file {}: {}", self.path.display(), e);
            }
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Check if a process with the given PID is alive
#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Signal 0 only checks for existence
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(_) => true,
        Err(nix::errno::Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}
