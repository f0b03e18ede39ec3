//! Service process ownership.
//!
//! [`ProcessManager`] is the only component that spawns, signals and reaps
//! the service under test. Termination is graceful first (SIGTERM), then
//! forced after a grace period, and always ends with a reap so the database
//! file is no longer held open when artifacts are removed.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};

use gauntlet_core::config::TestConfiguration;
use gauntlet_core::error::LaunchError;
use gauntlet_core::types::ProcessState;

/// Handle to a spawned service instance.
#[derive(Debug)]
pub struct ServiceHandle {
    child: Child,
    pid: u32,
    state: ProcessState,
    exit_status: Option<ExitStatus>,
}

impl ServiceHandle {
    /// OS process identifier.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProcessState {
        self.state
    }

    fn mark_terminated(&mut self, status: Option<ExitStatus>) {
        self.state = ProcessState::Terminated;
        self.exit_status = status;
    }
}

/// Owns at most one service process for the duration of a run.
#[derive(Debug)]
pub struct ProcessManager {
    handle: Option<ServiceHandle>,
    grace_period: Duration,
}

impl ProcessManager {
    /// Create a manager with no process yet.
    pub fn new(grace_period: Duration) -> Self {
        Self {
            handle: None,
            grace_period,
        }
    }

    /// Spawn the configured binary with arguments derived from `config`.
    ///
    /// Returns as soon as the OS accepted the spawn; readiness is checked
    /// separately by the poller.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::Spawn` if the binary cannot be executed.
    pub fn start(&mut self, config: &TestConfiguration) -> Result<u32, LaunchError> {
        self.start_binary(&config.service.binary_path, &config.launch_args())
    }

    /// Spawn `binary` with explicit arguments.
    pub fn start_binary(&mut self, binary: &Path, args: &[String]) -> Result<u32, LaunchError> {
        if let Some(handle) = &self.handle {
            if handle.state == ProcessState::Running {
                return Err(LaunchError::Spawn {
                    binary: binary.display().to_string(),
                    reason: format!("service already running with pid {}", handle.pid),
                });
            }
        }

        let program = resolve_program(binary);
        tracing::info!(binary = %program.display(), args = ?args, "starting service");

        let child = Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| LaunchError::Spawn {
                binary: program.display().to_string(),
                reason: e.to_string(),
            })?;

        let pid = child.id().ok_or_else(|| LaunchError::Spawn {
            binary: program.display().to_string(),
            reason: "process exited before its pid could be read".to_owned(),
        })?;

        tracing::info!(pid = pid, "service spawned");
        self.handle = Some(ServiceHandle {
            child,
            pid,
            state: ProcessState::Running,
            exit_status: None,
        });
        Ok(pid)
    }

    /// Pid of the current or last process, if one was started.
    pub fn pid(&self) -> Option<u32> {
        self.handle.as_ref().map(ServiceHandle::pid)
    }

    /// Lifecycle state; `NotStarted` when no process was ever spawned.
    pub fn state(&self) -> ProcessState {
        self.handle
            .as_ref()
            .map_or(ProcessState::NotStarted, ServiceHandle::state)
    }

    /// Non-blocking check that the service is still alive.
    ///
    /// A process that exited on its own is reaped here and transitions to
    /// `Terminated`. Having no process at all is not an error.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::ExitedEarly` if the process is no longer running.
    pub fn check_running(&mut self) -> Result<(), LaunchError> {
        let Some(handle) = self.handle.as_mut() else {
            return Ok(());
        };

        match handle.state {
            ProcessState::NotStarted => Ok(()),
            ProcessState::Terminated => Err(LaunchError::ExitedEarly {
                status: describe(handle.exit_status),
            }),
            ProcessState::Running => match handle.child.try_wait() {
                Ok(None) => Ok(()),
                Ok(Some(status)) => {
                    tracing::warn!(pid = handle.pid, status = %status, "service exited on its own");
                    handle.mark_terminated(Some(status));
                    Err(LaunchError::ExitedEarly {
                        status: status.to_string(),
                    })
                }
                Err(e) => {
                    tracing::warn!(pid = handle.pid, error = %e, "failed to poll service status");
                    Ok(())
                }
            },
        }
    }

    /// Terminate and reap the service.
    ///
    /// Sends SIGTERM, waits up to the grace period, then kills. Safe to call
    /// with no process, with a process that already exited, or repeatedly.
    pub async fn terminate(&mut self) -> Option<ExitStatus> {
        let grace = self.grace_period;
        let handle = self.handle.as_mut()?;

        if handle.state != ProcessState::Running {
            return handle.exit_status;
        }

        if let Ok(Some(status)) = handle.child.try_wait() {
            tracing::info!(pid = handle.pid, status = %status, "service had already exited");
            handle.mark_terminated(Some(status));
            return Some(status);
        }

        tracing::info!(pid = handle.pid, "terminating service");
        request_graceful_stop(handle.pid);

        let status = match tokio::time::timeout(grace, handle.child.wait()).await {
            Ok(Ok(status)) => Some(status),
            Ok(Err(e)) => {
                tracing::warn!(pid = handle.pid, error = %e, "failed to wait for service");
                force_kill(&mut handle.child, handle.pid).await
            }
            Err(_) => {
                tracing::warn!(
                    pid = handle.pid,
                    grace_ms = grace.as_millis() as u64,
                    "service ignored graceful stop, killing"
                );
                force_kill(&mut handle.child, handle.pid).await
            }
        };

        match status {
            Some(s) => tracing::info!(pid = handle.pid, status = %s, "service reaped"),
            None => tracing::error!(pid = handle.pid, "service could not be reaped"),
        }
        handle.mark_terminated(status);
        status
    }
}

/// Relative binaries are resolved against the working directory so a bare
/// file name is never looked up on `PATH`.
fn resolve_program(binary: &Path) -> PathBuf {
    if binary.is_absolute() {
        return binary.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(binary),
        Err(_) => binary.to_path_buf(),
    }
}

fn describe(status: Option<ExitStatus>) -> String {
    status.map_or_else(|| "unknown status".to_owned(), |s| s.to_string())
}

#[cfg(unix)]
fn request_graceful_stop(pid: u32) {
    // SAFETY: kill(2) only sends a signal to the pid we spawned and still own.
    let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        tracing::debug!(pid = pid, error = %err, "SIGTERM not delivered");
    }
}

#[cfg(not(unix))]
fn request_graceful_stop(pid: u32) {
    tracing::debug!(pid = pid, "graceful stop not supported on this platform");
}

async fn force_kill(child: &mut Child, pid: u32) -> Option<ExitStatus> {
    if let Err(e) = child.kill().await {
        tracing::error!(pid = pid, error = %e, "failed to kill service");
    }
    child.try_wait().ok().flatten()
}
