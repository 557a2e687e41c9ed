//! Singleton guard: lock and pid files for the daemon process.
//!
//! The guard refuses to start a second daemon while one is alive, cleans up
//! artefacts left by a crashed predecessor, and removes its own files on
//! drop so a clean shutdown leaves nothing behind.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::paths::ProcessPaths;

const ARTEFACT_MODE: u32 = 0o600;

#[derive(Debug)]
pub(crate) struct ProcessGuard {
    paths: ProcessPaths,
    _lock: File,
}

impl ProcessGuard {
    /// Acquires the daemon lock, cleaning up after dead predecessors.
    pub(crate) fn acquire(paths: ProcessPaths) -> Result<Self, LaunchError> {
        let lock = acquire_lock(&paths)?;
        Ok(Self {
            paths,
            _lock: lock,
        })
    }

    /// Records the daemon's pid for lifecycle tooling.
    pub(crate) fn write_pid(&self, pid: u32) -> Result<(), LaunchError> {
        let path = self.paths.pid_path();
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(ARTEFACT_MODE)
            .open(path)
            .map_err(|source| LaunchError::PidWrite {
                path: path.to_path_buf(),
                source,
            })?;
        writeln!(file, "{pid}").map_err(|source| LaunchError::PidWrite {
            path: path.to_path_buf(),
            source,
        })?;
        file.sync_all().map_err(|source| LaunchError::PidWrite {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %path.display(),
            "pid file written"
        );
        Ok(())
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        for path in [self.paths.lock_path(), self.paths.pid_path()] {
            match fs::remove_file(path) {
                Err(error) if error.kind() != io::ErrorKind::NotFound => {
                    warn!(
                        target: PROCESS_TARGET,
                        file = %path.display(),
                        error = %error,
                        "failed to remove runtime artefact"
                    );
                }
                _ => {}
            }
        }
    }
}

fn acquire_lock(paths: &ProcessPaths) -> Result<File, LaunchError> {
    match OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(ARTEFACT_MODE)
        .open(paths.lock_path())
    {
        Ok(file) => {
            info!(
                target: PROCESS_TARGET,
                file = %paths.lock_path().display(),
                "acquired daemon lock"
            );
            Ok(file)
        }
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists => handle_existing_lock(paths),
        Err(source) => Err(LaunchError::LockCreate {
            path: paths.lock_path().to_path_buf(),
            source,
        }),
    }
}

fn handle_existing_lock(paths: &ProcessPaths) -> Result<File, LaunchError> {
    if let Some(pid) = read_pid(paths.pid_path())
        && pid != 0
    {
        match probe_process(pid) {
            Ok(true) => {
                info!(
                    target: PROCESS_TARGET,
                    pid,
                    "refusing to start: existing daemon alive"
                );
                return Err(LaunchError::AlreadyRunning { pid });
            }
            Ok(false) => {
                warn!(
                    target: PROCESS_TARGET,
                    pid,
                    "existing daemon not detected; cleaning stale files"
                );
            }
            Err(error) => return Err(error),
        }
    }
    remove_artefact(paths.lock_path())?;
    remove_artefact(paths.pid_path())?;
    acquire_lock(paths)
}

fn read_pid(path: &Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok()
}

fn remove_artefact(path: &Path) -> Result<(), LaunchError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LaunchError::Cleanup {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn probe_process(pid: u32) -> Result<bool, LaunchError> {
    match kill(Pid::from_raw(pid.cast_signed()), None) {
        Ok(()) => Ok(true),
        Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH | Errno::ECHILD) => Ok(false),
        Err(errno) => Err(LaunchError::CheckProcess { pid, source: errno }),
    }
}
