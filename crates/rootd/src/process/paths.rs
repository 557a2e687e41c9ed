//! Derives runtime artefact paths from the socket configuration.
//!
//! The lock and pid files live next to the Unix socket so every artefact of
//! one daemon instance shares a directory. TCP test endpoints fall back to a
//! namespaced directory under the system temp dir.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rootd_config::SocketEndpoint;

use super::errors::LaunchError;

/// Canonical paths for runtime artefacts written by the daemon.
#[derive(Debug, Clone)]
pub(crate) struct ProcessPaths {
    lock_path: PathBuf,
    pid_path: PathBuf,
}

impl ProcessPaths {
    /// Derives artefact paths from the configured endpoint.
    ///
    /// The socket's parent directory must already exist; callers prepare it
    /// before acquiring the process guard.
    pub(crate) fn from_endpoint(endpoint: &SocketEndpoint) -> Result<Self, LaunchError> {
        let runtime_dir = match endpoint {
            SocketEndpoint::Unix { path } => path
                .parent()
                .filter(|parent| !parent.as_str().is_empty())
                .map(|parent| parent.as_std_path().to_path_buf())
                .ok_or_else(|| LaunchError::MissingSocketParent {
                    path: path.to_string(),
                })?,
            SocketEndpoint::Tcp { .. } => {
                let dir = env::temp_dir().join("rootd");
                fs::create_dir_all(&dir).map_err(|source| LaunchError::RuntimeDirectory {
                    path: dir.clone(),
                    source,
                })?;
                dir
            }
        };

        Ok(Self {
            lock_path: runtime_dir.join("rootd.lock"),
            pid_path: runtime_dir.join("rootd.pid"),
        })
    }

    /// Path to the lock file guarding singleton startup.
    pub(crate) fn lock_path(&self) -> &Path {
        self.lock_path.as_path()
    }

    /// Path to the PID file.
    pub(crate) fn pid_path(&self) -> &Path {
        self.pid_path.as_path()
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn artefacts_live_next_to_the_unix_socket() {
        let endpoint = SocketEndpoint::unix("/run/rootd/rootd.sock");
        let paths = ProcessPaths::from_endpoint(&endpoint).expect("derive paths");
        assert_eq!(paths.lock_path(), Path::new("/run/rootd/rootd.lock"));
        assert_eq!(paths.pid_path(), Path::new("/run/rootd/rootd.pid"));
    }

    #[test]
    fn socket_without_parent_is_rejected() {
        let endpoint = SocketEndpoint::unix(Utf8PathBuf::from("rootd.sock"));
        let error = ProcessPaths::from_endpoint(&endpoint).expect_err("no parent");
        assert!(matches!(error, LaunchError::MissingSocketParent { .. }));
    }

    #[test]
    fn tcp_endpoints_fall_back_to_the_temp_dir() {
        let endpoint = SocketEndpoint::tcp("127.0.0.1", 0);
        let paths = ProcessPaths::from_endpoint(&endpoint).expect("derive paths");
        assert!(paths.lock_path().ends_with("rootd/rootd.lock"));
    }
}
