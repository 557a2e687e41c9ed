//! Socket endpoint configuration for the daemon's control channel.

use std::fmt;
use std::fs::DirBuilder;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Directory mode applied when creating the socket's parent directory.
///
/// Owner and group only; the socket file itself carries its own, stricter
/// access control applied by the listener after binding.
pub const SOCKET_DIR_MODE: u32 = 0o750;

/// Declarative configuration for the daemon's control socket.
///
/// The production transport is a Unix domain socket addressed by filesystem
/// path; TCP endpoints exist for test harnesses on platforms without Unix
/// socket support and carry no filesystem access control.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum SocketEndpoint {
    /// Unix domain socket endpoint.
    Unix {
        /// Filesystem path of the socket.
        path: Utf8PathBuf,
    },
    /// TCP socket endpoint.
    Tcp {
        /// Host name or address to bind.
        host: String,
        /// Port to bind.
        port: u16,
    },
}

impl SocketEndpoint {
    /// Builds a Unix domain socket endpoint.
    #[must_use]
    pub fn unix(path: impl Into<Utf8PathBuf>) -> Self {
        Self::Unix { path: path.into() }
    }

    /// Builds a TCP socket endpoint.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Returns the Unix socket path when the endpoint uses the Unix transport.
    #[must_use]
    pub fn unix_path(&self) -> Option<&Utf8Path> {
        match self {
            Self::Unix { path } => Some(path.as_ref()),
            Self::Tcp { .. } => None,
        }
    }

    /// Ensures the socket's parent directory exists with restrictive permissions.
    ///
    /// # Errors
    ///
    /// Returns [`SocketPreparationError`] when the path has no parent or the
    /// directory cannot be created.
    pub fn prepare_filesystem(&self) -> Result<(), SocketPreparationError> {
        let Some(path) = self.unix_path() else {
            return Ok(());
        };
        let Some(parent) = path.parent() else {
            return Err(SocketPreparationError::MissingParent {
                path: path.to_path_buf(),
            });
        };

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(SOCKET_DIR_MODE);
        }

        if let Err(source) = builder.create(parent.as_std_path())
            && source.kind() != std::io::ErrorKind::AlreadyExists
        {
            return Err(SocketPreparationError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            });
        }

        Ok(())
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix { path } => write!(formatter, "unix://{path}"),
            Self::Tcp { host, port } => write!(formatter, "tcp://{host}:{port}"),
        }
    }
}

impl FromStr for SocketEndpoint {
    type Err = SocketParseError;

    /// Parses `unix://<path>`, `tcp://<host>:<port>`, or a bare absolute
    /// path (treated as a Unix endpoint for operator convenience).
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        if input.starts_with('/') {
            return Ok(Self::unix(input));
        }
        let url = Url::parse(input)?;
        match url.scheme() {
            "unix" => {
                let path = url.path();
                if path.is_empty() {
                    return Err(SocketParseError::MissingUnixPath(input.to_owned()));
                }
                Ok(Self::unix(path))
            }
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| SocketParseError::MissingHost(input.to_owned()))?;
                let port = url
                    .port()
                    .ok_or_else(|| SocketParseError::MissingPort(input.to_owned()))?;
                Ok(Self::tcp(host, port))
            }
            other => Err(SocketParseError::UnsupportedScheme(other.to_owned())),
        }
    }
}

/// Errors encountered while parsing a [`SocketEndpoint`] from text.
#[derive(Debug, Error)]
pub enum SocketParseError {
    /// Scheme was not recognised.
    #[error("unsupported socket scheme '{0}'")]
    UnsupportedScheme(String),
    /// TCP host name was missing.
    #[error("missing TCP host in '{0}'")]
    MissingHost(String),
    /// TCP port was missing from the address.
    #[error("missing TCP port in '{0}'")]
    MissingPort(String),
    /// Unix socket path was absent.
    #[error("missing Unix socket path in '{0}'")]
    MissingUnixPath(String),
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}

/// Errors raised when preparing socket directories.
#[derive(Debug, Error)]
pub enum SocketPreparationError {
    /// Parent directory is missing when creating a Unix socket path.
    #[error("socket path '{path}' has no parent directory")]
    MissingParent {
        /// Configured socket path.
        path: Utf8PathBuf,
    },
    /// Failed to create the socket directory.
    #[error("failed to create socket directory '{path}': {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unix_socket() {
        let endpoint = SocketEndpoint::unix(Utf8PathBuf::from("/run/rootd/rootd.sock"));
        assert_eq!(endpoint.to_string(), "unix:///run/rootd/rootd.sock");
    }

    #[test]
    fn parse_unix_scheme() {
        let endpoint: SocketEndpoint = "unix:///run/rootd/rootd.sock".parse().unwrap();
        assert_eq!(
            endpoint.unix_path().map(Utf8Path::as_str),
            Some("/run/rootd/rootd.sock")
        );
    }

    #[test]
    fn parse_bare_path_as_unix() {
        let endpoint: SocketEndpoint = "/tmp/rootd.sock".parse().unwrap();
        assert!(matches!(endpoint, SocketEndpoint::Unix { .. }));
    }

    #[test]
    fn parse_tcp_socket() {
        let endpoint: SocketEndpoint = "tcp://127.0.0.1:9000".parse().unwrap();
        assert!(matches!(endpoint, SocketEndpoint::Tcp { port: 9000, .. }));
    }

    #[test]
    fn parse_rejects_unknown_scheme() {
        let error = "http://example.com".parse::<SocketEndpoint>().unwrap_err();
        assert!(matches!(error, SocketParseError::UnsupportedScheme(_)));
    }

    #[test]
    fn prepare_filesystem_creates_parent_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let socket_path = dir.path().join("nested/rootd.sock");
        let endpoint = SocketEndpoint::unix(
            Utf8PathBuf::from_path_buf(socket_path.clone()).expect("utf8 path"),
        );
        endpoint.prepare_filesystem().expect("prepare");
        assert!(socket_path.parent().expect("parent").is_dir());
    }

    #[test]
    fn prepare_filesystem_ignores_tcp_endpoints() {
        let endpoint = SocketEndpoint::tcp("127.0.0.1", 9000);
        endpoint.prepare_filesystem().expect("tcp is a no-op");
    }
}
