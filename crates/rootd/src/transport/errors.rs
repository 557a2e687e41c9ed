//! Error types for listener setup and operation.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Errors raised while binding or running the socket listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Resolving a TCP host name failed.
    #[error("failed to resolve {host}:{port}: {source}")]
    Resolve {
        /// Host that failed to resolve.
        host: String,
        /// Requested port.
        port: u16,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A TCP host name resolved to no usable address.
    #[error("no usable address for {host}:{port}")]
    ResolveEmpty {
        /// Host that resolved to nothing.
        host: String,
        /// Requested port.
        port: u16,
    },
    /// Binding the TCP listener failed.
    #[error("failed to bind tcp listener on {addr}: {source}")]
    BindTcp {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Binding the Unix listener failed.
    #[error("failed to bind unix socket '{path}': {source}")]
    BindUnix {
        /// Socket path that could not be bound.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Inspecting an existing socket path failed.
    #[error("failed to inspect socket path '{path}': {source}")]
    UnixMetadata {
        /// Path that could not be inspected.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The socket path exists but is not a socket.
    #[error("path '{path}' exists and is not a socket")]
    UnixNotSocket {
        /// Offending path.
        path: String,
    },
    /// Another daemon is already serving on the socket.
    #[error("socket '{path}' is already in use")]
    UnixInUse {
        /// Contested socket path.
        path: String,
    },
    /// Probing an existing socket failed.
    #[error("failed to probe existing socket '{path}': {source}")]
    UnixConnect {
        /// Probed socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Removing a stale socket file failed.
    #[error("failed to remove stale socket '{path}': {source}")]
    UnixCleanup {
        /// Stale socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Restricting the socket's permissions failed.
    #[error("failed to set permissions on socket '{path}': {source}")]
    SocketPermissions {
        /// Socket path.
        path: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Switching the listener to non-blocking mode failed.
    #[error("failed to configure non-blocking accept: {source}")]
    NonBlocking {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The accept-loop thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
