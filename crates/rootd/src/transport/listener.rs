//! Listener implementation for the daemon's control socket.
//!
//! Binding a Unix endpoint removes any stale socket file left by a previous
//! run (after probing that no live daemon is serving on it) and then applies
//! the channel's access control: the socket is restricted to its owner until
//! the configured client group resolves, at which point group ownership is
//! transferred and the mode widened to `0660`. A missing group degrades to
//! owner-only access with a warning rather than failing startup.

use std::fs::{self, Permissions};
use std::io;
use std::net::{SocketAddr, TcpListener, ToSocketAddrs};
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use nix::unistd::{Group, chown};
use tracing::{info, warn};

use rootd_config::SocketEndpoint;

use super::{ConnectionHandler, ConnectionStream, LISTENER_TARGET, ListenerError};

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Socket mode once the client group has been applied.
const GROUP_SOCKET_MODE: u32 = 0o660;
/// Socket mode while no group is applied.
const OWNER_ONLY_SOCKET_MODE: u32 = 0o600;

/// Listener bound to the configured control endpoint.
#[derive(Debug)]
pub(crate) struct SocketListener {
    endpoint: SocketEndpoint,
    listener: ListenerKind,
}

#[derive(Debug)]
enum ListenerKind {
    Unix(UnixListener),
    Tcp(TcpListener),
}

impl SocketListener {
    /// Binds the endpoint and applies access control to Unix sockets.
    pub(crate) fn bind(
        endpoint: &SocketEndpoint,
        client_group: &str,
    ) -> Result<Self, ListenerError> {
        match endpoint {
            SocketEndpoint::Unix { path } => {
                let listener = bind_unix(path.as_std_path())?;
                secure_unix_socket(path.as_std_path(), client_group)?;
                Ok(Self {
                    endpoint: endpoint.clone(),
                    listener: ListenerKind::Unix(listener),
                })
            }
            SocketEndpoint::Tcp { host, port } => {
                let listener = bind_tcp(host, *port)?;
                Ok(Self {
                    endpoint: endpoint.clone(),
                    listener: ListenerKind::Tcp(listener),
                })
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn local_addr(&self) -> Option<SocketAddr> {
        match &self.listener {
            ListenerKind::Tcp(listener) => listener.local_addr().ok(),
            ListenerKind::Unix(_) => None,
        }
    }

    /// Starts the accept loop on a background thread.
    pub(crate) fn start(
        mut self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ListenerHandle, ListenerError> {
        let shutdown = Arc::new(AtomicBool::new(false));
        if let Err(error) = match &self.listener {
            ListenerKind::Unix(listener) => listener.set_nonblocking(true),
            ListenerKind::Tcp(listener) => listener.set_nonblocking(true),
        } {
            cleanup_unix_socket(&self.endpoint);
            return Err(ListenerError::NonBlocking { source: error });
        }
        let shutdown_flag = Arc::clone(&shutdown);
        let handle = thread::spawn(move || run_accept_loop(&mut self, &shutdown_flag, handler));
        Ok(ListenerHandle {
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background listener thread.
pub(crate) struct ListenerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ListenerHandle {
    /// Asks the accept loop to stop taking new connections.
    pub(crate) fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to exit.
    pub(crate) fn join(mut self) -> Result<(), ListenerError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(()) => Ok(()),
                Err(_) => Err(ListenerError::ThreadPanic),
            }
        } else {
            Ok(())
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    listener: &mut SocketListener,
    shutdown: &AtomicBool,
    handler: Arc<dyn ConnectionHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        endpoint = %listener.endpoint,
        "control socket listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(listener) {
            Ok(Some(stream)) => {
                last_error = None;
                let worker = Arc::clone(&handler);
                thread::spawn(move || worker.handle(stream));
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }

    cleanup_unix_socket(&listener.endpoint);
}

fn accept_connection(listener: &mut SocketListener) -> Result<Option<ConnectionStream>, io::Error> {
    match &listener.listener {
        ListenerKind::Unix(unix) => match unix.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(ConnectionStream::Unix(stream)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        },
        ListenerKind::Tcp(tcp) => match tcp.accept() {
            Ok((stream, _)) => {
                stream.set_nonblocking(false)?;
                Ok(Some(ConnectionStream::Tcp(stream)))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(error),
        },
    }
}

fn bind_tcp(host: &str, port: u16) -> Result<TcpListener, ListenerError> {
    let mut addrs = (host, port)
        .to_socket_addrs()
        .map_err(|source| ListenerError::Resolve {
            host: host.to_owned(),
            port,
            source,
        })?;
    let addr = addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| ListenerError::ResolveEmpty {
            host: host.to_owned(),
            port,
        })?;
    TcpListener::bind(addr).map_err(|source| ListenerError::BindTcp { addr, source })
}

fn bind_unix(path: &Path) -> Result<UnixListener, ListenerError> {
    if path.exists() {
        let metadata =
            fs::symlink_metadata(path).map_err(|source| ListenerError::UnixMetadata {
                path: path.display().to_string(),
                source,
            })?;
        if !metadata.file_type().is_socket() {
            return Err(ListenerError::UnixNotSocket {
                path: path.display().to_string(),
            });
        }
        match UnixStream::connect(path) {
            Ok(_stream) => {
                return Err(ListenerError::UnixInUse {
                    path: path.display().to_string(),
                });
            }
            Err(error)
                if error.kind() == io::ErrorKind::ConnectionRefused
                    || error.kind() == io::ErrorKind::NotFound =>
            {
                warn!(
                    target: LISTENER_TARGET,
                    path = %path.display(),
                    "removing stale socket from a previous run"
                );
                fs::remove_file(path).map_err(|source| ListenerError::UnixCleanup {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            Err(error) => {
                return Err(ListenerError::UnixConnect {
                    path: path.display().to_string(),
                    source: error,
                });
            }
        }
    }

    UnixListener::bind(path).map_err(|source| ListenerError::BindUnix {
        path: path.display().to_string(),
        source,
    })
}

/// Applies the channel's filesystem access control.
///
/// The socket starts owner-only. When the configured client group resolves,
/// group ownership is transferred and the mode widened to `0660`; any
/// failure along the way leaves the socket owner-only and logs a warning so
/// the daemon still starts.
fn secure_unix_socket(path: &Path, client_group: &str) -> Result<(), ListenerError> {
    set_socket_mode(path, OWNER_ONLY_SOCKET_MODE)?;

    match Group::from_name(client_group) {
        Ok(Some(group)) => {
            if let Err(errno) = chown(path, None, Some(group.gid)) {
                warn!(
                    target: LISTENER_TARGET,
                    group = client_group,
                    error = %errno,
                    "failed to set socket group; socket restricted to owner"
                );
                return Ok(());
            }
            set_socket_mode(path, GROUP_SOCKET_MODE)?;
            info!(
                target: LISTENER_TARGET,
                group = client_group,
                "control socket opened to client group"
            );
        }
        Ok(None) => {
            warn!(
                target: LISTENER_TARGET,
                group = client_group,
                "client group does not exist; socket restricted to owner"
            );
        }
        Err(errno) => {
            warn!(
                target: LISTENER_TARGET,
                group = client_group,
                error = %errno,
                "failed to look up client group; socket restricted to owner"
            );
        }
    }
    Ok(())
}

fn set_socket_mode(path: &Path, mode: u32) -> Result<(), ListenerError> {
    fs::set_permissions(path, Permissions::from_mode(mode)).map_err(|source| {
        ListenerError::SocketPermissions {
            path: path.display().to_string(),
            source,
        }
    })
}

fn cleanup_unix_socket(endpoint: &SocketEndpoint) {
    let SocketEndpoint::Unix { path } = endpoint else {
        return;
    };
    if let Err(error) = fs::remove_file(path.as_std_path())
        && error.kind() != io::ErrorKind::NotFound
    {
        warn!(
            target: LISTENER_TARGET,
            error = %error,
            path = %path,
            "failed to remove socket file"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    use camino::Utf8PathBuf;

    use super::*;

    /// Group name chosen to be absent from any sane test environment.
    const MISSING_GROUP: &str = "rootd-test-no-such-group";

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ConnectionHandler for CountingHandler {
        fn handle(&self, _stream: ConnectionStream) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn unix_endpoint(dir: &tempfile::TempDir) -> (SocketEndpoint, std::path::PathBuf) {
        let path = dir.path().join("rootd.sock");
        let endpoint = SocketEndpoint::unix(
            Utf8PathBuf::from_path_buf(path.clone()).expect("utf8 socket path"),
        );
        (endpoint, path)
    }

    fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if count.load(Ordering::SeqCst) >= expected {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn unix_listener_accepts_connections() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (endpoint, path) = unix_endpoint(&dir);
        let listener = SocketListener::bind(&endpoint, MISSING_GROUP).expect("bind listener");
        let count = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(CountingHandler {
            count: Arc::clone(&count),
        });
        let handle = listener.start(handler).expect("start listener");

        UnixStream::connect(&path).expect("connect first client");
        UnixStream::connect(&path).expect("connect second client");

        assert!(wait_for_count(&count, 2), "expected two connections");
        handle.shutdown();
        handle.join().expect("join listener");
    }

    #[test]
    fn missing_group_restricts_socket_to_owner() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (endpoint, path) = unix_endpoint(&dir);
        let _listener = SocketListener::bind(&endpoint, MISSING_GROUP).expect("bind listener");

        let mode = fs::metadata(&path).expect("socket metadata").permissions();
        assert_eq!(mode.mode() & 0o777, OWNER_ONLY_SOCKET_MODE);
    }

    #[test]
    fn resolving_group_widens_socket_mode() {
        // The process's own effective group is always safe to chown to.
        let Ok(Some(own_group)) = Group::from_gid(nix::unistd::getegid()) else {
            return;
        };

        let dir = tempfile::tempdir().expect("temp dir");
        let (endpoint, path) = unix_endpoint(&dir);
        let _listener = SocketListener::bind(&endpoint, &own_group.name).expect("bind listener");

        let mode = fs::metadata(&path).expect("socket metadata").permissions();
        assert_eq!(mode.mode() & 0o777, GROUP_SOCKET_MODE);
    }

    #[test]
    fn stale_socket_files_are_removed_before_binding() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (endpoint, path) = unix_endpoint(&dir);
        {
            let _stale = UnixListener::bind(&path).expect("bind stale listener");
        }
        assert!(path.exists(), "stale socket should remain");

        let listener = SocketListener::bind(&endpoint, MISSING_GROUP).expect("bind new listener");
        let count = Arc::new(AtomicUsize::new(0));
        let handle = listener
            .start(Arc::new(CountingHandler {
                count: Arc::clone(&count),
            }))
            .expect("start listener");

        UnixStream::connect(&path).expect("connect client");

        handle.shutdown();
        handle.join().expect("join listener");
        assert!(!path.exists(), "socket removed on shutdown");
    }

    #[test]
    fn live_socket_is_not_stolen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (endpoint, path) = unix_endpoint(&dir);
        let _existing = UnixListener::bind(&path).expect("bind existing listener");

        let error = SocketListener::bind(&endpoint, MISSING_GROUP).expect_err("should fail bind");
        assert!(matches!(error, ListenerError::UnixInUse { .. }));
    }

    #[test]
    fn non_socket_path_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let (endpoint, path) = unix_endpoint(&dir);
        fs::write(&path, b"not a socket").expect("write file");

        let error = SocketListener::bind(&endpoint, MISSING_GROUP).expect_err("should fail bind");
        assert!(matches!(error, ListenerError::UnixNotSocket { .. }));
    }

    #[test]
    fn tcp_listener_accepts_connections() {
        let endpoint = SocketEndpoint::tcp("127.0.0.1", 0);
        let listener = SocketListener::bind(&endpoint, MISSING_GROUP).expect("bind tcp listener");
        let addr = listener.local_addr().expect("local address");
        let count = Arc::new(AtomicUsize::new(0));
        let handle = listener
            .start(Arc::new(CountingHandler {
                count: Arc::clone(&count),
            }))
            .expect("start listener");

        std::net::TcpStream::connect(addr).expect("connect client");

        assert!(wait_for_count(&count, 1), "expected one connection");
        handle.shutdown();
        handle.join().expect("join listener");
    }
}
