use crate::socket::SocketEndpoint;

/// Default Unix socket path for the control channel.
pub const DEFAULT_SOCKET_PATH: &str = "/run/rootd/rootd.sock";

/// Default group authorised to connect to the control socket.
pub const DEFAULT_CLIENT_GROUP: &str = "rootd";

/// Default log filter expression for the daemon.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Computes the default socket endpoint for the daemon.
#[must_use]
pub fn default_socket_endpoint() -> SocketEndpoint {
    SocketEndpoint::unix(DEFAULT_SOCKET_PATH)
}

/// Module names enabled when no allow-list is configured.
#[must_use]
pub fn default_modules() -> Vec<String> {
    vec![String::from("systeminfo"), String::from("firewalld")]
}
