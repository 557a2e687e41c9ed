//! Declarative configuration for the rootd daemon.
//!
//! Configuration is resolved in three layers: compiled-in defaults, then
//! `ROOTD_*` environment variables, then command-line flags applied by the
//! daemon binary. The crate owns the value types (socket endpoint, log
//! settings, the authorised client group, and the enabled-module allow-list)
//! and the environment layer; flag handling lives with the binary's CLI.

mod defaults;
mod logging;
mod socket;

use std::env;
use std::ffi::OsString;
use std::str::FromStr;

use thiserror::Error;

pub use crate::defaults::{
    DEFAULT_CLIENT_GROUP, DEFAULT_LOG_FILTER, DEFAULT_SOCKET_PATH, default_modules,
    default_socket_endpoint,
};
pub use crate::logging::{LogFormat, LogFormatParseError};
pub use crate::socket::{
    SOCKET_DIR_MODE, SocketEndpoint, SocketParseError, SocketPreparationError,
};

/// Environment variable naming the control socket endpoint.
pub const ENV_SOCKET: &str = "ROOTD_SOCKET";
/// Environment variable naming the authorised client group.
pub const ENV_CLIENT_GROUP: &str = "ROOTD_CLIENT_GROUP";
/// Environment variable holding the comma-separated module allow-list.
pub const ENV_MODULES: &str = "ROOTD_MODULES";
/// Environment variable holding the log filter expression.
pub const ENV_LOG_FILTER: &str = "ROOTD_LOG_FILTER";
/// Environment variable selecting the log output format.
pub const ENV_LOG_FORMAT: &str = "ROOTD_LOG_FORMAT";

/// Resolved daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Control channel endpoint.
    pub socket: SocketEndpoint,
    /// Group whose members may connect to the control socket.
    pub client_group: String,
    /// Names of the modules to register at startup.
    pub modules: Vec<String>,
    /// Log filter expression in `tracing` `EnvFilter` syntax.
    pub log_filter: String,
    /// Log output format.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            socket: default_socket_endpoint(),
            client_group: String::from(DEFAULT_CLIENT_GROUP),
            modules: default_modules(),
            log_filter: String::from(DEFAULT_LOG_FILTER),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the process environment over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var_os(name))
    }

    /// Loads configuration from an arbitrary variable lookup.
    ///
    /// Extracted from [`Config::from_env`] so tests can inject variables
    /// without mutating process-global state.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a variable is present but invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let mut config = Self::default();

        if let Some(value) = read_var(&lookup, ENV_SOCKET)? {
            config.socket =
                SocketEndpoint::from_str(&value).map_err(|source| ConfigError::InvalidSocket {
                    value,
                    source,
                })?;
        }
        if let Some(value) = read_var(&lookup, ENV_CLIENT_GROUP)? {
            config.client_group = value;
        }
        if let Some(value) = read_var(&lookup, ENV_MODULES)? {
            config.modules = parse_module_list(&value);
        }
        if let Some(value) = read_var(&lookup, ENV_LOG_FILTER)? {
            config.log_filter = value;
        }
        if let Some(value) = read_var(&lookup, ENV_LOG_FORMAT)? {
            config.log_format =
                LogFormat::from_str(&value).map_err(|_| ConfigError::InvalidLogFormat { value })?;
        }

        Ok(config)
    }
}

/// Splits a comma-separated module list, dropping empty segments.
#[must_use]
pub fn parse_module_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}

fn read_var<F>(lookup: &F, name: &'static str) -> Result<Option<String>, ConfigError>
where
    F: Fn(&str) -> Option<OsString>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .into_string()
            .map(Some)
            .map_err(|_| ConfigError::NotUnicode { name }),
    }
}

/// Errors raised while resolving configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Socket endpoint value could not be parsed.
    #[error("invalid socket endpoint '{value}': {source}")]
    InvalidSocket {
        /// Offending value.
        value: String,
        /// Underlying parse error.
        #[source]
        source: SocketParseError,
    },
    /// Log format value was not recognised.
    #[error("invalid log format '{value}' (expected 'json' or 'compact')")]
    InvalidLogFormat {
        /// Offending value.
        value: String,
    },
    /// An environment variable held non-UTF-8 data.
    #[error("environment variable {name} is not valid unicode")]
    NotUnicode {
        /// Variable name.
        name: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<OsString> + use<> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).map(OsString::from)
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = Config::from_lookup(|_| None).expect("defaults load");
        assert_eq!(config, Config::default());
        assert_eq!(config.client_group, DEFAULT_CLIENT_GROUP);
        assert_eq!(config.modules, vec!["systeminfo", "firewalld"]);
    }

    #[test]
    fn environment_overrides_defaults() {
        let lookup = lookup_from(&[
            (ENV_SOCKET, "unix:///tmp/test/rootd.sock"),
            (ENV_CLIENT_GROUP, "operators"),
            (ENV_MODULES, "systeminfo"),
            (ENV_LOG_FILTER, "debug"),
            (ENV_LOG_FORMAT, "compact"),
        ]);
        let config = Config::from_lookup(lookup).expect("environment load");
        assert_eq!(config.socket, SocketEndpoint::unix("/tmp/test/rootd.sock"));
        assert_eq!(config.client_group, "operators");
        assert_eq!(config.modules, vec!["systeminfo"]);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn invalid_socket_is_rejected() {
        let lookup = lookup_from(&[(ENV_SOCKET, "ftp://nope")]);
        let error = Config::from_lookup(lookup).expect_err("bad scheme");
        assert!(matches!(error, ConfigError::InvalidSocket { .. }));
    }

    #[test]
    fn invalid_log_format_is_rejected() {
        let lookup = lookup_from(&[(ENV_LOG_FORMAT, "xml")]);
        let error = Config::from_lookup(lookup).expect_err("bad format");
        assert!(matches!(error, ConfigError::InvalidLogFormat { .. }));
    }

    #[rstest]
    #[case::spaces("systeminfo, firewalld", vec!["systeminfo", "firewalld"])]
    #[case::empty_segments(",systeminfo,,", vec!["systeminfo"])]
    #[case::single("firewalld", vec!["firewalld"])]
    fn module_lists_are_normalised(#[case] input: &str, #[case] expected: Vec<&str>) {
        assert_eq!(parse_module_list(input), expected);
    }
}
