//! Command-line interface for the daemon binary.
//!
//! Flags override environment variables, which override compiled-in
//! defaults; the merged result is a [`Config`].

use std::str::FromStr;

use clap::Parser;

use rootd_config::{Config, ConfigError, LogFormat, SocketEndpoint, parse_module_list};

/// Command-line arguments accepted by the `rootd` binary.
#[derive(Debug, Default, Parser)]
#[command(
    name = "rootd",
    version,
    about = "Privilege-separated system management daemon"
)]
pub struct Cli {
    /// Control socket endpoint (unix:///path, tcp://host:port, or a bare path).
    #[arg(long)]
    pub socket: Option<String>,

    /// Group whose members may connect to the control socket.
    #[arg(long)]
    pub group: Option<String>,

    /// Comma-separated allow-list of modules to register.
    #[arg(long)]
    pub modules: Option<String>,

    /// Log filter expression (tracing EnvFilter syntax).
    #[arg(long)]
    pub log_filter: Option<String>,

    /// Log output format: json or compact.
    #[arg(long)]
    pub log_format: Option<String>,
}

impl Cli {
    /// Merges flags over the environment layer into a resolved [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when any layer holds an unparseable value.
    pub fn resolve_config(&self) -> Result<Config, ConfigError> {
        self.apply(Config::from_env()?)
    }

    /// Applies the flag layer on top of an already-resolved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a flag value cannot be parsed.
    pub fn apply(&self, mut config: Config) -> Result<Config, ConfigError> {
        if let Some(socket) = &self.socket {
            config.socket = SocketEndpoint::from_str(socket).map_err(|source| {
                ConfigError::InvalidSocket {
                    value: socket.clone(),
                    source,
                }
            })?;
        }
        if let Some(group) = &self.group {
            config.client_group.clone_from(group);
        }
        if let Some(modules) = &self.modules {
            config.modules = parse_module_list(modules);
        }
        if let Some(log_filter) = &self.log_filter {
            config.log_filter.clone_from(log_filter);
        }
        if let Some(log_format) = &self.log_format {
            config.log_format = LogFormat::from_str(log_format).map_err(|_| {
                ConfigError::InvalidLogFormat {
                    value: log_format.clone(),
                }
            })?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_resolved_configuration() {
        let cli = Cli {
            socket: Some(String::from("unix:///tmp/override/rootd.sock")),
            group: Some(String::from("operators")),
            modules: Some(String::from("systeminfo")),
            log_filter: Some(String::from("rootd=debug")),
            log_format: Some(String::from("compact")),
        };
        let config = cli.apply(Config::default()).expect("apply flags");
        assert_eq!(
            config.socket,
            SocketEndpoint::unix("/tmp/override/rootd.sock")
        );
        assert_eq!(config.client_group, "operators");
        assert_eq!(config.modules, vec!["systeminfo"]);
        assert_eq!(config.log_filter, "rootd=debug");
        assert_eq!(config.log_format, LogFormat::Compact);
    }

    #[test]
    fn absent_flags_leave_configuration_untouched() {
        let config = Cli::default().apply(Config::default()).expect("apply");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_log_format_flag_is_rejected() {
        let cli = Cli {
            log_format: Some(String::from("yaml")),
            ..Cli::default()
        };
        let error = cli.apply(Config::default()).expect_err("bad format");
        assert!(matches!(error, ConfigError::InvalidLogFormat { .. }));
    }

    #[test]
    fn parses_flags_from_argv() {
        let cli = Cli::parse_from([
            "rootd",
            "--socket",
            "tcp://127.0.0.1:7070",
            "--modules",
            "systeminfo,firewalld",
        ]);
        let config = cli.apply(Config::default()).expect("apply");
        assert_eq!(config.socket, SocketEndpoint::tcp("127.0.0.1", 7070));
        assert_eq!(config.modules, vec!["systeminfo", "firewalld"]);
    }
}
