pub mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rn_domain::config::{DEFAULT_CONFIG_PATH, DEFAULT_HOST, DEFAULT_PORT};

/// resourceserver: a resource node that runs cracking tasks for a controller.
#[derive(Debug, Parser)]
#[command(name = "resourceserver", version, about)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long = "conf", global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub conf: PathBuf,

    /// IP address to listen on.
    #[arg(long, global = true, default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on.
    #[arg(long, global = true, default_value = DEFAULT_PORT)]
    pub port: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Start the node (default when no subcommand is given).
    Serve,
    /// Parse the config file and report any errors.
    Validate,
    /// Print version information.
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["resourceserver"]).unwrap();
        assert_eq!(cli.conf, PathBuf::from("./resourceserver.toml"));
        assert_eq!(cli.host, "0.0.0.0");
        assert_eq!(cli.port, "9443");
        assert_eq!(cli.command, None);
    }

    #[test]
    fn flags_before_and_after_subcommand() {
        let cli = Cli::try_parse_from([
            "resourceserver",
            "--conf",
            "/etc/node.toml",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
        ])
        .unwrap();
        assert_eq!(cli.conf, PathBuf::from("/etc/node.toml"));
        assert_eq!(cli.host, "127.0.0.1");
        assert_eq!(cli.port, "9000");
        assert_eq!(cli.command, Some(Command::Serve));
    }

    #[test]
    fn port_is_not_validated_by_the_parser() {
        // Bad ports surface as a bind failure with its own exit code.
        let cli = Cli::try_parse_from(["resourceserver", "--port", "0"]).unwrap();
        assert_eq!(cli.port, "0");
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(Cli::try_parse_from(["resourceserver", "launch"]).is_err());
    }
}
