use std::fmt;

use crate::error::{Error, Result};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bind address
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: &str = "9443";

/// Listener address assembled from the `--host` / `--port` flags.
///
/// The host is kept as a string so names like `localhost` resolve at bind
/// time. Port `0` is rejected: the node must listen on a port the
/// controller can be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindAddress {
    pub host: String,
    pub port: u16,
}

impl BindAddress {
    pub fn parse(host: &str, port: &str) -> Result<Self> {
        let port_num: u16 = port
            .trim()
            .parse()
            .map_err(|_| Error::InvalidPort(port.to_owned()))?;
        if port_num == 0 {
            return Err(Error::InvalidPort(port.to_owned()));
        }
        if host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        Ok(Self {
            host: host.trim().to_owned(),
            port: port_num,
        })
    }
}

impl Default for BindAddress {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: 9443,
        }
    }
}

impl fmt::Display for BindAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Bare IPv6 literals need brackets to be joined with a port.
        if self.host.contains(':') && !self.host.starts_with('[') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let addr = BindAddress::parse(DEFAULT_HOST, DEFAULT_PORT).unwrap();
        assert_eq!(addr, BindAddress::default());
        assert_eq!(addr.to_string(), "0.0.0.0:9443");
    }

    #[test]
    fn rejects_port_zero() {
        assert!(matches!(
            BindAddress::parse("127.0.0.1", "0"),
            Err(Error::InvalidPort(p)) if p == "0"
        ));
    }

    #[test]
    fn rejects_non_numeric_and_out_of_range_ports() {
        assert!(BindAddress::parse("127.0.0.1", "https").is_err());
        assert!(BindAddress::parse("127.0.0.1", "70000").is_err());
        assert!(BindAddress::parse("127.0.0.1", "").is_err());
    }

    #[test]
    fn rejects_empty_host() {
        assert!(matches!(BindAddress::parse("  ", "9443"), Err(Error::Config(_))));
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let addr = BindAddress::parse("::1", "9443").unwrap();
        assert_eq!(addr.to_string(), "[::1]:9443");
    }
}
