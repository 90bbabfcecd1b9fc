mod general;
mod logging;
mod server;

pub use general::*;
pub use logging::*;
pub use server::*;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "./resourceserver.toml";

/// Where operators are pointed when the configuration is unusable.
pub const CONFIG_DOCS_HINT: &str =
    "See the Configuration Files section of the README for the expected layout.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config file
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The configuration file as written on disk.
///
/// ```toml
/// [General]
/// AuthToken = "abc123"
/// LogLevel = "Debug"
///
/// [Plugins]
/// hashcatdict = "/etc/resourceserver/hashcatdict.toml"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(rename = "General", default, skip_serializing_if = "Option::is_none")]
    pub general: Option<GeneralSection>,
    #[serde(rename = "Plugins", default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginsSection>,
}

impl ConfigFile {
    /// Read and parse the file at `path`. A missing file is an error; there
    /// is no usable default configuration for a node.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| Error::ConfigParse {
            path: path.display().to_string(),
            source,
        })
    }

    /// `[General]`, or an error when the section is absent or has no keys.
    pub fn general(&self) -> Result<&GeneralSection> {
        self.general
            .as_ref()
            .filter(|g| !g.is_empty())
            .ok_or(Error::MissingSection("General"))
    }

    /// `[Plugins]`, or an error when the section is absent or has no keys.
    pub fn plugins(&self) -> Result<&PluginsSection> {
        self.plugins
            .as_ref()
            .filter(|p| !p.is_empty())
            .ok_or(Error::MissingSection("Plugins"))
    }

    /// Validate the file and return a list of issues.
    ///
    /// `known_plugins` is the set of plugin names this build can set up;
    /// other keys in `[Plugins]` are reported as warnings since they are
    /// ignored at startup.
    pub fn validate(&self, known_plugins: &[&str]) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        match self.general() {
            Err(_) => issues.push(ConfigIssue::error(
                "General",
                "section is missing or empty",
            )),
            Ok(general) => {
                if general
                    .auth_token
                    .as_deref()
                    .map_or(true, |t| t.trim().is_empty())
                {
                    issues.push(ConfigIssue::error(
                        "General.AuthToken",
                        "authentication token must be set",
                    ));
                }
                if let Some(raw) = general.log_level.as_deref() {
                    if raw.parse::<LogLevel>().is_err() {
                        issues.push(ConfigIssue::warning(
                            "General.LogLevel",
                            format!("unknown level {raw:?}, Info will be used"),
                        ));
                    }
                }
                if general.max_concurrent_tasks == Some(0) {
                    issues.push(ConfigIssue::warning(
                        "General.MaxConcurrentTasks",
                        "0 is raised to 1",
                    ));
                }
                for key in general.extra.keys() {
                    issues.push(ConfigIssue::warning(
                        format!("General.{key}"),
                        "unknown key, it will be ignored",
                    ));
                }
            }
        }

        match self.plugins() {
            Err(_) => issues.push(ConfigIssue::error(
                "Plugins",
                "section is missing or empty",
            )),
            Ok(plugins) => {
                for (name, value) in plugins {
                    if !known_plugins.contains(&name.as_str()) {
                        issues.push(ConfigIssue::warning(
                            format!("Plugins.{name}"),
                            "unknown plugin, it will be ignored",
                        ));
                    } else if value.trim().is_empty() {
                        issues.push(ConfigIssue::warning(
                            format!("Plugins.{name}"),
                            "empty value, plugin will not be enabled",
                        ));
                    }
                }
            }
        }

        issues
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Resolved node config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `[General]` with required keys checked: the part of startup that runs
/// before logging is attached.
#[derive(Debug, Clone)]
pub struct GeneralConfig {
    pub auth_token: String,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    pub session_idle_timeout: Option<Duration>,
    pub max_concurrent_tasks: usize,
}

impl GeneralConfig {
    /// Checks `[General]`, then `AuthToken`.
    pub fn resolve(file: &ConfigFile) -> Result<Self> {
        let general = file.general()?;

        let auth_token = general
            .auth_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::MissingAuthToken)?
            .to_owned();

        Ok(Self {
            auth_token,
            log_level: LogLevel::resolve(general.log_level.as_deref()),
            log_file: general.log_file.clone().filter(|p| !p.as_os_str().is_empty()),
            session_idle_timeout: general
                .session_idle_timeout
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            max_concurrent_tasks: general.max_concurrent_tasks.unwrap_or(1).max(1),
        })
    }
}

/// Everything the service bootstrap needs, with required fields checked.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_host: String,
    pub bind_port: String,
    pub auth_token: String,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
    /// Plugin name → config value. Entries with empty values are dropped.
    pub enabled_plugins: BTreeMap<String, String>,
    pub session_idle_timeout: Option<Duration>,
    pub max_concurrent_tasks: usize,
}

impl NodeConfig {
    /// Resolve a parsed file plus the bind flags.
    ///
    /// Checks run in startup order: `[General]`, then `AuthToken`, then
    /// `[Plugins]`.
    pub fn resolve(file: &ConfigFile, host: &str, port: &str) -> Result<Self> {
        Self::from_general(GeneralConfig::resolve(file)?, file, host, port)
    }

    /// Finish resolution once `[General]` has been checked: reads
    /// `[Plugins]` and applies the bind flags.
    pub fn from_general(
        general: GeneralConfig,
        file: &ConfigFile,
        host: &str,
        port: &str,
    ) -> Result<Self> {
        let enabled_plugins = file
            .plugins()?
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        Ok(Self {
            bind_host: host.to_owned(),
            bind_port: port.to_owned(),
            auth_token: general.auth_token,
            log_level: general.log_level,
            log_file: general.log_file,
            enabled_plugins,
            session_idle_timeout: general.session_idle_timeout,
            max_concurrent_tasks: general.max_concurrent_tasks,
        })
    }

    pub fn bind_address(&self) -> Result<BindAddress> {
        BindAddress::parse(&self.bind_host, &self.bind_port)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl ConfigIssue {
    fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Error,
            field: field.into(),
            message: message.into(),
        }
    }

    fn warning(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: ConfigSeverity::Warning,
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[General]
AuthToken = "abc123"
LogLevel = "Debug"

[Plugins]
hashcatdict = "/etc/dict.conf"
"#;

    fn parse(s: &str) -> ConfigFile {
        toml::from_str(s).unwrap()
    }

    #[test]
    fn resolves_full_config() {
        let cfg = NodeConfig::resolve(&parse(FULL), "127.0.0.1", "9443").unwrap();
        assert_eq!(cfg.auth_token, "abc123");
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert_eq!(cfg.log_file, None);
        assert_eq!(cfg.enabled_plugins.len(), 1);
        assert_eq!(cfg.enabled_plugins["hashcatdict"], "/etc/dict.conf");
        assert_eq!(cfg.session_idle_timeout, None);
        assert_eq!(cfg.max_concurrent_tasks, 1);
        assert_eq!(cfg.bind_address().unwrap().to_string(), "127.0.0.1:9443");
    }

    #[test]
    fn missing_general_is_fatal() {
        let file = parse("[Plugins]\nhashcatdict = \"x\"\n");
        assert!(matches!(
            NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT),
            Err(Error::MissingSection("General"))
        ));
    }

    #[test]
    fn empty_general_is_fatal() {
        let file = parse("[General]\n[Plugins]\nhashcatdict = \"x\"\n");
        assert!(matches!(
            NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT),
            Err(Error::MissingSection("General"))
        ));
    }

    #[test]
    fn missing_token_is_fatal() {
        let file = parse("[General]\nLogLevel = \"Debug\"\n[Plugins]\nhashcatdict = \"x\"\n");
        assert!(matches!(
            NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT),
            Err(Error::MissingAuthToken)
        ));
    }

    #[test]
    fn blank_token_is_fatal() {
        let file = parse("[General]\nAuthToken = \"  \"\n[Plugins]\nhashcatdict = \"x\"\n");
        assert!(matches!(
            NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT),
            Err(Error::MissingAuthToken)
        ));
    }

    #[test]
    fn general_with_only_unknown_keys_lacks_a_token() {
        let file = parse("[General]\nColour = \"blue\"\n[Plugins]\nhashcatdict = \"x\"\n");
        assert!(matches!(
            NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT),
            Err(Error::MissingAuthToken)
        ));

        let issues = file.validate(&["hashcatdict"]);
        let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["General.AuthToken", "General.Colour"]);
    }

    #[test]
    fn token_checked_before_plugins() {
        let file = parse("[General]\nLogLevel = \"Info\"\n");
        assert!(matches!(
            NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT),
            Err(Error::MissingAuthToken)
        ));
    }

    #[test]
    fn general_resolves_without_plugins() {
        let file = parse("[General]\nAuthToken = \"t\"\nLogLevel = \"Warn\"\nLogFile = \"/tmp/rs.log\"\n");
        let general = GeneralConfig::resolve(&file).unwrap();
        assert_eq!(general.log_level, LogLevel::Warn);
        assert_eq!(general.log_file, Some(PathBuf::from("/tmp/rs.log")));
        assert!(matches!(
            NodeConfig::from_general(general, &file, DEFAULT_HOST, DEFAULT_PORT),
            Err(Error::MissingSection("Plugins"))
        ));
    }

    #[test]
    fn missing_or_empty_plugins_is_fatal() {
        for raw in [
            "[General]\nAuthToken = \"t\"\n",
            "[General]\nAuthToken = \"t\"\n[Plugins]\n",
        ] {
            assert!(matches!(
                NodeConfig::resolve(&parse(raw), DEFAULT_HOST, DEFAULT_PORT),
                Err(Error::MissingSection("Plugins"))
            ));
        }
    }

    #[test]
    fn empty_plugin_values_are_not_enabled() {
        let file = parse(
            "[General]\nAuthToken = \"t\"\n[Plugins]\nhashcatdict = \"\"\nother = \"/x\"\n",
        );
        let cfg = NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT).unwrap();
        assert_eq!(cfg.enabled_plugins.keys().collect::<Vec<_>>(), vec!["other"]);
    }

    #[test]
    fn unknown_log_level_resolves_to_info() {
        let file = parse("[General]\nAuthToken = \"t\"\nLogLevel = \"Chatty\"\n[Plugins]\np = \"v\"\n");
        let cfg = NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT).unwrap();
        assert_eq!(cfg.log_level, LogLevel::Info);
    }

    #[test]
    fn idle_timeout_and_concurrency_knobs() {
        let file = parse(
            "[General]\nAuthToken = \"t\"\nSessionIdleTimeout = 0\nMaxConcurrentTasks = 0\n[Plugins]\np = \"v\"\n",
        );
        let cfg = NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT).unwrap();
        assert_eq!(cfg.session_idle_timeout, None);
        assert_eq!(cfg.max_concurrent_tasks, 1);

        let file = parse(
            "[General]\nAuthToken = \"t\"\nSessionIdleTimeout = 30\nMaxConcurrentTasks = 4\n[Plugins]\np = \"v\"\n",
        );
        let cfg = NodeConfig::resolve(&file, DEFAULT_HOST, DEFAULT_PORT).unwrap();
        assert_eq!(cfg.session_idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(cfg.max_concurrent_tasks, 4);
    }

    #[test]
    fn validate_clean_config_has_no_issues() {
        assert!(parse(FULL).validate(&["hashcatdict"]).is_empty());
    }

    #[test]
    fn validate_reports_errors_and_warnings() {
        let file = parse("[General]\nLogLevel = \"Loud\"\n[Plugins]\nmystery = \"x\"\n");
        let issues = file.validate(&["hashcatdict"]);
        let errors: Vec<_> = issues
            .iter()
            .filter(|i| i.severity == ConfigSeverity::Error)
            .map(|i| i.field.as_str())
            .collect();
        let warnings: Vec<_> = issues
            .iter()
            .filter(|i| i.severity == ConfigSeverity::Warning)
            .map(|i| i.field.as_str())
            .collect();
        assert_eq!(errors, vec!["General.AuthToken"]);
        assert_eq!(warnings, vec!["General.LogLevel", "Plugins.mystery"]);
    }

    #[test]
    fn issue_display_is_tagged() {
        let issue = ConfigIssue::error("Plugins", "section is missing or empty");
        assert_eq!(issue.to_string(), "[ERROR] Plugins: section is missing or empty");
    }
}
