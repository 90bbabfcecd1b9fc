use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// [General]
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Raw `[General]` section. Every key is optional at the parse level;
/// required keys are enforced when resolving a
/// [`NodeConfig`](super::NodeConfig).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GeneralSection {
    /// Shared secret every RPC request must present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// One of `Debug`, `Info`, `Warn`, `Error`, `Fatal`, `Panic`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Append logs to this file in addition to stderr.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Seconds a controller session may sit idle before it is dropped.
    /// Unset means sessions never time out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_idle_timeout: Option<u64>,
    /// Upper bound on tasks executing at once (default 1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrent_tasks: Option<usize>,
    /// Keys this build does not recognise. Kept so a section holding only
    /// unknown keys still counts as present.
    #[serde(flatten)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl GeneralSection {
    /// True when the section holds no keys at all, known or not.
    pub fn is_empty(&self) -> bool {
        self.auth_token.is_none()
            && self.log_level.is_none()
            && self.log_file.is_none()
            && self.session_idle_timeout.is_none()
            && self.max_concurrent_tasks.is_none()
            && self.extra.is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// [Plugins]
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `[Plugins]`: plugin name → plugin-specific configuration string
/// (usually the path of the plugin's own config file).
pub type PluginsSection = BTreeMap<String, String>;
