use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::catalog::PluginError;

/// Plugin config file referenced by `[Plugins] hashcatdict = "<path>"`.
///
/// ```toml
/// binary = "/usr/bin/hashcat"
/// work_dir = "/var/lib/resourceserver/hashcat"
///
/// [dictionaries]
/// rockyou = "/usr/share/wordlists/rockyou.txt"
///
/// [rules]
/// best64 = "/usr/share/hashcat/rules/best64.rule"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HashcatConfig {
    pub binary: PathBuf,
    #[serde(default = "d_work_dir")]
    pub work_dir: PathBuf,
    #[serde(default)]
    pub dictionaries: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub rules: BTreeMap<String, PathBuf>,
}

fn d_work_dir() -> PathBuf {
    std::env::temp_dir().join("resourceserver-hashcat")
}

impl HashcatConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PluginError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| PluginError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let cfg: HashcatConfig = toml::from_str(&raw).map_err(|source| PluginError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        cfg.check()?;
        Ok(cfg)
    }

    /// Every referenced file must exist when the plugin is set up, so a
    /// broken install surfaces at startup instead of on the first task.
    fn check(&self) -> Result<(), PluginError> {
        if !self.binary.is_file() {
            return Err(PluginError::Invalid(format!(
                "hashcat binary {} not found",
                self.binary.display()
            )));
        }
        if self.dictionaries.is_empty() {
            return Err(PluginError::Invalid(
                "at least one entry in [dictionaries] is required".into(),
            ));
        }
        for (kind, entries) in [("dictionary", &self.dictionaries), ("rule", &self.rules)] {
            for (name, path) in entries {
                if !path.is_file() {
                    return Err(PluginError::Invalid(format!(
                        "{kind} {name:?} points at missing file {}",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }
}
