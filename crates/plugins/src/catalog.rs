//! Named plugin constructors, driven against the enabled `[Plugins]` entries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rn_tools::{TaskRegistry, Tool};

use crate::hashcatdict::{self, HashcatDict};

/// Errors raised while setting up a plugin.
#[derive(thiserror::Error, Debug)]
pub enum PluginError {
    #[error("reading {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Builds a tool from the plugin's configuration value.
pub type PluginFactory =
    Arc<dyn Fn(&str) -> Result<Arc<dyn Tool>, PluginError> + Send + Sync>;

/// What happened to one `[Plugins]` entry during registration.
#[derive(Debug)]
pub enum PluginOutcome {
    Registered { plugin: String, tool: String },
    Skipped { plugin: String, error: PluginError },
    Unrecognized { plugin: String },
}

/// Map from plugin name to constructor.
///
/// ```rust,no_run
/// # use rn_plugins::PluginCatalog;
/// # use rn_tools::TaskRegistry;
/// # use std::collections::BTreeMap;
/// let catalog = PluginCatalog::builtin();
/// let mut registry = TaskRegistry::new("secret");
/// let enabled = BTreeMap::from([("hashcatdict".to_string(), "/etc/dict.toml".to_string())]);
/// catalog.register_all(&enabled, &mut registry);
/// ```
#[derive(Clone, Default)]
pub struct PluginCatalog {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginCatalog {
    /// A catalog that knows no plugins.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The plugins shipped with the node.
    pub fn builtin() -> Self {
        Self::empty().with_plugin(hashcatdict::PLUGIN_NAME, |value: &str| {
            let tool: Arc<dyn Tool> = Arc::new(HashcatDict::setup(value)?);
            Ok(tool)
        })
    }

    /// Add (or replace) a constructor under `name`.
    pub fn with_plugin<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&str) -> Result<Arc<dyn Tool>, PluginError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    /// Known plugin names (sorted).
    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Run one plugin's setup. `None` when `name` is not in the catalog.
    pub fn setup(&self, name: &str, value: &str) -> Option<Result<Arc<dyn Tool>, PluginError>> {
        self.factories.get(name).map(|factory| factory(value))
    }

    /// Set up every enabled plugin and register the resulting tools.
    ///
    /// Unknown names are ignored and a failed setup skips only that plugin;
    /// neither stops the node from starting.
    pub fn register_all(
        &self,
        enabled: &BTreeMap<String, String>,
        registry: &mut TaskRegistry,
    ) -> Vec<PluginOutcome> {
        let mut outcomes = Vec::with_capacity(enabled.len());

        for (plugin, value) in enabled {
            if value.trim().is_empty() {
                continue;
            }
            match self.setup(plugin, value) {
                None => {
                    tracing::debug!(plugin = %plugin, "ignoring unrecognized plugin");
                    outcomes.push(PluginOutcome::Unrecognized {
                        plugin: plugin.clone(),
                    });
                }
                Some(Ok(tool)) => {
                    let tool_name = tool.info().name.to_ascii_lowercase();
                    registry.add_tool(tool);
                    tracing::info!(plugin = %plugin, tool = %tool_name, "plugin enabled");
                    outcomes.push(PluginOutcome::Registered {
                        plugin: plugin.clone(),
                        tool: tool_name,
                    });
                }
                Some(Err(error)) => {
                    tracing::error!(
                        plugin = %plugin,
                        config = %value,
                        error = %error,
                        "plugin setup failed, skipping"
                    );
                    outcomes.push(PluginOutcome::Skipped {
                        plugin: plugin.clone(),
                        error,
                    });
                }
            }
        }

        outcomes
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("plugins", &self.names())
            .finish()
    }
}
