//! `rn-plugins`: execution plugins and the catalog that sets them up from
//! the `[Plugins]` configuration section.

pub mod catalog;
pub mod hashcatdict;

pub use catalog::{PluginCatalog, PluginError, PluginFactory, PluginOutcome};
pub use hashcatdict::HashcatDict;
