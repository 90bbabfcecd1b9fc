//! Startup sequence: config → registry → plugins → listener.

use std::path::Path;
use std::sync::Arc;

use rn_domain::config::{ConfigFile, GeneralConfig, NodeConfig};
use rn_plugins::{PluginCatalog, PluginOutcome};
use rn_tools::TaskRegistry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::acceptor::Acceptor;
use crate::rpc::Dispatcher;

/// A fatal condition that stops the node. Each maps to its own exit code.
#[derive(thiserror::Error, Debug)]
pub enum StartupError {
    #[error("unable to load configuration: {0}")]
    LoadConfig(#[source] rn_domain::Error),

    #[error("no [General] section found in configuration file")]
    MissingGeneral,

    #[error("no authentication token given in configuration file")]
    MissingAuthToken,

    #[error("no [Plugins] section found in configuration file")]
    MissingPlugins,

    #[error("unable to listen on {addr}: {reason}")]
    Bind { addr: String, reason: String },

    #[error("accept loop failed: {0}")]
    Accept(#[source] std::io::Error),
}

impl StartupError {
    pub fn exit_code(&self) -> i32 {
        match self {
            StartupError::LoadConfig(_) => 2,
            StartupError::MissingGeneral => 3,
            StartupError::MissingAuthToken => 4,
            StartupError::MissingPlugins => 5,
            StartupError::Bind { .. } => 6,
            StartupError::Accept(_) => 7,
        }
    }

    /// Whether the operator should be pointed at the config docs.
    pub fn is_config_error(&self) -> bool {
        self.exit_code() <= 5
    }
}

/// Load the config file and check `[General]` and `AuthToken`.
///
/// Returns the parsed file so the caller can attach logging before
/// [`resolve_node_config`] checks `[Plugins]`.
pub fn load_general(path: &Path) -> Result<(ConfigFile, GeneralConfig), StartupError> {
    let file = ConfigFile::load(path).map_err(StartupError::LoadConfig)?;
    let general = GeneralConfig::resolve(&file).map_err(config_error)?;
    Ok((file, general))
}

/// Check `[Plugins]` and apply the bind flags.
pub fn resolve_node_config(
    file: &ConfigFile,
    general: GeneralConfig,
    host: &str,
    port: &str,
) -> Result<NodeConfig, StartupError> {
    NodeConfig::from_general(general, file, host, port).map_err(config_error)
}

/// Load the config file and resolve it against the bind flags.
pub fn load_node_config(path: &Path, host: &str, port: &str) -> Result<NodeConfig, StartupError> {
    let (file, general) = load_general(path)?;
    resolve_node_config(&file, general, host, port)
}

fn config_error(e: rn_domain::Error) -> StartupError {
    match e {
        rn_domain::Error::MissingSection("General") => StartupError::MissingGeneral,
        rn_domain::Error::MissingSection("Plugins") => StartupError::MissingPlugins,
        rn_domain::Error::MissingAuthToken => StartupError::MissingAuthToken,
        other => StartupError::LoadConfig(other),
    }
}

/// Build the registry and register every enabled plugin that sets up.
pub fn build_registry(config: &NodeConfig, catalog: &PluginCatalog) -> TaskRegistry {
    let mut registry = TaskRegistry::new(config.auth_token.clone())
        .with_max_concurrent(config.max_concurrent_tasks);

    let outcomes = catalog.register_all(&config.enabled_plugins, &mut registry);
    let registered = outcomes
        .iter()
        .filter(|o| matches!(o, PluginOutcome::Registered { .. }))
        .count();
    if registered == 0 {
        tracing::warn!("no plugins registered; the node will accept tasks for no tool");
    }
    tracing::info!(
        tools = ?registry.tool_names(),
        max_concurrent_tasks = registry.max_concurrent(),
        "task registry ready"
    );
    registry
}

/// Bind the listener. Invalid or zero ports count as bind failures.
pub async fn bind(config: &NodeConfig) -> Result<TcpListener, StartupError> {
    let addr = config.bind_address().map_err(|e| StartupError::Bind {
        addr: format!("{}:{}", config.bind_host, config.bind_port),
        reason: e.to_string(),
    })?;

    let listener = TcpListener::bind((addr.host.as_str(), addr.port))
        .await
        .map_err(|e| StartupError::Bind {
            addr: addr.to_string(),
            reason: e.to_string(),
        })?;

    tracing::info!(addr = %addr, "listening for controller");
    Ok(listener)
}

/// Run the node with an already resolved config until `shutdown` fires.
///
/// Logging must be set up by the caller.
pub async fn serve(
    config: NodeConfig,
    catalog: &PluginCatalog,
    shutdown: CancellationToken,
) -> Result<(), StartupError> {
    let registry = build_registry(&config, catalog);
    let listener = bind(&config).await?;

    let dispatcher =
        Dispatcher::new(Arc::new(registry)).with_idle_timeout(config.session_idle_timeout);

    Acceptor::new(listener, dispatcher)
        .run(shutdown)
        .await
        .map_err(StartupError::Accept)
}

/// Wait for SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to register SIGTERM handler");
                let _ = ctrl_c.await;
                tracing::info!("received SIGINT, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        tracing::info!("received SIGINT, shutting down");
    }
}
