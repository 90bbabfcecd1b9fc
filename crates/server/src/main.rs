use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use rn_domain::config::{ConfigFile, CONFIG_DOCS_HINT};
use rn_plugins::PluginCatalog;
use rn_server::bootstrap::{self, StartupError};
use rn_server::cli::{Cli, Command};
use rn_server::logging::{self, LoggingError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            if let Err(e) = run_node(&cli).await {
                eprintln!("ERROR: {e}");
                if e.is_config_error() {
                    eprintln!("{CONFIG_DOCS_HINT}");
                }
                std::process::exit(e.exit_code());
            }
            Ok(())
        }
        Some(Command::Validate) => {
            let file = ConfigFile::load(&cli.conf)
                .with_context(|| format!("loading {}", cli.conf.display()))?;
            let catalog = PluginCatalog::builtin();
            if !rn_server::cli::config::validate(&file, &cli.conf, &catalog.names()) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Version) => {
            println!("resourceserver {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_node(cli: &Cli) -> Result<(), StartupError> {
    let (file, general) = bootstrap::load_general(&cli.conf)?;

    // Attached before [Plugins] is checked so that failure reaches the file.
    match logging::init_logging(general.log_level, general.log_file.as_deref()) {
        Ok(()) => {}
        Err(e @ LoggingError::LogFile { .. }) => {
            eprintln!("WARNING: {e}; logging to stderr only");
        }
        Err(e) => eprintln!("WARNING: {e}"),
    }

    let config = match bootstrap::resolve_node_config(&file, general, &cli.host, &cli.port) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return Err(e);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        conf = %cli.conf.display(),
        log_level = %config.log_level,
        "resourceserver starting"
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        bootstrap::shutdown_signal().await;
        signal_token.cancel();
    });

    bootstrap::serve(config, &PluginCatalog::builtin(), shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
