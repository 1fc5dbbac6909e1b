//! Parley - streaming chat client
//!
#![doc = "Main entry point for the Parley chat client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parley::cli::{Cli, Commands};
use parley::commands;
use parley::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Chat { new } => {
            commands::chat::run_chat(config, cli.ephemeral, new).await?;
            Ok(())
        }
        Commands::Send { text, new } => {
            tracing::info!("Sending one message");
            commands::send::run_send(config, cli.ephemeral, text.join(" "), new).await?;
            Ok(())
        }
        Commands::History { command } => {
            tracing::debug!("Starting history command");
            let mut store = commands::open_store(&config, cli.ephemeral)?;
            commands::history::handle_history(command, &mut store)?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// Logs go to stderr so streamed replies on stdout stay clean.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "parley=debug" } else { "parley=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
