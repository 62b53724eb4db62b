use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;

use raumfeld_bridge::{bridge, discover, logging, BridgeConfig, Cli, Command};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level()).context("Failed to initialize logging")?;

    match cli.command {
        Command::Discover(args) => {
            let tally = discover::run(args).await.context("Discovery failed")?;
            tracing::debug!(?tally, "discover finished");
        }
        Command::HomieBridge(args) => {
            let config = BridgeConfig::from_args(args).context("Invalid configuration")?;
            tracing::info!(
                broker = %config.broker,
                base_topic = %config.base_topic,
                pinned = config.locations.len(),
                "starting bridge"
            );

            let cancel = CancellationToken::new();
            tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    match tokio::signal::ctrl_c().await {
                        Ok(()) => {
                            tracing::info!("interrupt received");
                            cancel.cancel();
                        }
                        Err(e) => tracing::error!(error = %e, "cannot listen for interrupt"),
                    }
                }
            });

            bridge::run(config, cancel).await.context("Bridge failed")?;
        }
    }

    Ok(())
}
