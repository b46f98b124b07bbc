//! stakestay-node CLI entry point.

mod cli;

use clap::Parser;
use cli::{Cli, LogFormat};
use stakestay::EngineBuilder;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
    }

    info!("stakestay-node v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.into_config()?;

    let mut engine = EngineBuilder::new(config).build()?;

    engine.run().await?;

    info!("Goodbye!");
    Ok(())
}
