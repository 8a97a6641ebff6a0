//! hero-board binary
//!
//! Serves the hero form and live table until interrupted.

use std::path::PathBuf;

use clap::Parser;
use hero_board::{load_config, Config, HeroBoardBuilder};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "hero-board", version, about = "Number form with a live hero table")]
struct Args {
    /// JSON configuration file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for the dashboard, replacing `dashboard.port`
    #[arg(long)]
    port: Option<u16>,

    /// Log level, used when RUST_LOG is unset
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

impl Args {
    /// Configuration with secrets resolved and command-line overrides applied
    fn resolve_config(&self) -> hero_board::Result<Config> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => Config::default(),
        };
        config.resolve_secrets()?;
        if let Some(port) = self.port {
            config.dashboard.port = port;
        }
        Ok(config)
    }
}

fn init_tracing(level: Level) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(args.log_level);
    tracing::debug!("{:?}", args);

    let config = args.resolve_config()?;
    tracing::info!(
        "Serving table '{}' from the {} backend",
        config.table,
        config.backend.type_name()
    );

    let board = HeroBoardBuilder::new(config).build().await?;
    board.start().await?;
    Ok(())
}
