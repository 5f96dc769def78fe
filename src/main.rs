mod app;
mod event;
mod ui;

use clap::Parser;
use color_eyre::Result;
use pcdb::config::Config;
use pcdb::logging;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "pcdb")]
#[command(about = "A terminal client for the PC inventory database")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./pcdb.yaml or $XDG_CONFIG_HOME/pcdb/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Base URL of the inventory API
  #[arg(short, long)]
  url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Override API URL if specified on command line
  if let Some(url) = args.url {
    config.api.url = url;
  }

  let _log_guard = logging::init()?;
  info!(url = %config.api.url, "starting pcdb");

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  info!("exiting");
  Ok(())
}
