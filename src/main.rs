use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use storefront::app::{App, Command};
use storefront::{config, logging};

#[derive(Parser, Debug)]
#[command(name = "storefront")]
#[command(about = "Command-line client for the storefront API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/storefront/config.yaml)
  #[arg(short = 'C', long, global = true)]
  config: Option<PathBuf>,

  /// API base URL, overrides the config file and STOREFRONT_API_URL
  #[arg(long, global = true)]
  base_url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Override base URL if specified on command line
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }

  let _log_guard = logging::init(&config.logging)?;

  let app = App::new(config)?;
  let result = app.run(args.command).await;
  app.shutdown();

  result
}
