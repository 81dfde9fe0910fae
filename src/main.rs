use clap::Parser;
use vercel_env_sync::sync::{SyncOptions, VercelSync};

#[derive(Parser)]
#[command(
  name = "vercel-env-sync",
  about = "Sync environment variables from your CI environment into a Vercel project",
  version,
  author
)]
struct Cli {
  /// Vercel API token
  #[arg(long, env = "VERCEL_TOKEN", hide_env_values = true)]
  token: String,

  /// Project name or id owning the variables
  #[arg(short, long, env = "VERCEL_PROJECT")]
  project: String,

  /// Comma-separated names of the env variables to sync, in processing order
  #[arg(short, long, env = "ENV_VARIABLE_KEYS")]
  keys: String,

  /// Team id, for team-owned projects
  #[arg(long, env = "VERCEL_TEAM_ID")]
  team_id: Option<String>,

  /// Verbose output (-v for verbose, -vv for very verbose)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

fn setup_tracing(verbose: u8) {
  use tracing_subscriber::fmt;
  use tracing_subscriber::prelude::*;

  let log_level = match verbose {
    1 => "debug",
    2 => "trace",
    _ => "info",
  };

  tracing_subscriber::registry()
    .with(fmt::layer())
    .with(tracing_subscriber::EnvFilter::new(
      std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
    ))
    .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let cli = Cli::parse();

  setup_tracing(cli.verbose);

  let options = SyncOptions {
    token: cli.token,
    project: cli.project,
    team_id: cli.team_id,
    keys: cli.keys,
  };

  VercelSync::sync_with_options(options)?;

  Ok(())
}
