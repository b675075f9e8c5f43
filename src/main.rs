use clap::Parser;
use tracing_subscriber::EnvFilter;

use monk_listener::cli::{self, Cli};

fn main() -> anyhow::Result<()> {
    // Load .env if present so LISTENER_* and CACHE_* overrides apply
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = monk_listener::config::config();
    tracing::info!("Starting monk-listener in {:?} mode", config.environment);

    if let Err(e) = cli::run(Cli::parse()) {
        match std::env::var("CLI_VERBOSE").as_deref() {
            Ok("true") | Ok("1") => eprintln!("Error: {e:?}"),
            _ => eprintln!("Error: {e}"),
        }
        std::process::exit(1);
    }

    Ok(())
}
