mod config;
mod link;
mod station;

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use station::dispatcher::LineSource;

#[derive(Parser)]
#[command(name = "gcs-link")]
#[command(about = "Ground control station link for AlexAndros robot arms")]
#[command(version)]
struct Cli {
    /// Hostname or IP address of the arm controller
    host: String,

    /// UDP port of the arm controller
    port: u16,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level, overrides the configuration file
    #[arg(short, long)]
    log_level: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = match cli.config {
        Some(ref path) => config::Config::load(path).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config from {:?}: {}", path, e);
            eprintln!("Using default configuration");
            config::Config::default()
        }),
        None => config::Config::default(),
    };
    config.validate()?;

    // Initialize tracing/logging; stdout is reserved for the operator prompt
    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    info!("gcs-link v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!("Ground Control Station (GCS) for LiCAS arms");
    info!("===========================================");

    let destination = match link::resolve_destination(&cli.host, cli.port) {
        Ok(addr) => addr,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };
    info!("Arm controller at {} ({}:{})", destination, cli.host, cli.port);

    let link = match link::Link::open(destination) {
        Ok(link) => link,
        Err(e) => {
            error!("{:#}", e);
            return Err(e);
        }
    };

    info!("Enter a command code; a negative code ends the session.");
    let mut source = LineSource::stdin();
    station::run(link, &config.station, &mut source)?;

    info!("Session ended");
    Ok(())
}
