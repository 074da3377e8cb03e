//! Sesame - LDAP-backed login & consent provider
//!
//! Identity provider for an ORY-Hydra-style authorization server, backed by
//! an LDAP directory.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sesame_core::config::AppConfig;
use sesame_server::Server;

#[derive(Parser)]
#[command(name = "sesame")]
#[command(version = sesame_core::VERSION)]
#[command(about = "LDAP-backed login & consent provider", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "SESAME_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, env = "SESAME_PORT")]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SESAME_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();

    let mut config = if let Some(path) = &cli.config {
        AppConfig::from_file(path)?
    } else {
        AppConfig::default()
    };
    config.apply_env();

    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Malformed configuration is fatal here, before any request is served.
    config.validate()?;

    Server::new(config).run().await
}
