//! panic-resolver
//!
//! A small HTTP server whose every request runs behind panic recovery.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ axum (request id, trace, timeout)
//!                 │
//!                 ▼
//!           worker task ──▶ Recovery ──▶ ResponseBuffer ──▶ Router ──▶ handler
//!                 │             │
//!                 │             ├─ ok:    flush buffer
//!                 │             └─ panic: drop buffer, write error page
//!                 ▼
//!   Client ◀── HttpSink (streamed response)
//! ```

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tokio::net::TcpListener;

use panic_resolver::config::{self, AppConfig, Mode};
use panic_resolver::lifecycle::{signals, Shutdown};
use panic_resolver::observability::logging;
use panic_resolver::HttpServer;

#[derive(Parser)]
#[command(name = "panic-resolver")]
#[command(about = "HTTP server that recovers from handler panics", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override recovery.mode.
    #[arg(short, long, value_enum)]
    mode: Option<CliMode>,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliMode {
    Dev,
    Prod,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Dev => Mode::Development,
            CliMode::Prod => Mode::Production,
        }
    }
}

fn load(cli: &Cli) -> Result<AppConfig, config::ConfigError> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if let Some(mode) = cli.mode {
        config.recovery.mode = mode.into();
    }
    config::validate_config(&config).map_err(config::ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    logging::init(&config.observability)?;

    tracing::info!("panic-resolver v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        mode = %config.recovery.mode,
        debug_path = %config.recovery.debug_path,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );
    if config.recovery.mode.is_dev() {
        tracing::warn!(
            debug_path = %config.recovery.debug_path,
            "Development mode: panic traces and the source viewer are exposed to clients"
        );
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = HttpServer::new(config)?;

    tokio::spawn(async move {
        signals::trigger_on_signal(&shutdown).await;
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
