//! edlink — remote control server for editor sessions.
//!
//! `edlink serve` binds the HTTP control endpoint, prints a pairing QR code,
//! and dispatches authenticated tool invocations onto a capability target.
//! The standalone binary logs actions instead of driving a real editor;
//! editor integrations embed the library and supply their own target.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser as ClapParser, Subcommand};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edlink::config::{ConfigError, ControlConfig};
use edlink::control::{ControlError, ControlService};
use edlink::pairing::PairingError;
use edlink::target::TracingTarget;

/// edlink - editor remote control
///
/// Pair a device by scanning the printed QR code, then drive the editor
/// through the HTTP control endpoint.
#[derive(ClapParser, Debug)]
#[command(name = "edlink", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the remote control server and print the pairing code
    Serve {
        /// Path to the TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Host address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Static bearer token for the HTTP pipeline (overrides config)
        #[arg(long, env = "EDLINK_TOKEN")]
        token: Option<String>,

        /// Skip rendering the pairing QR code
        #[arg(long)]
        no_qr: bool,
    },
}

#[derive(Error, Debug)]
pub enum EdlinkError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("control service error: {0}")]
    Control(#[from] ControlError),

    #[error("pairing error: {0}")]
    Pairing(#[from] PairingError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), EdlinkError> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            token,
            no_qr,
        } => run_serve(config, host, port, token, no_qr).await,
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "edlink=info,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run_serve(
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    token: Option<String>,
    no_qr: bool,
) -> Result<(), EdlinkError> {
    let mut config = match &config_path {
        Some(path) => ControlConfig::load(path)?.ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", path.display()),
            )
        })?,
        // Without a config file, `serve` means serve: the network feature
        // is on and an explicit config is the way to turn it off.
        None => {
            let mut config = ControlConfig::default();
            config.network.enabled = true;
            config
        }
    };

    if let Some(host) = host {
        config.network.host = host;
    }
    if let Some(port) = port {
        config.network.port = port;
    }
    if let Some(token) = token {
        config.network.auth_token = Some(token);
    }

    let service = ControlService::new(config.network, Arc::new(TracingTarget))?;
    let payload = service.start().await?;

    eprintln!("edlink: pairing code contains the API key; only show it to trusted devices.");
    if no_qr {
        println!("{}", payload.to_json()?);
    } else {
        println!("{}", payload.qr_string()?);
        println!("{}", payload.to_json()?);
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    service.stop().await;

    Ok(())
}
