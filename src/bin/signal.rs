//! Huddle Signal Server
//!
//! Signaling relay for peer-to-peer audio/video rooms.
//!
//! # Usage
//!
//! ```bash
//! huddle-signal --port 3000
//! ```
//!
//! `GET /api/rooms` on the same port returns the active room listing.

use std::net::SocketAddr;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use huddle_signal::{SignalServer, DEFAULT_PORT};

#[derive(Parser, Debug)]
#[command(name = "huddle-signal")]
#[command(about = "Signaling relay for peer-to-peer audio/video rooms")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "PORT")]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    info!("Starting Huddle Signal Server");

    let server = SignalServer::new();
    server.serve(addr).await?;

    Ok(())
}
