//! Runnable guessduel server.
//!
//! Listens on `0.0.0.0:$PORT` (default 3000). Log verbosity follows
//! `RUST_LOG`, defaulting to `info`.

use guessduel::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_PORT: u16 = 3000;

fn init_log() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

/// Reads the listening port, falling back to the default on absence or junk.
fn port_from(raw: Option<String>) -> u16 {
    match raw {
        None => DEFAULT_PORT,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(value = %raw, default = DEFAULT_PORT, "invalid PORT, using default");
            DEFAULT_PORT
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_log();

    let port = port_from(std::env::var("PORT").ok());
    let server = GuessduelServer::builder()
        .bind(&format!("0.0.0.0:{port}"))
        .build()
        .await?;
    tracing::info!(addr = %server.local_addr()?, "guessduel listening");

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
