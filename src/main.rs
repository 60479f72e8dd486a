//! quackpad server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use quackpad::session::SessionRegistry;
use quackpad::web::{self, AppState};

/// Query uploaded CSV and JSON files with SQL, in the browser.
#[derive(Parser, Debug)]
#[command(name = "quackpad")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind to
    #[arg(long, default_value = "3380")]
    port: u16,

    /// Session inactivity timeout in minutes
    #[arg(long, default_value = "30")]
    session_timeout_mins: u64,

    /// Idle-session cleanup interval in seconds
    #[arg(long, default_value = "60")]
    cleanup_interval_secs: u64,

    /// Maximum file upload size in megabytes
    #[arg(long, default_value = "50")]
    upload_limit_mb: usize,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let filter = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    let registry = Arc::new(SessionRegistry::new(Duration::from_secs(
        args.session_timeout_mins * 60,
    )));

    tokio::spawn(evict_idle_sessions(
        registry.clone(),
        args.cleanup_interval_secs,
    ));

    let state = AppState {
        sessions: registry,
        upload_limit_bytes: args.upload_limit_mb * 1024 * 1024,
    };
    let app = web::router(state);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid bind address: {}:{}", args.host, args.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    println!("quackpad listening on http://{addr}");
    tracing::info!(%addr, "server started");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically evict sessions that have been idle past the timeout.
async fn evict_idle_sessions(registry: Arc<SessionRegistry>, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        ticker.tick().await;
        let evicted = registry.remove_expired();
        if evicted > 0 {
            tracing::info!(evicted, "cleaned up idle sessions");
        }
    }
}
