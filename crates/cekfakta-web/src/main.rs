//! cekfakta – browser chat server.
//!
//! Startup order:
//! 1. Parse configuration from environment variables.
//! 2. Initialise structured tracing (JSON or pretty).
//! 3. Load the agent settings from the config file.
//! 4. Start the idle-session sweeper.
//! 5. Build the Axum router and start the HTTP server with graceful shutdown.

mod config;
mod error;
mod middleware;
mod render;
mod routes;
mod state;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use cekfakta_core::Bootstrapper;
use tracing::{info, warn};

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration ───────────────────────────────────────────────────────
    let cfg = Config::from_env();

    // ── 2. Tracing ─────────────────────────────────────────────────────────────
    let env_filter = match cfg.log_level.parse::<tracing_subscriber::EnvFilter>() {
        Ok(f) => f,
        Err(e) => {
            eprintln!(
                "WARN: CEKFAKTA_LOG='{}' is not a valid tracing filter ({}); \
                 falling back to 'info'",
                cfg.log_level, e
            );
            tracing_subscriber::EnvFilter::new("info")
        }
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    if cfg.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!(version = env!("CARGO_PKG_VERSION"), "cekfakta starting");

    // ── 3. Agent settings ──────────────────────────────────────────────────────
    // Keys are resolved per session, so a missing key only fails the page,
    // not the server.
    let bootstrapper = Bootstrapper::from_environment(cfg.config_path.clone())?;

    // ── 4. Shared application state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(&cfg, bootstrapper)?);
    let sweeper = state.sessions.spawn_sweeper();
    info!(ttl_secs = cfg.session_ttl.as_secs(), "session sweeper started");

    // ── 5. HTTP server with graceful shutdown ──────────────────────────────────
    let app = routes::build(Arc::clone(&state));
    let addr: SocketAddr = cfg.bind_address.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("cekfakta stopped");
    Ok(())
}

/// Returns a future that resolves when SIGINT (Ctrl-C) or SIGTERM is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install CTRL+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received; starting graceful shutdown");
}
