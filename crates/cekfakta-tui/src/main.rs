//! cekfakta-tui – terminal chat front-end.
//!
//! One process, one session. Logs go to a file because the terminal is
//! owned by the UI.

mod app;
mod handler;
mod tui;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use cekfakta_core::ai::gemini::DEFAULT_MODEL;
use cekfakta_core::{Bootstrapper, Config};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use app::App;
use tui::{EventHandler, Tui};

#[tokio::main]
async fn main() -> Result<()> {
    let log_guard = init_logging()?;

    let config_path = std::env::var("CEKFAKTA_CONFIG").ok().map(PathBuf::from);
    let config = match &config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let model = config
        .default_model
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let bootstrapper = Bootstrapper::from_environment(config_path.clone())?;
    let session = match bootstrapper.start() {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Invalid API Key or configuration error: {}", e);
            eprintln!("Set GOOGLE_API_KEY and EXA_API_KEY, or add them to the config file.");
            drop(log_guard);
            std::process::exit(1);
        }
    };

    info!(version = env!("CARGO_PKG_VERSION"), %model, "cekfakta-tui starting");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(bootstrapper, session, model, config_path);

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    drop(log_guard);
    result
}

async fn run(terminal: &mut Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    if let Some(task) = app.query_task.take() {
        task.abort();
    }
    Ok(())
}

/// Log to `<cache_dir>/cekfakta/cekfakta-tui.log`, filtered by `CEKFAKTA_LOG`.
fn init_logging() -> Result<WorkerGuard> {
    let dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("cekfakta");
    std::fs::create_dir_all(&dir)?;

    let appender = tracing_appender::rolling::never(&dir, "cekfakta-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = std::env::var("CEKFAKTA_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = filter
        .parse::<tracing_subscriber::EnvFilter>()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
