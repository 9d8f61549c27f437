use std::path::PathBuf;

use cekfakta_core::answer::invoke_agent;
use cekfakta_core::{Bootstrapper, Config, Session, TurnState};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Which provider key the F2 popup edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTarget {
    Google,
    Exa,
}

impl KeyTarget {
    pub fn display_name(&self) -> &'static str {
        match self {
            KeyTarget::Google => "Google Gemini",
            KeyTarget::Exa => "Exa",
        }
    }

    pub fn env_var(&self) -> &'static str {
        match self {
            KeyTarget::Google => cekfakta_core::config::GOOGLE_API_KEY_ENV,
            KeyTarget::Exa => cekfakta_core::config::EXA_API_KEY_ENV,
        }
    }

    pub fn toggle(&self) -> Self {
        match self {
            KeyTarget::Google => KeyTarget::Exa,
            KeyTarget::Exa => KeyTarget::Google,
        }
    }
}

pub struct App {
    pub should_quit: bool,

    // Session
    pub bootstrapper: Bootstrapper,
    pub session: Session,
    pub model: String,
    pub config_path: Option<PathBuf>,

    // Chat input
    pub input: String,
    pub cursor: usize, // cursor position in chars
    pub query_task: Option<JoinHandle<Result<String, String>>>,

    // Chat pane
    pub scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,
    pub api_key_target: KeyTarget,

    /// One-line message in the footer, cleared on the next keypress.
    pub status: Option<String>,
}

impl App {
    pub fn new(bootstrapper: Bootstrapper, session: Session, model: String, config_path: Option<PathBuf>) -> Self {
        Self {
            should_quit: false,
            bootstrapper,
            session,
            model,
            config_path,
            input: String::new(),
            cursor: 0,
            query_task: None,
            scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            api_key_target: KeyTarget::Google,
            status: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.session.state() == TurnState::AwaitingResponse
    }

    /// Send the input line as a new turn. The agent runs in a background
    /// task; [`poll_query`](Self::poll_query) picks up the answer.
    pub fn submit(&mut self) {
        let messages = match self.session.begin_turn(&self.input) {
            Ok(messages) => messages,
            Err(e) => {
                self.status = Some(e.to_string());
                return;
            }
        };

        self.input.clear();
        self.cursor = 0;

        let agent = self.session.agent();
        self.query_task = Some(tokio::spawn(async move { invoke_agent(agent.as_ref(), messages).await }));
        self.scroll_to_bottom();
    }

    /// Record the answer once the background task has finished.
    pub async fn poll_query(&mut self) {
        if !self.query_task.as_ref().is_some_and(|task| task.is_finished()) {
            return;
        }
        let Some(task) = self.query_task.take() else {
            return;
        };

        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => Err(format!("An error occurred: {}", e)),
        };
        self.session.complete_turn(outcome);
        self.animation_frame = 0;
        self.scroll_to_bottom();
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    /// Rebuild the agent if the keys changed. A failed rebuild keeps the
    /// current session and reports the error in the footer.
    pub fn refresh_session(&mut self) {
        match self.bootstrapper.refresh(&mut self.session) {
            Ok(true) => {
                info!("credentials changed; conversation reset");
                self.scroll = 0;
                self.status = Some("API keys changed, so a new conversation was started.".to_string());
            }
            Ok(false) => {}
            Err(e) => {
                warn!(error = %e, "could not rebuild agent");
                self.status = Some(format!("Invalid API Key or configuration error: {}", e));
            }
        }
    }

    pub fn open_api_key_input(&mut self) {
        self.show_api_key_input = true;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    pub fn close_api_key_input(&mut self) {
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    /// Write the entered key to the config file and pick it up.
    pub fn save_api_key(&mut self) -> anyhow::Result<()> {
        let key = self.api_key_input.trim().to_string();
        if key.is_empty() {
            self.close_api_key_input();
            return Ok(());
        }

        let path = match &self.config_path {
            Some(path) => path.clone(),
            None => Config::get_config_path()?,
        };
        let mut config = Config::load_from(&path)?;
        match self.api_key_target {
            KeyTarget::Google => config.google_api_key = Some(key),
            KeyTarget::Exa => config.exa_api_key = Some(key),
        }
        config.save_to(&path)?;
        info!(target = self.api_key_target.display_name(), "API key saved");

        self.close_api_key_input();
        if std::env::var(self.api_key_target.env_var()).is_ok() {
            self.status = Some(format!(
                "Saved, but {} is set in the environment and takes precedence.",
                self.api_key_target.env_var()
            ));
            return Ok(());
        }

        self.refresh_session();
        Ok(())
    }

    /// Scroll chat to bottom so the latest message is visible
    pub fn scroll_to_bottom(&mut self) {
        let wrap_width = if self.chat_width > 0 { self.chat_width as usize } else { 50 };

        let mut total_lines: usize = 0;
        for msg in self.session.transcript().iter() {
            // Role line, wrapped content, blank separator
            let content: usize = msg
                .content
                .lines()
                .map(|line| line.chars().count() / wrap_width + 1)
                .fold(0, usize::saturating_add);
            total_lines = total_lines.saturating_add(content).saturating_add(2);
        }

        if self.is_loading() {
            total_lines = total_lines.saturating_add(2); // "AI:" + "Thinking..."
        }

        let total_lines = u16::try_from(total_lines).unwrap_or(u16::MAX);
        let visible_height = if self.chat_height > 0 { self.chat_height } else { 20 };
        self.scroll = total_lines.saturating_sub(visible_height);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines);
    }
}
