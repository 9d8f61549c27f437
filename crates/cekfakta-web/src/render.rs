//! HTML for the chat page.
//!
//! Rendering is a pure function of the transcript: the same transcript always
//! yields the same page.

use cekfakta_core::{ChatRole, Transcript, Verdict};
use markdown::Options;
use minijinja::{context, Environment};
use serde::Serialize;

pub const PAGE_TITLE: &str = "🔍 Cek Fakta & Berita";
pub const PAGE_CAPTION: &str = "Asisten verifikasi berita cerdas menggunakan Google Gemini & Exa";
pub const INPUT_PLACEHOLDER: &str = "Type your message here...";

/// One chat bubble as the template sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bubble {
    pub role: &'static str,
    pub avatar: &'static str,
    /// Markdown already converted to HTML. Raw HTML in the source is escaped.
    pub html: String,
    pub verdict: Option<Badge>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub label: &'static str,
    pub description: &'static str,
    pub class: &'static str,
}

impl From<Verdict> for Badge {
    fn from(verdict: Verdict) -> Self {
        let class = match verdict {
            Verdict::Valid => "verdict-valid",
            Verdict::Hoax => "verdict-hoax",
            Verdict::Clickbait => "verdict-clickbait",
            Verdict::Satire => "verdict-satire",
            Verdict::Opinion => "verdict-opinion",
            Verdict::Unverified => "verdict-unverified",
        };
        Self {
            label: verdict.as_str(),
            description: verdict.description(),
            class,
        }
    }
}

pub fn markdown_to_html(text: &str) -> String {
    markdown::to_html_with_options(text, &Options::gfm()).unwrap_or_else(|_| markdown::to_html(text))
}

pub fn bubbles(transcript: &Transcript) -> Vec<Bubble> {
    transcript
        .iter()
        .map(|message| {
            let verdict = match message.role {
                ChatRole::Assistant => Verdict::detect(&message.content).map(Badge::from),
                ChatRole::User => None,
            };
            Bubble {
                role: message.role.as_str(),
                avatar: match message.role {
                    ChatRole::User => "🧑",
                    ChatRole::Assistant => "🤖",
                },
                html: markdown_to_html(&message.content),
                verdict,
            }
        })
        .collect()
}

/// Compiled page templates.
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("chat.html", include_str!("../templates/chat.html"))?;
        env.add_template("error.html", include_str!("../templates/error.html"))?;
        Ok(Self { env })
    }

    pub fn chat(
        &self,
        session_id: &str,
        transcript: &Transcript,
        pending: bool,
        notice: Option<&str>,
    ) -> Result<String, minijinja::Error> {
        self.env.get_template("chat.html")?.render(context! {
            title => PAGE_TITLE,
            caption => PAGE_CAPTION,
            placeholder => INPUT_PLACEHOLDER,
            session_id => session_id,
            bubbles => bubbles(transcript),
            pending => pending,
            notice => notice,
        })
    }

    /// Page-level error shown when no agent could be created.
    pub fn error(&self, message: &str) -> Result<String, minijinja::Error> {
        self.env.get_template("error.html")?.render(context! {
            title => PAGE_TITLE,
            caption => PAGE_CAPTION,
            message => format!("Invalid API Key or configuration error: {}", message),
        })
    }
}
