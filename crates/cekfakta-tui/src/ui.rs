use cekfakta_core::{ChatRole, Verdict};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

const TITLE: &str = " 🔍 Cek Fakta & Berita ";
const CAPTION: &str = "Asisten verifikasi berita cerdas menggunakan Google Gemini & Exa";

fn verdict_color(verdict: Verdict) -> Color {
    match verdict {
        Verdict::Valid => Color::Green,
        Verdict::Hoax => Color::Red,
        Verdict::Clickbait => Color::LightRed,
        Verdict::Satire => Color::Magenta,
        Verdict::Opinion => Color::Blue,
        Verdict::Unverified => Color::Gray,
    }
}

/// Turn `**bold**` runs into bold spans. An unmatched `**` stays literal.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let pieces: Vec<&str> = text.split("**").collect();
    // An even piece count means the last marker is never closed
    let closed = if pieces.len() % 2 == 0 { pieces.len() - 1 } else { pieces.len() };

    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut plain = String::new();
    for (i, piece) in pieces[..closed].iter().enumerate() {
        if i % 2 == 0 {
            plain.push_str(piece);
        } else if !piece.is_empty() {
            if !plain.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut plain)));
            }
            spans.push(Span::styled(piece.to_string(), Style::default().add_modifier(Modifier::BOLD)));
        }
    }
    if let Some(rest) = pieces.get(closed) {
        plain.push_str("**");
        plain.push_str(rest);
    }
    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }

    Line::from(spans)
}

fn role_label(label: &'static str, color: Color) -> Span<'static> {
    Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD))
}

/// Show the last four characters of a key, mask the rest.
fn mask_key(key: &str) -> String {
    let len = key.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let last_four: String = key.chars().skip(len - 4).collect();
    format!("{}...{}", "*".repeat((len - 4).min(20)), last_four)
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(TITLE, Style::default().fg(Color::Cyan).bold()),
            Span::styled(
                format!("v{}", env!("CARGO_PKG_VERSION")),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
        Line::from(Span::styled(format!(" {}", CAPTION), Style::default().fg(Color::DarkGray))),
    ]);
    frame.render_widget(header, area);
}

fn chat_lines(app: &App) -> Text<'static> {
    let transcript = app.session.transcript();
    if transcript.is_empty() && !app.is_loading() {
        return Text::from(Span::styled(
            "Paste a headline or claim to fact-check...",
            Style::default().fg(Color::DarkGray),
        ));
    }

    let mut lines: Vec<Line> = Vec::new();
    for msg in transcript.iter() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(role_label("You:", Color::Cyan)));
                lines.push(Line::from(msg.content.clone()));
            }
            ChatRole::Assistant => {
                let mut role_line = vec![role_label("AI:", Color::Yellow)];
                if let Some(verdict) = Verdict::detect(&msg.content) {
                    role_line.push(Span::raw(" "));
                    role_line.push(Span::styled(
                        format!(" {} ", verdict.as_str()),
                        Style::default().bg(verdict_color(verdict)).fg(Color::Black).bold(),
                    ));
                }
                lines.push(Line::from(role_line));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(Line::from(role_label("AI:", Color::Yellow)));
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Inner size minus borders, for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" Gemini: {} ", app.model));

    let chat = Paragraph::new(chat_lines(app))
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let border_color = if app.is_loading() { Color::DarkGray } else { Color::Yellow };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Type your message here... ");

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width > 0 && app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input.chars().skip(scroll_offset).take(inner_width).collect();
    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if !app.show_api_key_input {
        let cursor_x = (app.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().fg(Color::White);

    let line = match &app.status {
        Some(status) => Line::from(Span::styled(format!(" {} ", status), Style::default().fg(Color::Yellow))),
        None => Line::from(vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" ↑↓ ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" F2 ", key_style),
            Span::styled(" API key ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" quit ", label_style),
        ]),
    };

    frame.render_widget(Paragraph::new(line), area);
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    // Centered popup
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7;
    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(format!(" Enter API Key for {} ", app.api_key_target.display_name()));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Enter to save, Tab to switch provider, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let input = Paragraph::new(mask_key(&app.api_key_input)).style(Style::default().fg(Color::Cyan));
    frame.render_widget(input, input_area);

    let cursor_x = app.api_key_input_cursor.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let status = Paragraph::new(format!("{} characters", app.api_key_input.chars().count()))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}
