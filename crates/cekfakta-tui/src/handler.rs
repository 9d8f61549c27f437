use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tracing::warn;

use crate::app::App;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_query().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    app.status = None;

    if app.show_api_key_input {
        handle_api_key_input(app, key);
    } else {
        handle_chat_input(app, key);
    }
}

fn handle_chat_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::F(2) => app.open_api_key_input(),
        KeyCode::Enter => {
            if app.query_task.is_none() {
                app.submit();
            }
        }

        // Chat scrolling
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::PageUp => app.scroll_up(app.chat_height.max(1)),
        KeyCode::PageDown => app.scroll_down(app.chat_height.max(1)),

        // Line editing
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if app.cursor < app.input.chars().count() {
                let byte_pos = char_to_byte_index(&app.input, app.cursor);
                app.input.remove(byte_pos);
            }
        }
        KeyCode::Left => app.cursor = app.cursor.saturating_sub(1),
        KeyCode::Right => app.cursor = (app.cursor + 1).min(app.input.chars().count()),
        KeyCode::Home => app.cursor = 0,
        KeyCode::End => app.cursor = app.input.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.input, app.cursor);
            app.input.insert(byte_pos, c);
            app.cursor += 1;
        }
        _ => {}
    }
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_api_key_input(),
        KeyCode::Tab => app.api_key_target = app.api_key_target.toggle(),
        KeyCode::Enter => {
            if let Err(e) = app.save_api_key() {
                warn!(error = %e, "could not save API key");
                app.close_api_key_input();
                app.status = Some(format!("Could not save API key: {:#}", e));
            }
        }
        KeyCode::Backspace => {
            if app.api_key_input_cursor > 0 {
                app.api_key_input_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_input_cursor);
                app.api_key_input.remove(byte_pos);
            }
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.api_key_input, app.api_key_input_cursor);
            app.api_key_input.insert(byte_pos, c);
            app.api_key_input_cursor += 1;
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{test_app, wait_for_answer};
    use crate::app::KeyTarget;
    use cekfakta_core::Credentials;

    fn press(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, press(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[test]
    fn test_char_to_byte_index_handles_multibyte() {
        assert_eq!(char_to_byte_index("héllo", 2), 3);
        assert_eq!(char_to_byte_index("abc", 10), 3);
    }

    #[tokio::test]
    async fn test_typing_and_enter_submits() {
        let mut app = test_app(Credentials::new("g", "e"));
        type_text(&mut app, "berita").await;
        handle_event(&mut app, press(KeyCode::Left)).await.unwrap();
        handle_event(&mut app, press(KeyCode::Backspace)).await.unwrap();
        assert_eq!(app.input, "berta");

        handle_event(&mut app, press(KeyCode::Enter)).await.unwrap();
        wait_for_answer(&mut app).await;
        assert_eq!(app.session.transcript().len(), 2);
        assert_eq!(app.session.transcript().messages()[0].content, "berta");
    }

    #[tokio::test]
    async fn test_f2_popup_captures_keys() {
        let mut app = test_app(Credentials::new("g", "e"));
        handle_event(&mut app, press(KeyCode::F(2))).await.unwrap();
        assert!(app.show_api_key_input);

        handle_event(&mut app, press(KeyCode::Tab)).await.unwrap();
        assert_eq!(app.api_key_target, KeyTarget::Exa);

        type_text(&mut app, "xyz").await;
        assert_eq!(app.api_key_input, "xyz");
        assert!(app.input.is_empty());

        // Esc closes the popup instead of quitting
        handle_event(&mut app, press(KeyCode::Esc)).await.unwrap();
        assert!(!app.show_api_key_input);
        assert!(!app.should_quit);
    }

    #[tokio::test]
    async fn test_quit_keys() {
        let mut app = test_app(Credentials::new("g", "e"));
        handle_event(&mut app, press(KeyCode::Esc)).await.unwrap();
        assert!(app.should_quit);

        let mut app = test_app(Credentials::new("g", "e"));
        handle_event(&mut app, AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)))
            .await
            .unwrap();
        assert!(app.should_quit);
    }
}
