use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, ChatFocus, CredentialField, Screen};
use crate::tui::AppEvent;
use docchat_core::forms::{LOGIN_ROUTE, REGISTER_ROUTE};

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize | AppEvent::Tick => {}
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    if app.show_logout_confirm {
        handle_logout_confirm(app, key);
        return;
    }

    if app.show_attach_input {
        handle_attach_input(app, key);
        return;
    }

    match app.screen {
        Screen::Login | Screen::Register => handle_credentials(app, key),
        Screen::Chat => match app.chat_focus {
            ChatFocus::Input => handle_chat_input(app, key),
            ChatFocus::Attachments => handle_chat_attachments(app, key),
        },
    }
}

fn handle_logout_confirm(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_logout(),
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.show_logout_confirm = false,
        _ => {}
    }
}

fn handle_attach_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_attach_input = false;
            app.attach_input.clear();
            app.attach_error = None;
        }
        KeyCode::Enter => app.attach_from_input(),
        KeyCode::Backspace => {
            app.attach_input.pop();
        }
        KeyCode::Char(c) => app.attach_input.push(c),
        _ => {}
    }
}

/// Login and registration share one layout: two fields and a submit
fn handle_credentials(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.should_quit = true,

        // Enter submits whichever field has focus, unless a request is pending
        KeyCode::Enter => match app.screen {
            Screen::Login => app.submit_login(),
            Screen::Register => app.submit_register(),
            Screen::Chat => {}
        },

        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            app.credential_field = app.credential_field.toggle();
        }

        // Switch between sign in and sign up
        KeyCode::Char('r') if ctrl => {
            let route = match app.screen {
                Screen::Login => REGISTER_ROUTE,
                _ => LOGIN_ROUTE,
            };
            app.navigate(route);
        }

        KeyCode::Backspace => {
            focused_credential(app).pop();
        }
        KeyCode::Char(c) if !ctrl => focused_credential(app).push(c),
        _ => {}
    }
}

fn focused_credential(app: &mut App) -> &mut String {
    let form = match app.screen {
        Screen::Register => (&mut app.register.username, &mut app.register.password),
        _ => (&mut app.login.username, &mut app.login.password),
    };
    match app.credential_field {
        CredentialField::Username => form.0,
        CredentialField::Password => form.1,
    }
}

fn handle_chat_input(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.should_quit = true,

        // Shift+Enter keeps the newline; Alt+Enter for terminals that don't report Shift
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            insert_chat_char(app, '\n');
        }
        KeyCode::Enter => app.submit_chat(),

        KeyCode::Char('o') if ctrl => app.open_attach_input(),
        KeyCode::Char('l') if ctrl => app.show_logout_confirm = true,
        KeyCode::Tab => app.focus_attachments(),

        KeyCode::PageUp => app.scroll_transcript_up(app.transcript_height.max(2) / 2),
        KeyCode::PageDown => app.scroll_transcript_down(app.transcript_height.max(2) / 2),

        KeyCode::Backspace => {
            if app.chat_cursor > 0 {
                app.chat_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.chat.input, app.chat_cursor);
                app.chat.input.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.chat.input.chars().count();
            if app.chat_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.chat.input, app.chat_cursor);
                app.chat.input.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.chat_cursor = app.chat_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.chat.input.chars().count();
            app.chat_cursor = (app.chat_cursor + 1).min(char_count);
        }
        KeyCode::Home => app.chat_cursor = 0,
        KeyCode::End => app.chat_cursor = app.chat.input.chars().count(),
        KeyCode::Char(c) if !ctrl => insert_chat_char(app, c),
        _ => {}
    }
}

fn insert_chat_char(app: &mut App, c: char) {
    let byte_pos = char_to_byte_index(&app.chat.input, app.chat_cursor);
    app.chat.input.insert(byte_pos, c);
    app.chat_cursor += 1;
}

fn handle_chat_attachments(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Tab | KeyCode::Esc => app.chat_focus = ChatFocus::Input,
        KeyCode::Char('j') | KeyCode::Down => app.attachment_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.attachment_nav_up(),
        KeyCode::Char('d') | KeyCode::Char('x') | KeyCode::Delete | KeyCode::Backspace => {
            app.remove_selected_attachment();
        }
        _ => {}
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.show_attach_input {
        app.attach_input.push_str(text.trim_end_matches(['\r', '\n']));
        return;
    }

    match app.screen {
        Screen::Chat if app.chat_focus == ChatFocus::Input && !app.show_logout_confirm => {
            for c in text.chars().filter(|c| *c != '\r') {
                insert_chat_char(app, c);
            }
        }
        Screen::Login | Screen::Register if !app.show_logout_confirm => {
            let line = text.lines().next().unwrap_or_default();
            focused_credential(app).push_str(line);
        }
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.screen != Screen::Chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_transcript_down(3),
        MouseEventKind::ScrollUp => app.scroll_transcript_up(3),
        _ => {}
    }
}
