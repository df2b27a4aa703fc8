use std::time::Instant;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use docchat_core::forms::{Notice, NoticeKind};
use docchat_core::session::LOGOUT_PROMPT;
use docchat_core::view::{attachment_view, transcript_view};
use docchat_core::{ChatRole, PasswordStrength};
use crate::app::{App, ChatFocus, CredentialField, Screen};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Login | Screen::Register => render_credentials(app, frame, body_area),
        Screen::Chat => render_chat(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    // Popups
    if app.show_logout_confirm {
        render_logout_confirm(frame, area);
    } else if app.show_attach_input {
        render_attach_input(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" docchat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.server_url.clone(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.screen {
        Screen::Login => (" LOGIN ", Style::default().bg(Color::Blue).fg(Color::White)),
        Screen::Register => (" REGISTER ", Style::default().bg(Color::Magenta).fg(Color::White)),
        Screen::Chat => (" CHAT ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let keys: &[(&str, &str)] = if app.show_logout_confirm {
        &[(" y ", " logout "), (" n ", " stay ")]
    } else if app.show_attach_input {
        &[(" Enter ", " attach "), (" Esc ", " cancel ")]
    } else {
        match (app.screen, app.chat_focus) {
            (Screen::Login, _) => &[
                (" Tab ", " field "),
                (" Enter ", " sign in "),
                (" ^R ", " register "),
                (" Esc ", " quit "),
            ],
            (Screen::Register, _) => &[
                (" Tab ", " field "),
                (" Enter ", " create account "),
                (" ^R ", " sign in "),
                (" Esc ", " quit "),
            ],
            (Screen::Chat, ChatFocus::Input) => &[
                (" Enter ", " send "),
                (" S-Enter ", " newline "),
                (" ^O ", " attach "),
                (" Tab ", " files "),
                (" ^L ", " logout "),
            ],
            (Screen::Chat, ChatFocus::Attachments) => &[
                (" j/k ", " select "),
                (" d ", " remove "),
                (" Tab ", " message "),
            ],
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in keys {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
        spans.push(Span::raw(" "));
    }
    if app.has_pending_redirect() {
        spans.push(Span::styled(" redirecting ", Style::default().fg(Color::Green).italic()));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Center a fixed-size box inside `area`, shrinking it if needed
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn notice_line(notice: Option<&Notice>) -> Line<'static> {
    match notice {
        Some(n) => {
            let color = match n.kind {
                NoticeKind::Success => Color::Green,
                NoticeKind::Error => Color::Red,
            };
            Line::from(Span::styled(n.text.clone(), Style::default().fg(color).bold()))
        }
        None => Line::default(),
    }
}

fn strength_line(strength: Option<PasswordStrength>) -> Line<'static> {
    match strength {
        Some(s) => {
            let color = match s.style() {
                "strong" => Color::Green,
                "medium" => Color::Yellow,
                _ => Color::Red,
            };
            Line::from(Span::styled(s.message(), Style::default().fg(color)))
        }
        None => Line::default(),
    }
}

fn render_credentials(app: &mut App, frame: &mut Frame, area: Rect) {
    let registering = app.screen == Screen::Register;
    let now = Instant::now();

    let (title, username, password, busy, notice, strength, busy_label) = if registering {
        (
            " Create account ",
            app.register.username.as_str(),
            app.register.password.as_str(),
            app.register.is_busy(),
            app.register.visible_notice(now),
            Some(app.register.strength()),
            "Creating account",
        )
    } else {
        (
            " Sign in ",
            app.login.username.as_str(),
            app.login.password.as_str(),
            app.login.is_busy(),
            app.login.visible_notice(now),
            None,
            "Signing in",
        )
    };

    let height = if registering { 14 } else { 13 };
    let form_area = centered(area, 54, height);
    frame.render_widget(Clear, form_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let [user_area, pass_area, strength_area, notice_area, status_area, hint_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(if registering { 1 } else { 0 }),
        Constraint::Length(2),
        Constraint::Length(1),
        Constraint::Min(0),
    ])
    .areas(inner);

    let field_style = |field: CredentialField| {
        if app.credential_field == field {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::DarkGray)
        }
    };

    let user = Paragraph::new(username.to_string())
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(field_style(CredentialField::Username))
                .title(" Username "),
        );
    frame.render_widget(user, user_area);

    let masked = "*".repeat(password.chars().count());
    let pass = Paragraph::new(masked)
        .style(Style::default().fg(Color::Cyan))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(field_style(CredentialField::Password))
                .title(" Password "),
        );
    frame.render_widget(pass, pass_area);

    if let Some(strength) = strength {
        frame.render_widget(Paragraph::new(strength_line(strength)), strength_area);
    }

    frame.render_widget(
        Paragraph::new(notice_line(notice)).wrap(Wrap { trim: true }),
        notice_area,
    );

    let status = if busy {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        Line::from(Span::styled(
            format!("{}{}", busy_label, dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
    } else {
        Line::default()
    };
    frame.render_widget(Paragraph::new(status), status_area);

    let hint = if registering {
        "Already have an account? Ctrl+R to sign in"
    } else {
        "Don't have an account? Ctrl+R to register"
    };
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );

    // Cursor at the end of the focused field
    if !app.show_logout_confirm && !app.show_attach_input {
        let (field_area, len) = match app.credential_field {
            CredentialField::Username => (user_area, username.chars().count()),
            CredentialField::Password => (pass_area, password.chars().count()),
        };
        let max_x = field_area.width.saturating_sub(2);
        let x = (len as u16).min(max_x.saturating_sub(1));
        frame.set_cursor_position((field_area.x + 1 + x, field_area.y + 1));
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let attachments_height = if app.chat.attachments().is_empty() {
        0
    } else {
        (app.chat.attachments().len().min(4) + 2) as u16
    };
    let input_height = app.chat.input_rows() + 2;

    let [transcript_area, attachments_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(attachments_height),
        Constraint::Length(input_height),
    ])
    .areas(area);

    // Inner size for scroll calculations
    app.transcript_height = transcript_area.height.saturating_sub(2);
    app.transcript_width = transcript_area.width.saturating_sub(2);

    render_transcript(app, frame, transcript_area);

    if attachments_height > 0 {
        render_attachments(app, frame, attachments_area);
    }

    render_chat_input(app, frame, input_area);
}

fn render_transcript(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    let messages = transcript_view(app.chat.transcript());

    let text = if messages.is_empty() && !app.chat.is_sending() {
        Text::from(Span::styled(
            "Ask a question or attach documents with Ctrl+O...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &messages {
            let avatar_style = match msg.role {
                ChatRole::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ChatRole::Assistant => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            };
            lines.push(Line::from(Span::styled(format!("{}:", msg.avatar), avatar_style)));

            for file in &msg.files {
                lines.push(Line::from(Span::styled(
                    format!("  📁 {}", file),
                    Style::default().fg(Color::Magenta),
                )));
            }

            let body_style = if msg.is_error {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            for line in msg.body.lines() {
                lines.push(Line::from(Span::styled(line.to_string(), body_style)));
            }
            lines.push(Line::default());
        }

        if app.chat.is_sending() {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.transcript_scroll, 0));

    frame.render_widget(transcript, area);
}

fn render_attachments(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.chat_focus == ChatFocus::Attachments;
    let border_color = if focused { Color::Cyan } else { Color::Magenta };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" Files ({}) ", app.chat.attachments().len()));

    let items: Vec<ListItem> = attachment_view(app.chat.attachments())
        .into_iter()
        .map(|chip| ListItem::new(format!(" 📁 {}  ×", chip.label)))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Magenta)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.attachment_state);
}

fn render_chat_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.chat_focus == ChatFocus::Input && !app.show_attach_input && !app.show_logout_confirm;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.chat.is_sending() {
        " Message (sending...) "
    } else {
        " Message "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Locate the cursor as (row, column) within the multi-line input
    let before: String = app.chat.input.chars().take(app.chat_cursor).collect();
    let cursor_row = before.matches('\n').count() as u16;
    let cursor_col = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0);

    let visible_rows = area.height.saturating_sub(2);
    let row_offset = (cursor_row + 1).saturating_sub(visible_rows);

    let inner_width = area.width.saturating_sub(2) as usize;
    let col_offset = if inner_width == 0 || cursor_col < inner_width {
        0
    } else {
        cursor_col - inner_width + 1
    };

    let input = Paragraph::new(app.chat.input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(block)
        .scroll((row_offset, col_offset as u16));

    frame.render_widget(input, area);

    if editing {
        frame.set_cursor_position((
            area.x + 1 + (cursor_col - col_offset) as u16,
            (area.y + 1 + cursor_row).saturating_sub(row_offset),
        ));
    }
}

fn render_logout_confirm(frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 44, 5);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Logout ");

    let text = Text::from(vec![
        Line::from(LOGOUT_PROMPT),
        Line::from(Span::styled("y / n", Style::default().fg(Color::DarkGray))),
    ]);

    frame.render_widget(Paragraph::new(text).block(block), popup_area);
}

fn render_attach_input(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 64, 7);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Attach file ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Type or paste a file path. Enter to attach, Esc to cancel.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    // Keep the tail of long paths in view
    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);
    let width = input_area.width as usize;
    let char_count = app.attach_input.chars().count();
    let skip = (char_count + 1).saturating_sub(width);
    let visible: String = app.attach_input.chars().skip(skip).collect();

    frame.render_widget(
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan)),
        input_area,
    );
    frame.set_cursor_position((input_area.x + char_count.saturating_sub(skip) as u16, input_area.y));

    if let Some(error) = &app.attach_error {
        let status = Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red));
        frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
    }
}
