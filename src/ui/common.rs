//! Common UI components.
//!
//! This module contains the header bar, status bar, and help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use sockwatch_types::ConnectionState;

use crate::app::App;

/// Render the header bar.
///
/// Displays: connection indicator, transport, connection and session state.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let connection = app.connection_state();
    let session = app.session_state();
    let connection_style = app.theme.connection_style(&connection);

    let line = Line::from(vec![
        Span::styled(" ● ", connection_style),
        Span::styled("SOCKWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::raw(app.source_description().to_string()),
        Span::raw(" │ "),
        Span::styled(connection.label(), connection_style),
        Span::raw(" │ "),
        Span::styled(session.label(), app.theme.session_style(session)),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the status bar at the bottom.
///
/// Shows the temporary status message if any, otherwise the controls that
/// apply in the current state.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    // Check for temporary status message first
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = if app.alert.is_some() {
        "s:silence alarm o:ok"
    } else if app.threshold_input.is_some() {
        "Type a value | Enter:apply Esc:cancel"
    } else {
        match (app.connection_state(), app.session_state().is_active()) {
            (ConnectionState::Connected, true) => "space:stop t:threshold d:disconnect ?:help q:quit",
            (ConnectionState::Connected, false) => "space:start t:threshold d:disconnect ?:help q:quit",
            _ => "c:connect t:threshold ?:help q:quit",
        }
    };

    let status = match app.last_updated {
        Some(at) => format!(" Updated {:.1}s ago | {}", at.elapsed().as_secs_f64(), controls),
        None => format!(" {}", controls),
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));

    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the current view.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Connection",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  c         Connect to the sock"),
        Line::from("  d         Disconnect"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Monitoring",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  space     Start / stop monitoring"),
        Line::from("  t         Edit alert threshold"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " Alert prompt",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  s         Silence alarm"),
        Line::from("  o / Enter Close prompt, keep alarm"),
        Line::from(""),
        Line::from(vec![Span::styled(
            " General",
            Style::default().add_modifier(Modifier::BOLD),
        )]),
        Line::from("  ?         Toggle help"),
        Line::from("  q         Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let paragraph = Paragraph::new(help_text).block(block);
    let help_area = super::centered(area, 42, 24);

    // Clear the area behind the help
    frame.render_widget(Clear, help_area);
    frame.render_widget(paragraph, help_area);
}
