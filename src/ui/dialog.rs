//! Modal overlays.
//!
//! The alert prompt mirrors the phone alert the sock app shows: a title,
//! the triggering reading and two answers, "Silence Alarm" and "OK".

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use sockwatch_types::SampleKind;

use crate::app::App;

/// Render the alert acknowledgement prompt.
pub fn render_alert(frame: &mut Frame, app: &App, area: Rect) {
    let Some(prompt) = &app.alert else {
        return;
    };
    let theme = &app.theme;

    let lines = vec![
        Line::from(""),
        Line::from(prompt.message.clone()).alignment(Alignment::Center),
        Line::from(""),
        Line::from(vec![
            Span::styled(
                "[s] Silence Alarm",
                Style::default().fg(theme.critical).add_modifier(Modifier::BOLD),
            ),
            Span::raw("      "),
            Span::styled("[o] OK", Style::default().add_modifier(Modifier::BOLD)),
        ])
        .alignment(Alignment::Center),
    ];

    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", prompt.title),
            Style::default().fg(theme.critical).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.critical));

    let rect = super::centered(area, 60, 8);
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        rect,
    );
}

/// Render a blocking error message.
pub fn render_error(frame: &mut Frame, app: &App, area: Rect) {
    let Some(error) = &app.error else {
        return;
    };
    let theme = &app.theme;

    let lines = vec![
        Line::from(""),
        Line::from(error.message.clone()),
        Line::from(""),
        Line::from(Span::styled("Press Enter to close", theme.muted)).alignment(Alignment::Center),
    ];

    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", error.title),
            Style::default().fg(theme.warning).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.warning));

    let rect = super::centered(area, 56, 8);
    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        rect,
    );
}

/// Render the threshold editor.
pub fn render_threshold_input(frame: &mut Frame, app: &App, area: Rect) {
    let Some(input) = &app.threshold_input else {
        return;
    };
    let theme = &app.theme;

    let hint = match app.sample_kind() {
        SampleKind::Numeric => "Pressure in hPa, e.g. 1015",
        SampleKind::Label => "Comma-separated labels, e.g. WALKING,RUNNING",
    };

    let lines = vec![
        Line::from(vec![
            Span::raw(" > "),
            Span::styled(input.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]),
        Line::from(Span::styled(format!(" {}", hint), theme.muted)),
    ];

    let block = Block::default()
        .title(Span::styled(" Alert Threshold ", theme.header))
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(theme.highlight));

    let rect = super::centered(area, 50, 4);
    frame.render_widget(Clear, rect);
    frame.render_widget(Paragraph::new(lines).block(block), rect);
}
