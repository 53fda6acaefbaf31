//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;
use sockwatch_types::{AlarmState, ConnectionState, SessionState, Verdict};

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for transitional states (connecting).
    pub warning: Color,
    /// Color for alerts and errors.
    pub critical: Color,
    /// Color for normal readings and an open link.
    pub healthy: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for panel titles.
    pub header: Style,
    /// Style for inactive or missing values.
    pub muted: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            muted: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            muted: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Get style for a verdict
    pub fn verdict_style(&self, verdict: Verdict) -> Style {
        match verdict {
            Verdict::Normal => Style::default().fg(self.healthy),
            Verdict::Alert => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
        }
    }

    pub fn connection_style(&self, state: &ConnectionState) -> Style {
        match state {
            ConnectionState::Connected => Style::default().fg(self.healthy),
            ConnectionState::Connecting => Style::default().fg(self.warning),
            ConnectionState::Disconnected => self.muted,
            ConnectionState::Error(_) => Style::default().fg(self.critical),
        }
    }

    pub fn session_style(&self, state: SessionState) -> Style {
        match state {
            SessionState::Polling => Style::default().fg(self.healthy),
            SessionState::AlertPending => {
                Style::default().fg(self.critical).add_modifier(Modifier::BOLD)
            }
            SessionState::Idle | SessionState::Stopped => self.muted,
        }
    }

    pub fn alarm_style(&self, state: AlarmState) -> Style {
        match state {
            AlarmState::Silent => self.muted,
            AlarmState::Sounding => Style::default()
                .fg(self.critical)
                .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
        }
    }
}
