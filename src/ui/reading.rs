//! Reading panel rendering.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use sockwatch_types::{AlarmState, Sample, Threshold, PRESSURE_UNIT};

use crate::app::App;
use crate::data::duration::format_duration;

/// Render the latest reading with its verdict, the threshold and the alarm.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;

    let (value, value_style) = match (&app.last_sample, app.last_verdict) {
        (Some(sample), Some(verdict)) => (
            sample.value().to_string(),
            theme.verdict_style(verdict).add_modifier(Modifier::BOLD),
        ),
        _ => ("--".to_string(), theme.muted),
    };

    let verdict = match app.last_verdict {
        Some(v) if v.is_alert() => Span::styled("ALERT", theme.verdict_style(v)),
        Some(v) => Span::styled("normal", theme.verdict_style(v)),
        None => Span::styled("no reading yet", theme.muted),
    };

    let captured = app
        .last_sample
        .as_ref()
        .and_then(capture_time)
        .map(|t| format!("captured {}", t))
        .unwrap_or_default();

    let alarm = app.alarm_state();
    let alarm_label = match alarm {
        AlarmState::Sounding => "SOUNDING",
        AlarmState::Silent => "silent",
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(value, value_style)).alignment(Alignment::Center),
        Line::from(vec![verdict]).alignment(Alignment::Center),
        Line::from(Span::styled(captured, theme.muted)).alignment(Alignment::Center),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Threshold  ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(threshold_summary(app.threshold())),
        ]),
        Line::from(vec![
            Span::styled("  Polling    ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(format!(
                "every {} ({} mode)",
                format_duration(app.poll_period()),
                app.sample_kind()
            )),
        ]),
        Line::from(vec![
            Span::styled("  Alarm      ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(alarm_label, theme.alarm_style(alarm)),
        ]),
    ];

    let border = match app.last_verdict {
        Some(v) if v.is_alert() => theme.critical,
        _ => theme.border,
    };
    let block = Block::default()
        .title(Span::styled(" Reading ", theme.header))
        .borders(Borders::ALL)
        .border_type(theme.border_type)
        .border_style(Style::default().fg(border));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Describe when a threshold alerts.
pub fn threshold_summary(threshold: &Threshold) -> String {
    match threshold {
        Threshold::Numeric(v) => format!("alert above {:.2} {}", v, PRESSURE_UNIT),
        Threshold::Labels(labels) => format!(
            "alert on {}",
            labels.iter().cloned().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Local wall-clock time a sample was captured, as `HH:MM:SS`.
pub fn capture_time(sample: &Sample) -> Option<String> {
    let millis = i64::try_from(sample.timestamp_ms()).ok()?;
    let utc = chrono::DateTime::from_timestamp_millis(millis)?;
    Some(utc.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use sockwatch_types::SampleValue;

    use super::*;

    #[test]
    fn numeric_threshold_summary() {
        assert_eq!(
            threshold_summary(&Threshold::numeric(1015.0)),
            "alert above 1015.00 hPa"
        );
    }

    #[test]
    fn label_threshold_summary_is_sorted() {
        assert_eq!(
            threshold_summary(&Threshold::labels(["WALKING", "RUNNING"])),
            "alert on RUNNING, WALKING"
        );
    }

    #[test]
    fn capture_time_is_clock_formatted() {
        let sample = Sample::with_timestamp(SampleValue::Numeric(1000.0), 1_700_000_000_000);
        let time = capture_time(&sample).unwrap();
        assert_eq!(time.len(), 8);
        assert_eq!(time.matches(':').count(), 2);
    }
}
