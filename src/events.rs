use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::App;

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    if key.kind == KeyEventKind::Release {
        return;
    }

    // Ctrl-C always quits through the normal teardown
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.quit();
        return;
    }

    // The alert prompt captures all input until answered
    if app.alert.is_some() {
        match key.code {
            KeyCode::Char('s') | KeyCode::Char('S') => app.silence_alarm(),
            KeyCode::Char('o') | KeyCode::Char('O') | KeyCode::Enter | KeyCode::Esc => {
                app.dismiss_alert()
            }
            _ => {}
        }
        return;
    }

    if app.error.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_error();
        }
        return;
    }

    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.threshold_input.is_some() {
        handle_threshold_input(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') => app.connect(),
        KeyCode::Char('d') => app.disconnect(),
        KeyCode::Char(' ') | KeyCode::Char('m') => app.toggle_monitoring(),
        KeyCode::Char('t') => app.begin_threshold_edit(),
        KeyCode::Char('?') => app.toggle_help(),
        _ => {}
    }
}

/// Handle key input while the threshold editor is open
fn handle_threshold_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.apply_threshold(),
        KeyCode::Esc => app.cancel_threshold_edit(),
        KeyCode::Backspace => app.threshold_pop(),
        KeyCode::Char(c) if !c.is_control() => app.threshold_push(c),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sockwatch_types::Threshold;

    use super::*;
    use crate::alarm::{AlarmActuator, NotifierKind, SoundKind};
    use crate::session::SessionConfig;
    use crate::source::ScriptedTransport;
    use crate::supervisor::ConnectionSupervisor;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app(rt: &tokio::runtime::Runtime) -> App {
        let (_feeder, transport) = ScriptedTransport::create("events test");
        let (supervisor, connection_events) = ConnectionSupervisor::new(Arc::new(transport));
        let (alarm, prompts) = AlarmActuator::from_kinds(SoundKind::Silent, NotifierKind::Log);
        App::new(
            rt.handle().clone(),
            supervisor,
            connection_events,
            Arc::new(alarm),
            prompts,
            SessionConfig::default(),
        )
    }

    #[test]
    fn help_closes_on_any_key() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&rt);

        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert!(app.show_help);
        handle_key_event(&mut app, key(KeyCode::Char('x')));
        assert!(!app.show_help);
    }

    #[test]
    fn threshold_editor_consumes_typing() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&rt);

        handle_key_event(&mut app, key(KeyCode::Char('t')));
        for _ in 0..4 {
            handle_key_event(&mut app, key(KeyCode::Backspace));
        }
        for c in "1030".chars() {
            handle_key_event(&mut app, key(KeyCode::Char(c)));
        }
        // 'q' while editing is text, not quit
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        handle_key_event(&mut app, key(KeyCode::Backspace));
        handle_key_event(&mut app, key(KeyCode::Enter));

        assert!(app.running);
        assert!(app.threshold_input.is_none());
        assert_eq!(app.threshold(), &Threshold::numeric(1030.0));
    }

    #[test]
    fn error_dialog_blocks_other_keys() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&rt);

        handle_key_event(&mut app, key(KeyCode::Char(' ')));
        assert!(app.error.is_some());

        handle_key_event(&mut app, key(KeyCode::Char('t')));
        assert!(app.threshold_input.is_none());

        handle_key_event(&mut app, key(KeyCode::Enter));
        assert!(app.error.is_none());
    }

    #[test]
    fn quit_key_stops_the_app() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let mut app = app(&rt);

        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.running);
    }
}
