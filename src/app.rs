//! Application state and user actions.
//!
//! The TUI loop is synchronous; every action that needs the async core
//! (connect, start, silence) is run to completion on the runtime handle.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sockwatch_types::{
    AlarmState, ConnectionState, Sample, SampleKind, SessionState, Threshold, Verdict,
};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::alarm::{Alarm, AlarmActuator, AlertPrompt, Resolution};
use crate::session::{MonitoringSession, SessionConfig, SessionError, SessionEvent, StopReason};
use crate::supervisor::{ConnectionEvent, ConnectionSupervisor};
use crate::ui::Theme;

/// A blocking message the user must dismiss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDialog {
    pub title: String,
    pub message: String,
}

impl ErrorDialog {
    fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,

    runtime: Handle,
    supervisor: ConnectionSupervisor,
    connection_events: mpsc::UnboundedReceiver<ConnectionEvent>,
    alarm: Arc<AlarmActuator>,
    prompts: mpsc::UnboundedReceiver<AlertPrompt>,
    description: String,

    // Template for the next session; holds the threshold while idle
    session_config: SessionConfig,
    session: Option<MonitoringSession>,
    session_events: Option<mpsc::UnboundedReceiver<SessionEvent>>,

    pub last_sample: Option<Sample>,
    pub last_verdict: Option<Verdict>,
    pub last_updated: Option<Instant>,

    // Modal dialogs
    pub alert: Option<AlertPrompt>,
    pub error: Option<ErrorDialog>,
    pub threshold_input: Option<String>,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,
}

impl App {
    pub fn new(
        runtime: Handle,
        supervisor: ConnectionSupervisor,
        connection_events: mpsc::UnboundedReceiver<ConnectionEvent>,
        alarm: Arc<AlarmActuator>,
        prompts: mpsc::UnboundedReceiver<AlertPrompt>,
        session_config: SessionConfig,
    ) -> Self {
        let description = supervisor.transport().description().to_string();
        Self {
            running: true,
            show_help: false,
            runtime,
            supervisor,
            connection_events,
            alarm,
            prompts,
            description,
            session_config,
            session: None,
            session_events: None,
            last_sample: None,
            last_verdict: None,
            last_updated: None,
            alert: None,
            error: None,
            threshold_input: None,
            theme: Theme::auto_detect(),
            status_message: None,
        }
    }

    /// Returns a description of the transport.
    pub fn source_description(&self) -> &str {
        &self.description
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.supervisor.state()
    }

    pub fn session_state(&self) -> SessionState {
        self.session
            .as_ref()
            .map(|s| s.state())
            .unwrap_or_default()
    }

    pub fn alarm_state(&self) -> AlarmState {
        self.alarm.state()
    }

    pub fn threshold(&self) -> &Threshold {
        &self.session_config.threshold
    }

    pub fn sample_kind(&self) -> SampleKind {
        self.session_config.kind
    }

    pub fn poll_period(&self) -> Duration {
        self.session_config.period
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired (3 seconds).
    pub fn get_status_message(&self) -> Option<&str> {
        if let Some((msg, time)) = &self.status_message {
            if time.elapsed() < Duration::from_secs(3) {
                return Some(msg);
            }
        }
        None
    }

    /// Open the link to the sensor.
    pub fn connect(&mut self) {
        if self.connection_state().is_connected() {
            self.set_status_message("Already connected".to_string());
            return;
        }
        self.set_status_message(format!("Connecting to {}...", self.description));

        let supervisor = self.supervisor.clone();
        match self.runtime.block_on(supervisor.connect()) {
            Ok(()) => self.set_status_message("Connected".to_string()),
            Err(e) => self.error = Some(ErrorDialog::new("Connection Error", e.to_string())),
        }
    }

    /// Close the link; stops monitoring first.
    pub fn disconnect(&mut self) {
        let supervisor = self.supervisor.clone();
        self.runtime.block_on(supervisor.disconnect());
    }

    /// Start a new monitoring session.
    pub fn start_monitoring(&mut self) {
        if self.session_state().is_active() {
            return;
        }

        let (mut session, events) = MonitoringSession::new(
            self.session_config.clone(),
            self.supervisor.clone(),
            self.alarm.clone(),
        );
        match self.runtime.block_on(session.start()) {
            Ok(()) => {
                self.session = Some(session);
                self.session_events = Some(events);
                self.process_events();
                // The first read may already have ended the session
                if self.session_state().is_active() {
                    self.set_status_message("Monitoring started".to_string());
                }
            }
            Err(SessionError::NotConnected) => {
                self.error = Some(ErrorDialog::new(
                    "Not Connected",
                    SessionError::NotConnected.to_string(),
                ));
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    pub fn stop_monitoring(&mut self) {
        if let Some(session) = self.session.as_mut() {
            self.runtime.block_on(session.stop());
        }
        self.process_events();
    }

    pub fn toggle_monitoring(&mut self) {
        if self.session_state().is_active() {
            self.stop_monitoring();
        } else {
            self.start_monitoring();
        }
    }

    /// Open the threshold editor prefilled with the current value.
    pub fn begin_threshold_edit(&mut self) {
        let current = match &self.session_config.threshold {
            Threshold::Numeric(v) => format!("{}", v),
            Threshold::Labels(labels) => labels.iter().cloned().collect::<Vec<_>>().join(","),
        };
        self.threshold_input = Some(current);
    }

    pub fn threshold_push(&mut self, c: char) {
        if let Some(input) = self.threshold_input.as_mut() {
            input.push(c);
        }
    }

    pub fn threshold_pop(&mut self) {
        if let Some(input) = self.threshold_input.as_mut() {
            input.pop();
        }
    }

    pub fn cancel_threshold_edit(&mut self) {
        self.threshold_input = None;
    }

    /// Parse the editor contents and apply them.
    ///
    /// Invalid input is rejected and the previous threshold stays in force.
    pub fn apply_threshold(&mut self) {
        let Some(input) = self.threshold_input.take() else {
            return;
        };

        let threshold = match parse_threshold(self.session_config.kind, &input) {
            Ok(threshold) => threshold,
            Err(message) => {
                warn!(input = %input, "rejected threshold");
                self.set_status_message(message);
                return;
            }
        };

        if let Some(session) = &self.session {
            if let Err(e) = session.set_threshold(threshold.clone()) {
                self.set_status_message(e.to_string());
                return;
            }
        }
        info!(threshold = ?threshold, "threshold set");
        self.session_config.threshold = threshold;
        self.set_status_message("Threshold updated".to_string());
    }

    /// "Silence Alarm" on the alert prompt.
    pub fn silence_alarm(&mut self) {
        self.alert = None;
        self.runtime.block_on(self.alarm.resolve(Resolution::Silence));
        self.set_status_message("Alarm silenced".to_string());
    }

    /// "OK" on the alert prompt: close it, keep sounding.
    pub fn dismiss_alert(&mut self) {
        self.alert = None;
        self.runtime.block_on(self.alarm.resolve(Resolution::Dismiss));
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Drain pending prompts, session events and connection events.
    pub fn process_events(&mut self) {
        while let Ok(prompt) = self.prompts.try_recv() {
            self.alert = Some(prompt);
        }

        if let Some(events) = self.session_events.as_mut() {
            let mut pending = Vec::new();
            while let Ok(event) = events.try_recv() {
                pending.push(event);
            }
            for event in pending {
                self.on_session_event(event);
            }
        }

        while let Ok(event) = self.connection_events.try_recv() {
            match event {
                ConnectionEvent::Connected => {}
                ConnectionEvent::Failed(_) => {}
                ConnectionEvent::Disconnected { reason: None } => {
                    self.set_status_message("Disconnected".to_string());
                }
                ConnectionEvent::Disconnected {
                    reason: Some(reason),
                } => {
                    self.error = Some(ErrorDialog::new("Disconnected", reason));
                }
            }
        }
    }

    fn on_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Sampled { sample, verdict } => {
                self.last_sample = Some(sample);
                self.last_verdict = Some(verdict);
                self.last_updated = Some(Instant::now());
            }
            SessionEvent::DecodeFailed(e) => {
                self.set_status_message(format!("Ignored reading: {}", e));
            }
            SessionEvent::Stopped(reason) => {
                // The alarm is silent once a session stops
                self.alert = None;
                if reason == StopReason::Requested {
                    self.set_status_message("Monitoring stopped".to_string());
                } else {
                    self.set_status_message(format!("Monitoring stopped: {}", reason));
                }
            }
        }
    }

    /// Stop monitoring, silence the alarm, close the link and exit.
    pub fn quit(&mut self) {
        if let Some(session) = self.session.as_mut() {
            self.runtime.block_on(session.stop());
        }
        self.runtime.block_on(self.alarm.stop());
        let supervisor = self.supervisor.clone();
        self.runtime.block_on(supervisor.disconnect());
        self.running = false;
    }
}

/// Parse threshold editor input for a session of `kind`.
pub fn parse_threshold(kind: SampleKind, input: &str) -> Result<Threshold, String> {
    match kind {
        SampleKind::Numeric => match input.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Threshold::numeric(v)),
            _ => Err(format!("Invalid threshold: {:?} is not a number", input.trim())),
        },
        SampleKind::Label => {
            let labels: Vec<&str> = input
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .collect();
            if labels.is_empty() {
                Err("Invalid threshold: enter at least one label".to_string())
            } else {
                Ok(Threshold::labels(labels))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::{NotifierKind, SoundKind};
    use crate::source::{ScriptFeeder, ScriptedTransport, Step, TransportError};

    fn app(rt: &tokio::runtime::Runtime) -> (App, ScriptFeeder, Arc<ScriptedTransport>) {
        let (feeder, transport) = ScriptedTransport::create("app test");
        let transport = Arc::new(transport);
        let (supervisor, connection_events) = ConnectionSupervisor::new(transport.clone());
        let (alarm, prompts) = AlarmActuator::from_kinds(SoundKind::Silent, NotifierKind::Log);
        let app = App::new(
            rt.handle().clone(),
            supervisor,
            connection_events,
            Arc::new(alarm),
            prompts,
            SessionConfig::default(),
        );
        (app, feeder, transport)
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap()
    }

    #[test]
    fn parse_numeric_threshold() {
        assert_eq!(
            parse_threshold(SampleKind::Numeric, " 1020.5 "),
            Ok(Threshold::numeric(1020.5))
        );
        assert!(parse_threshold(SampleKind::Numeric, "abc").is_err());
        assert!(parse_threshold(SampleKind::Numeric, "NaN").is_err());
    }

    #[test]
    fn parse_label_threshold() {
        assert_eq!(
            parse_threshold(SampleKind::Label, "WALKING, RUNNING,"),
            Ok(Threshold::labels(["WALKING", "RUNNING"]))
        );
        assert!(parse_threshold(SampleKind::Label, " , ").is_err());
    }

    #[test]
    fn start_without_connection_shows_dialog() {
        let rt = runtime();
        let (mut app, _feeder, transport) = app(&rt);

        app.start_monitoring();

        assert_eq!(
            app.error,
            Some(ErrorDialog::new("Not Connected", "Please connect to the sensor first"))
        );
        assert_eq!(app.session_state(), SessionState::Idle);
        assert_eq!(transport.reads(), 0);
    }

    #[test]
    fn failed_connect_shows_raw_error() {
        let rt = runtime();
        let (mut app, _feeder, transport) = app(&rt);
        transport.refuse_next_connect(TransportError::Timeout);

        app.connect();

        assert_eq!(
            app.error,
            Some(ErrorDialog::new("Connection Error", "Request timed out"))
        );
        assert_eq!(
            app.connection_state(),
            ConnectionState::Error("Request timed out".into())
        );
    }

    #[test]
    fn alert_opens_prompt_and_silence_closes_it() {
        let rt = runtime();
        let (mut app, feeder, _transport) = app(&rt);
        feeder.text("1020.0");

        app.connect();
        app.start_monitoring();

        assert_eq!(app.session_state(), SessionState::AlertPending);
        assert_eq!(app.last_verdict, Some(Verdict::Alert));
        assert_eq!(app.alarm_state(), AlarmState::Sounding);
        let prompt = app.alert.clone().unwrap();
        assert_eq!(prompt.title, "Sleepwalking Alert!");

        app.silence_alarm();
        assert!(app.alert.is_none());
        assert_eq!(app.alarm_state(), AlarmState::Silent);

        app.quit();
    }

    #[test]
    fn failed_first_read_reports_the_stop() {
        let rt = runtime();
        let (mut app, feeder, _transport) = app(&rt);
        feeder.push(Step::Fail(TransportError::Timeout));

        app.connect();
        app.start_monitoring();

        assert_eq!(app.session_state(), SessionState::Stopped);
        assert_eq!(
            app.get_status_message(),
            Some("Monitoring stopped: Request timed out")
        );
        assert_eq!(app.connection_state(), ConnectionState::Disconnected);
    }

    #[test]
    fn invalid_threshold_keeps_previous_value() {
        let rt = runtime();
        let (mut app, _feeder, _transport) = app(&rt);

        app.begin_threshold_edit();
        assert_eq!(app.threshold_input.as_deref(), Some("1015"));
        app.threshold_input = Some("loud".to_string());
        app.apply_threshold();

        assert_eq!(app.threshold(), &Threshold::numeric(1015.0));
        assert!(app.get_status_message().unwrap().contains("Invalid threshold"));

        app.begin_threshold_edit();
        app.threshold_pop();
        app.threshold_pop();
        app.threshold_push('2');
        app.threshold_push('0');
        app.apply_threshold();
        assert_eq!(app.threshold(), &Threshold::numeric(1020.0));
    }

    #[test]
    fn quit_tears_everything_down() {
        let rt = runtime();
        let (mut app, feeder, transport) = app(&rt);
        feeder.text("1020.0");

        app.connect();
        app.start_monitoring();
        app.quit();

        assert!(!app.running);
        assert_eq!(app.session_state(), SessionState::Stopped);
        assert_eq!(app.alarm_state(), AlarmState::Silent);
        assert_eq!(app.connection_state(), ConnectionState::Disconnected);
        assert!(!transport.is_open());
    }
}
