//! Alarm actuation.
//!
//! The [`AlarmActuator`] owns the audible alarm, the acknowledgement prompt
//! shown to the caregiver, and the one-shot notification sent per alert.
//! It is driven by the monitoring session through the [`Alarm`] trait.
//!
//! Device failures are logged and swallowed: nothing here ever fails the
//! polling loop.
//!
//! ```text
//!            start()                 stop() / Silence
//!  Silent ───────────▶ Sounding ─────────────────────▶ Silent
//!                        │   ▲
//!                        └───┘ start() again: no new sound,
//!                              re-prompt if the prompt was dismissed
//! ```

mod notify;
mod sound;

pub use notify::{DesktopNotifier, LogNotifier, NotificationSink};
pub use sound::{SilentDevice, SoundDevice, TerminalBell};

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use sockwatch_types::{AlarmState, Sample, SampleValue};
use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{info, warn};

/// Title shown on the acknowledgement prompt.
pub const ALERT_TITLE: &str = "Sleepwalking Alert!";
/// Title of the desktop notification.
pub const NOTIFICATION_TITLE: &str = "⚠️ Sleepwalking Alert!";
/// Vibration pattern in milliseconds: wait, buzz, pause, buzz.
pub const VIBRATION_PATTERN: [u64; 4] = [0, 250, 250, 250];

/// Errors raised by alarm devices.
///
/// These never leave the actuator; they are logged where they occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlarmError {
    #[error("Sound device failed: {0}")]
    Sound(String),

    #[error("Notification failed: {0}")]
    Notification(String),
}

/// Which sound device to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundKind {
    #[default]
    Bell,
    Silent,
}

/// Which notification sink to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    #[default]
    Desktop,
    Log,
}

/// The alarm as seen by a monitoring session.
#[async_trait]
pub trait Alarm: Send + Sync + Debug {
    /// Sound the alarm for `trigger` and ask the caregiver to acknowledge.
    ///
    /// Idempotent while sounding.
    async fn start(&self, trigger: &Sample);

    /// Silence the alarm and close any open prompt. Idempotent.
    async fn stop(&self);

    /// Send one notification about `trigger`.
    async fn notify_user(&self, trigger: &Sample);

    fn state(&self) -> AlarmState;
}

/// Message body describing what triggered an alert.
pub fn alert_message(trigger: &Sample) -> String {
    match trigger.value() {
        SampleValue::Numeric(p) => format!(
            "Pressure detected! Your child may be sleepwalking ({:.2} {})",
            p,
            sockwatch_types::PRESSURE_UNIT
        ),
        SampleValue::Label(label) => format!(
            "Gait state {} detected! Your child may be sleepwalking",
            label
        ),
    }
}

/// A one-shot user notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub sound: bool,
    pub vibration: Vec<u64>,
}

impl Notification {
    /// The notification sent for an alert.
    pub fn alert(trigger: &Sample) -> Self {
        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body: alert_message(trigger),
            sound: true,
            vibration: VIBRATION_PATTERN.to_vec(),
        }
    }
}

/// A request for the caregiver to acknowledge an alert.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPrompt {
    pub title: String,
    pub message: String,
    pub trigger: Sample,
}

impl AlertPrompt {
    fn for_sample(trigger: &Sample) -> Self {
        Self {
            title: ALERT_TITLE.to_string(),
            message: alert_message(trigger),
            trigger: trigger.clone(),
        }
    }
}

/// How the caregiver answered a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// "Silence Alarm": stop the sound.
    Silence,
    /// "OK": close the prompt, keep sounding.
    Dismiss,
}

#[derive(Debug, Default)]
struct Inner {
    prompt_open: bool,
}

/// Alarm backed by a [`SoundDevice`] and a [`NotificationSink`].
#[derive(Debug)]
pub struct AlarmActuator {
    sound: Arc<dyn SoundDevice>,
    notifier: Arc<dyn NotificationSink>,
    // Held across device calls so start and stop never interleave
    inner: Mutex<Inner>,
    state: watch::Sender<AlarmState>,
    prompts: mpsc::UnboundedSender<AlertPrompt>,
}

impl AlarmActuator {
    /// Create an actuator.
    ///
    /// Returns (actuator, prompts) where prompts yields every
    /// acknowledgement request the host must display.
    pub fn create(
        sound: Arc<dyn SoundDevice>,
        notifier: Arc<dyn NotificationSink>,
    ) -> (Self, mpsc::UnboundedReceiver<AlertPrompt>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(AlarmState::Silent);
        let actuator = Self {
            sound,
            notifier,
            inner: Mutex::new(Inner::default()),
            state,
            prompts: tx,
        };
        (actuator, rx)
    }

    /// Build the devices named by `sound` and `notifier`.
    pub fn from_kinds(
        sound: SoundKind,
        notifier: NotifierKind,
    ) -> (Self, mpsc::UnboundedReceiver<AlertPrompt>) {
        let sound: Arc<dyn SoundDevice> = match sound {
            SoundKind::Bell => Arc::new(TerminalBell::default()),
            SoundKind::Silent => Arc::new(SilentDevice),
        };
        let notifier: Arc<dyn NotificationSink> = match notifier {
            NotifierKind::Desktop => Arc::new(DesktopNotifier::default()),
            NotifierKind::Log => Arc::new(LogNotifier),
        };
        Self::create(sound, notifier)
    }

    /// Apply the caregiver's answer to the open prompt.
    pub async fn resolve(&self, resolution: Resolution) {
        match resolution {
            Resolution::Silence => self.stop().await,
            Resolution::Dismiss => {
                self.inner.lock().await.prompt_open = false;
            }
        }
    }

    /// Watch the alarm state.
    pub fn subscribe(&self) -> watch::Receiver<AlarmState> {
        self.state.subscribe()
    }
}

#[async_trait]
impl Alarm for AlarmActuator {
    async fn start(&self, trigger: &Sample) {
        let mut inner = self.inner.lock().await;

        if !self.state.borrow().is_sounding() {
            // Sounding before play, so a cancelled start is still stopped later
            self.state.send_replace(AlarmState::Sounding);
            info!(trigger = %trigger, "alarm sounding");
            if let Err(e) = self.sound.play().await {
                warn!(error = %e, "failed to start alarm sound");
            }
        }

        if !inner.prompt_open {
            inner.prompt_open = true;
            let _ = self.prompts.send(AlertPrompt::for_sample(trigger));
        }
    }

    async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        inner.prompt_open = false;

        if self.state.borrow().is_sounding() {
            if let Err(e) = self.sound.stop().await {
                warn!(error = %e, "failed to stop alarm sound");
            }
            self.state.send_replace(AlarmState::Silent);
            info!("alarm silenced");
        }
    }

    /// Hands the notification to a background task; the caller never waits
    /// on delivery.
    async fn notify_user(&self, trigger: &Sample) {
        let notification = Notification::alert(trigger);
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.dispatch(&notification).await {
                warn!(error = %e, "failed to send notification");
            }
        });
    }

    fn state(&self) -> AlarmState {
        *self.state.borrow()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording devices for tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[derive(Debug, Default)]
    pub struct RecordingSound {
        pub plays: AtomicUsize,
        pub stops: AtomicUsize,
        pub fail: bool,
        /// How long `play` takes to return.
        pub play_delay: Duration,
    }

    #[async_trait]
    impl SoundDevice for RecordingSound {
        async fn play(&self) -> Result<(), AlarmError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            if !self.play_delay.is_zero() {
                tokio::time::sleep(self.play_delay).await;
            }
            if self.fail {
                Err(AlarmError::Sound("speaker unplugged".into()))
            } else {
                Ok(())
            }
        }

        async fn stop(&self) -> Result<(), AlarmError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        pub sent: parking_lot::Mutex<Vec<Notification>>,
        pub fail: bool,
        /// How long delivery hangs after recording.
        pub delay: Duration,
    }

    impl RecordingNotifier {
        /// Wait until `count` notifications have been handed over.
        pub async fn delivered(&self, count: usize) {
            tokio::time::timeout(Duration::from_secs(1), async {
                while self.sent.lock().len() < count {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
            .await
            .expect("notification was never dispatched");
        }
    }

    #[async_trait]
    impl NotificationSink for RecordingNotifier {
        async fn dispatch(&self, notification: &Notification) -> Result<(), AlarmError> {
            self.sent.lock().push(notification.clone());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                Err(AlarmError::Notification("permission denied".into()))
            } else {
                Ok(())
            }
        }
    }
}
