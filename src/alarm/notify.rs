//! Notification sinks.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::warn;

use super::{AlarmError, Notification};

/// Somewhere a one-shot alert notification can be delivered.
#[async_trait]
pub trait NotificationSink: Send + Sync + Debug {
    async fn dispatch(&self, notification: &Notification) -> Result<(), AlarmError>;
}

/// How long `notify-send` may run before it is killed.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(2);

/// Desktop notification through `notify-send`.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    program: String,
    timeout: Duration,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::with_program("notify-send")
    }
}

impl DesktopNotifier {
    /// Use a different `notify-send` compatible program.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    /// Set how long the program may run (default: 2 seconds).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, notification: &Notification) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.kill_on_drop(true)
            .arg("--urgency=critical")
            .arg("--app-name=sockwatch")
            .arg(&notification.title)
            .arg(&notification.body);
        cmd
    }
}

#[async_trait]
impl NotificationSink for DesktopNotifier {
    async fn dispatch(&self, notification: &Notification) -> Result<(), AlarmError> {
        let status = tokio::time::timeout(self.timeout, self.command(notification).status())
            .await
            .map_err(|_| {
                AlarmError::Notification(format!(
                    "{} did not exit within {:?}",
                    self.program, self.timeout
                ))
            })?
            .map_err(|e| AlarmError::Notification(format!("{}: {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(AlarmError::Notification(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}

/// Writes the notification to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn dispatch(&self, notification: &Notification) -> Result<(), AlarmError> {
        warn!(
            title = %notification.title,
            body = %notification.body,
            sound = notification.sound,
            vibration = ?notification.vibration,
            "alert notification"
        );
        Ok(())
    }
}
