//! Sound devices.

use std::fmt::Debug;
use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use super::AlarmError;

/// Something that can play a repeating alarm sound.
#[async_trait]
pub trait SoundDevice: Send + Sync + Debug {
    /// Start playing. Called only when the alarm goes from silent to sounding.
    async fn play(&self) -> Result<(), AlarmError>;

    /// Stop playing.
    async fn stop(&self) -> Result<(), AlarmError>;
}

/// Rings the terminal bell at a fixed interval until stopped.
#[derive(Debug)]
pub struct TerminalBell {
    interval: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for TerminalBell {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl TerminalBell {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: Mutex::new(None),
        }
    }

    pub fn is_ringing(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

fn ring() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(b"\x07")?;
    stdout.flush()
}

#[async_trait]
impl SoundDevice for TerminalBell {
    async fn play(&self) -> Result<(), AlarmError> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(());
        }

        ring().map_err(|e| AlarmError::Sound(e.to_string()))?;

        let interval = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately; the bell already rang
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = ring() {
                    debug!(error = %e, "terminal bell write failed");
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn stop(&self) -> Result<(), AlarmError> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        Ok(())
    }
}

/// Plays nothing; the alarm is visible only in the UI and the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentDevice;

#[async_trait]
impl SoundDevice for SilentDevice {
    async fn play(&self) -> Result<(), AlarmError> {
        debug!("silent alarm started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AlarmError> {
        debug!("silent alarm stopped");
        Ok(())
    }
}
