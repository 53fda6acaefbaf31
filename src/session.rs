//! Monitoring session: the polling loop.
//!
//! A [`MonitoringSession`] reads the sensor once immediately on
//! [`start`](MonitoringSession::start) and then once per period. Each tick
//! reads a raw payload, decodes it, evaluates it against the current
//! threshold and drives the alarm.
//!
//! ```text
//!            start()            ALERT verdict
//!  Idle ────────────▶ Polling ───────────────▶ AlertPending
//!                       ▲   │                      │
//!                       │   │ stop / link lost     │ NORMAL verdict
//!                       │   │ / transport error    │ with alarm silent
//!                       │   ▼                      │
//!                       │  Stopped ◀───────────────┤
//!                       └──────────────────────────┘
//! ```
//!
//! Every way of stopping (explicit stop, transport failure, link loss,
//! teardown) goes through one shutdown routine in the worker task: the
//! timer is dropped first, then the alarm is silenced, then the state
//! becomes `Stopped`. No tick runs after that.
//!
//! A transport error on a tick is fatal for the session; there is no
//! retry. A decode error is logged and the tick is skipped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sockwatch_types::{
    evaluate, Sample, SampleKind, SessionState, Threshold, Verdict,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::alarm::Alarm;
use crate::data::{DecodeError, SampleDecoder};
use crate::source::{Transport, TransportError, TransportHandle};
use crate::supervisor::ConnectionSupervisor;

/// Default polling period.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(3000);
/// Default numeric threshold in hPa.
pub const DEFAULT_THRESHOLD: f64 = 1015.0;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Errors returned to callers of the session API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Please connect to the sensor first")]
    NotConnected,

    #[error("Monitoring is already running")]
    AlreadyStarted,

    #[error("This session has finished; start a new one")]
    Finished,

    #[error("Threshold is {found} but this session samples {expected}")]
    ThresholdMismatch {
        expected: SampleKind,
        found: SampleKind,
    },
}

/// Why a session stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The host called [`MonitoringSession::stop`].
    Requested,
    /// The user disconnected from the sensor.
    Disconnected,
    /// The link dropped without being asked to.
    LinkLost(String),
    /// A read failed.
    TransportFailed(TransportError),
    /// The session handle was dropped.
    Teardown,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Requested => f.write_str("stopped by user"),
            StopReason::Disconnected => f.write_str("disconnected"),
            StopReason::LinkLost(reason) => write!(f, "link lost: {}", reason),
            StopReason::TransportFailed(e) => write!(f, "{}", e),
            StopReason::Teardown => f.write_str("shutting down"),
        }
    }
}

/// What a session reports to its host.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A tick produced a sample and a verdict.
    Sampled { sample: Sample, verdict: Verdict },
    /// A payload could not be decoded; nothing else changed.
    DecodeFailed(DecodeError),
    /// The session reached `Stopped`.
    Stopped(StopReason),
}

/// Commands a session's worker accepts.
#[derive(Debug)]
pub enum SessionCommand {
    /// Shut down, then acknowledge.
    Stop {
        reason: StopReason,
        ack: oneshot::Sender<()>,
    },
}

/// Fixed parameters of a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub kind: SampleKind,
    pub threshold: Threshold,
    pub period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::numeric(DEFAULT_THRESHOLD)
    }
}

impl SessionConfig {
    /// Pressure sampling with a numeric threshold.
    pub fn numeric(threshold: f64) -> Self {
        Self {
            kind: SampleKind::Numeric,
            threshold: Threshold::numeric(threshold),
            period: DEFAULT_POLL_PERIOD,
        }
    }

    /// Gait-label sampling alerting on any of `labels`.
    pub fn labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: SampleKind::Label,
            threshold: Threshold::labels(labels),
            period: DEFAULT_POLL_PERIOD,
        }
    }

    pub fn period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}

/// State shared between the handle and the worker.
#[derive(Debug)]
struct Shared {
    state: watch::Sender<SessionState>,
    last_sample: watch::Sender<Option<Sample>>,
}

/// A polling session bound to one connection.
#[derive(Debug)]
pub struct MonitoringSession {
    id: u64,
    kind: SampleKind,
    period: Duration,
    supervisor: ConnectionSupervisor,
    alarm: Arc<dyn Alarm>,
    threshold: watch::Sender<Threshold>,
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<SessionEvent>,
    commands: Option<mpsc::UnboundedSender<SessionCommand>>,
    task: Option<JoinHandle<()>>,
}

impl MonitoringSession {
    /// Create an idle session.
    ///
    /// Returns (session, events) where events yields every sample, decode
    /// failure and the final stop.
    pub fn new(
        config: SessionConfig,
        supervisor: ConnectionSupervisor,
        alarm: Arc<dyn Alarm>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (threshold, _) = watch::channel(config.threshold);
        let (state, _) = watch::channel(SessionState::Idle);
        let (last_sample, _) = watch::channel(None);

        let session = Self {
            id: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            kind: config.kind,
            period: config.period,
            supervisor,
            alarm,
            threshold,
            shared: Arc::new(Shared { state, last_sample }),
            events,
            commands: None,
            task: None,
        };
        (session, rx)
    }

    pub fn state(&self) -> SessionState {
        *self.shared.state.borrow()
    }

    /// Watch the session state.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.shared.state.subscribe()
    }

    /// The most recent successfully decoded sample.
    pub fn last_sample(&self) -> Option<Sample> {
        self.shared.last_sample.borrow().clone()
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold.borrow().clone()
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Replace the threshold. The next tick uses the new value.
    pub fn set_threshold(&self, threshold: Threshold) -> Result<(), SessionError> {
        if threshold.kind() != self.kind {
            return Err(SessionError::ThresholdMismatch {
                expected: self.kind,
                found: threshold.kind(),
            });
        }
        info!(threshold = ?threshold, "threshold updated");
        self.threshold.send_replace(threshold);
        Ok(())
    }

    /// Begin polling: one tick now, then one per period.
    ///
    /// Fails with [`SessionError::NotConnected`] without arming anything
    /// when the supervisor has no open link.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        match self.state() {
            SessionState::Idle => {}
            SessionState::Polling | SessionState::AlertPending => {
                return Err(SessionError::AlreadyStarted)
            }
            SessionState::Stopped => return Err(SessionError::Finished),
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = self.supervisor.attach(self.id, tx.clone())?;

        self.shared.state.send_replace(SessionState::Polling);
        info!(
            transport = %self.supervisor.transport().description(),
            period = ?self.period,
            kind = %self.kind,
            "monitoring started"
        );

        let mut worker = Worker {
            id: self.id,
            period: self.period,
            transport: self.supervisor.transport(),
            handle,
            supervisor: self.supervisor.clone(),
            alarm: self.alarm.clone(),
            decoder: SampleDecoder::new(self.kind),
            threshold: self.threshold.subscribe(),
            shared: self.shared.clone(),
            events: self.events.clone(),
        };

        let next_tick = Instant::now() + self.period;
        match worker.tick().await {
            Flow::Continue => {
                self.commands = Some(tx);
                self.task = Some(tokio::spawn(worker.run(rx, next_tick)));
            }
            Flow::Stop(reason, _) => worker.shutdown(reason, None).await,
        }
        Ok(())
    }

    /// Stop polling and silence the alarm. Idempotent.
    ///
    /// Returns once the session is `Stopped`.
    pub async fn stop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let (ack, done) = oneshot::channel();
            let stop = SessionCommand::Stop {
                reason: StopReason::Requested,
                ack,
            };
            if commands.send(stop).is_ok() {
                let _ = done.await;
            }
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        if self.state() == SessionState::Idle {
            finish(&self.shared, self.alarm.as_ref(), &self.events, StopReason::Requested).await;
        }
    }
}

impl Drop for MonitoringSession {
    fn drop(&mut self) {
        if let Some(commands) = self.commands.take() {
            let (ack, _) = oneshot::channel();
            let _ = commands.send(SessionCommand::Stop {
                reason: StopReason::Teardown,
                ack,
            });
        }
    }
}

enum Flow {
    Continue,
    Stop(StopReason, Option<oneshot::Sender<()>>),
}

impl Flow {
    fn from_command(command: Option<SessionCommand>) -> Self {
        match command {
            Some(SessionCommand::Stop { reason, ack }) => Flow::Stop(reason, Some(ack)),
            None => Flow::Stop(StopReason::Teardown, None),
        }
    }
}

struct Worker {
    id: u64,
    period: Duration,
    transport: Arc<dyn Transport>,
    handle: TransportHandle,
    supervisor: ConnectionSupervisor,
    alarm: Arc<dyn Alarm>,
    decoder: SampleDecoder,
    threshold: watch::Receiver<Threshold>,
    shared: Arc<Shared>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl Worker {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<SessionCommand>,
        next_tick: Instant,
    ) {
        let mut timer: Interval = tokio::time::interval_at(next_tick, self.period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let (reason, ack) = loop {
            tokio::select! {
                biased;
                command = commands.recv() => match Flow::from_command(command) {
                    Flow::Stop(reason, ack) => break (reason, ack),
                    Flow::Continue => {}
                },
                _ = timer.tick() => {}
            }

            let flow = tokio::select! {
                biased;
                command = commands.recv() => Flow::from_command(command),
                flow = self.tick() => flow,
            };
            if let Flow::Stop(reason, ack) = flow {
                break (reason, ack);
            }
        };

        drop(timer);
        self.shutdown(reason, ack).await;
    }

    async fn tick(&mut self) -> Flow {
        let payload = match self.transport.read_sample(&self.handle).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "sensor read failed");
                return Flow::Stop(StopReason::TransportFailed(e), None);
            }
        };

        let sample = match self.decoder.decode(&payload) {
            Ok(sample) => sample,
            Err(e) => {
                warn!(error = %e, payload = ?payload, "discarding undecodable payload");
                let _ = self.events.send(SessionEvent::DecodeFailed(e));
                return Flow::Continue;
            }
        };

        let threshold = self.threshold.borrow().clone();
        let verdict = evaluate(&sample, &threshold);
        debug!(sample = %sample, verdict = ?verdict, "tick");
        self.shared.last_sample.send_replace(Some(sample.clone()));

        match verdict {
            Verdict::Alert => {
                self.shared.state.send_replace(SessionState::AlertPending);
                self.alarm.start(&sample).await;
                self.alarm.notify_user(&sample).await;
            }
            Verdict::Normal => {
                if !self.alarm.state().is_sounding() {
                    self.shared.state.send_replace(SessionState::Polling);
                }
            }
        }

        let _ = self.events.send(SessionEvent::Sampled { sample, verdict });
        Flow::Continue
    }

    async fn shutdown(self, reason: StopReason, ack: Option<oneshot::Sender<()>>) {
        finish(&self.shared, self.alarm.as_ref(), &self.events, reason.clone()).await;
        self.supervisor.detach(self.id);

        if let StopReason::TransportFailed(e) = &reason {
            self.supervisor.mark_down(e.to_string()).await;
        }
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
    }
}

async fn finish(
    shared: &Shared,
    alarm: &dyn Alarm,
    events: &mpsc::UnboundedSender<SessionEvent>,
    reason: StopReason,
) {
    alarm.stop().await;
    shared.state.send_replace(SessionState::Stopped);
    info!(reason = %reason, "monitoring stopped");
    let _ = events.send(SessionEvent::Stopped(reason));
}
