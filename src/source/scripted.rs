//! Scripted in-memory transport.
//!
//! Plays back a queue of steps pushed through a [`ScriptFeeder`]. When the
//! queue is empty it either falls back to a generator (the `--demo` device)
//! or stalls for the read timeout and fails with
//! [`TransportError::Timeout`], the way an unresponsive sock would.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sockwatch_types::SampleKind;
use tokio::sync::mpsc;

use super::{stale_handle, Link, RawPayload, Transport, TransportError, TransportHandle};

/// Gait labels cycled through by the demo device.
const DEMO_LABELS: &[&str] = &["STANCE", "HEEL_STRIKE", "TOE_OFF", "STANCE", "WALKING"];

/// One scripted answer to a read.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Answer with this payload.
    Payload(RawPayload),
    /// Fail the read.
    Fail(TransportError),
    /// Drop the link: the read fails and the drop is reported.
    Drop(String),
}

type Generator = Box<dyn Fn(u64) -> RawPayload + Send + Sync>;

/// Pushes steps into a [`ScriptedTransport`].
#[derive(Debug, Clone)]
pub struct ScriptFeeder {
    steps: mpsc::UnboundedSender<Step>,
    drops: Arc<Mutex<Option<mpsc::Sender<String>>>>,
}

impl ScriptFeeder {
    /// Queue a step. Returns false if the transport is gone.
    pub fn push(&self, step: Step) -> bool {
        self.steps.send(step).is_ok()
    }

    /// Queue a plain-text payload.
    pub fn text(&self, body: impl Into<String>) -> bool {
        self.push(Step::Payload(RawPayload::Text(body.into())))
    }

    /// Report the open link as dropped, outside of any read.
    ///
    /// Returns false if no link is open.
    pub fn drop_link(&self, reason: impl Into<String>) -> bool {
        signal_drop(&self.drops, reason.into())
    }
}

/// A transport answering reads from a script.
pub struct ScriptedTransport {
    steps: Mutex<mpsc::UnboundedReceiver<Step>>,
    generator: Option<Generator>,
    stall: Duration,
    refuse: Mutex<Option<TransportError>>,
    description: String,
    active: Mutex<Option<u64>>,
    drops: Arc<Mutex<Option<mpsc::Sender<String>>>>,
    reads: AtomicU64,
    connects: AtomicU64,
    disconnects: AtomicU64,
}

impl fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("description", &self.description)
            .field("stall", &self.stall)
            .field("generator", &self.generator.is_some())
            .field("reads", &self.reads())
            .finish_non_exhaustive()
    }
}

impl ScriptedTransport {
    /// Create a feeder/transport pair.
    ///
    /// Returns (feeder, transport) where the feeder queues the answers the
    /// transport gives to successive reads.
    pub fn create(description: &str) -> (ScriptFeeder, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        let drops = Arc::new(Mutex::new(None));
        let feeder = ScriptFeeder {
            steps: tx,
            drops: drops.clone(),
        };
        let transport = Self {
            steps: Mutex::new(rx),
            generator: None,
            stall: Duration::from_secs(3),
            refuse: Mutex::new(None),
            description: format!("script: {}", description),
            active: Mutex::new(None),
            drops,
            reads: AtomicU64::new(0),
            connects: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
        };
        (feeder, transport)
    }

    /// A simulated sock that never runs out of readings.
    ///
    /// Numeric mode produces a slow wave around 1005 hPa that crosses the
    /// default 1015 hPa threshold; label mode cycles through gait states.
    pub fn demo(kind: SampleKind) -> (ScriptFeeder, Self) {
        let (feeder, transport) = Self::create("demo sock");
        let transport = match kind {
            SampleKind::Numeric => transport.with_generator(|n| {
                let pressure = 1005.0 + 15.0 * (n as f64 / 4.0).sin();
                RawPayload::Text(format!("{:.2}", pressure))
            }),
            SampleKind::Label => transport.with_generator(|n| {
                let label = DEMO_LABELS[(n as usize) % DEMO_LABELS.len()];
                RawPayload::Text(label.to_string())
            }),
        };
        (feeder, transport)
    }

    /// Answer reads from `generator` once the queue is empty.
    ///
    /// The generator receives the 1-based read count.
    pub fn with_generator<F>(mut self, generator: F) -> Self
    where
        F: Fn(u64) -> RawPayload + Send + Sync + 'static,
    {
        self.generator = Some(Box::new(generator));
        self
    }

    /// How long a read on an empty queue hangs before timing out.
    pub fn with_stall(mut self, stall: Duration) -> Self {
        self.stall = stall;
        self
    }

    /// Make the next `connect` fail with `error`.
    pub fn refuse_next_connect(&self, error: TransportError) {
        *self.refuse.lock() = Some(error);
    }

    /// Number of reads issued so far, including failed ones.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn connects(&self) -> u64 {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> u64 {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Whether a link is currently open.
    pub fn is_open(&self) -> bool {
        self.active.lock().is_some()
    }
}

fn signal_drop(drops: &Mutex<Option<mpsc::Sender<String>>>, reason: String) -> bool {
    match drops.lock().take() {
        Some(tx) => tx.try_send(reason).is_ok(),
        None => false,
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self) -> Result<Link, TransportError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.refuse.lock().take() {
            return Err(error);
        }

        let handle = TransportHandle::new(self.description.clone());
        let (tx, rx) = mpsc::channel(1);
        *self.drops.lock() = Some(tx);
        *self.active.lock() = Some(handle.id());
        Ok(Link::with_drops(handle, rx))
    }

    async fn disconnect(&self, handle: &TransportHandle) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        let mut active = self.active.lock();
        if *active == Some(handle.id()) {
            *active = None;
            *self.drops.lock() = None;
        }
    }

    async fn read_sample(&self, handle: &TransportHandle) -> Result<RawPayload, TransportError> {
        if *self.active.lock() != Some(handle.id()) {
            return Err(stale_handle(handle));
        }
        let count = self.reads.fetch_add(1, Ordering::SeqCst) + 1;

        let step = self.steps.lock().try_recv().ok();
        match step {
            Some(Step::Payload(payload)) => Ok(payload),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Drop(reason)) => {
                *self.active.lock() = None;
                signal_drop(&self.drops, reason.clone());
                Err(TransportError::Disconnected(reason))
            }
            None => match &self.generator {
                Some(generator) => Ok(generator(count)),
                None => {
                    tokio::time::sleep(self.stall).await;
                    Err(TransportError::Timeout)
                }
            },
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}
