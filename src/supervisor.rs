//! Connection supervisor.
//!
//! Owns the link to the sensor and its [`ConnectionState`]. A monitoring
//! session attaches to the supervisor to obtain the open link; the
//! supervisor in turn stops that session whenever the link goes away, and
//! always before it reports `Disconnected`.
//!
//! Three things can take the link down:
//!
//! - the user disconnects ([`ConnectionSupervisor::disconnect`])
//! - the transport reports the link dropped (BLE out of range)
//! - the attached session hits a transport error on a read
//!
//! Each produces exactly one `Disconnected` transition and one
//! [`ConnectionEvent::Disconnected`], however they race.

use std::sync::Arc;

use parking_lot::Mutex;
use sockwatch_types::ConnectionState;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::session::{SessionCommand, SessionError, StopReason};
use crate::source::{Transport, TransportError, TransportHandle};

/// Connection changes reported to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    /// The link is gone. `reason` is `None` when the user asked for it.
    Disconnected { reason: Option<String> },
    /// A connect attempt failed with this error message.
    Failed(String),
}

#[derive(Debug)]
struct Inner {
    transport: Arc<dyn Transport>,
    state: watch::Sender<ConnectionState>,
    link: Mutex<Option<TransportHandle>>,
    session: Mutex<Option<(u64, mpsc::UnboundedSender<SessionCommand>)>>,
    watcher: Mutex<Option<JoinHandle<()>>>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

/// Supervises the link to the sensor.
///
/// Cheap to clone; clones share the same link.
#[derive(Debug, Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<Inner>,
}

impl ConnectionSupervisor {
    /// Create a supervisor for `transport`.
    ///
    /// Returns (supervisor, events) where events yields every connection
    /// change the host should surface.
    pub fn new(
        transport: Arc<dyn Transport>,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let supervisor = Self {
            inner: Arc::new(Inner {
                transport,
                state,
                link: Mutex::new(None),
                session: Mutex::new(None),
                watcher: Mutex::new(None),
                events,
            }),
        };
        (supervisor, rx)
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.borrow().clone()
    }

    /// Watch the connection state.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    pub fn transport(&self) -> Arc<dyn Transport> {
        self.inner.transport.clone()
    }

    /// Whether a session is attached.
    pub fn has_session(&self) -> bool {
        self.inner.session.lock().is_some()
    }

    /// Open the link. A no-op when already connected.
    ///
    /// On failure the state becomes `Error` carrying the raw message.
    pub async fn connect(&self) -> Result<(), TransportError> {
        if self.state().is_connected() {
            return Ok(());
        }

        self.inner.state.send_replace(ConnectionState::Connecting);
        info!(transport = %self.inner.transport.description(), "connecting");

        match self.inner.transport.connect().await {
            Ok(link) => {
                let handle = link.handle.clone();
                *self.inner.link.lock() = Some(link.handle);

                if let Some(mut drops) = link.drops {
                    let supervisor = self.clone();
                    let watched = handle.clone();
                    let watcher = tokio::spawn(async move {
                        if let Some(reason) = drops.recv().await {
                            supervisor.link_lost(&watched, reason).await;
                        }
                    });
                    if let Some(old) = self.inner.watcher.lock().replace(watcher) {
                        old.abort();
                    }
                }

                self.inner.state.send_replace(ConnectionState::Connected);
                info!(link = %handle.target(), "connected");
                let _ = self.inner.events.send(ConnectionEvent::Connected);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "connect failed");
                self.inner
                    .state
                    .send_replace(ConnectionState::Error(e.to_string()));
                let _ = self.inner.events.send(ConnectionEvent::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    /// Close the link at the user's request.
    ///
    /// Stops the attached session first.
    pub async fn disconnect(&self) {
        self.stop_session(StopReason::Disconnected).await;
        if let Some(watcher) = self.inner.watcher.lock().take() {
            watcher.abort();
        }
        self.close_link(None).await;
    }

    /// Tear down after a failed read.
    ///
    /// Called by the session once it has stopped.
    pub(crate) async fn mark_down(&self, reason: String) {
        if let Some(watcher) = self.inner.watcher.lock().take() {
            watcher.abort();
        }
        self.close_link(Some(reason)).await;
    }

    /// Register a session as the user of the open link.
    pub(crate) fn attach(
        &self,
        session_id: u64,
        commands: mpsc::UnboundedSender<SessionCommand>,
    ) -> Result<TransportHandle, SessionError> {
        if !self.state().is_connected() {
            return Err(SessionError::NotConnected);
        }
        let handle = self
            .inner
            .link
            .lock()
            .clone()
            .ok_or(SessionError::NotConnected)?;

        let mut session = self.inner.session.lock();
        if session.is_some() {
            return Err(SessionError::AlreadyStarted);
        }
        *session = Some((session_id, commands));
        Ok(handle)
    }

    pub(crate) fn detach(&self, session_id: u64) {
        let mut session = self.inner.session.lock();
        if matches!(&*session, Some((id, _)) if *id == session_id) {
            *session = None;
        }
    }

    async fn link_lost(&self, handle: &TransportHandle, reason: String) {
        let current = self.inner.link.lock().as_ref() == Some(handle);
        if !current {
            debug!(link = %handle.target(), "ignoring drop of a closed link");
            return;
        }
        warn!(reason = %reason, "link lost");

        self.stop_session(StopReason::LinkLost(reason.clone())).await;
        // Running inside the watcher task: detach rather than abort it
        drop(self.inner.watcher.lock().take());
        self.close_link(Some(reason)).await;
    }

    /// Stop the attached session and wait until it is `Stopped`.
    async fn stop_session(&self, reason: StopReason) {
        let session = self.inner.session.lock().take();
        if let Some((_, commands)) = session {
            let (ack, done) = oneshot::channel();
            if commands.send(SessionCommand::Stop { reason, ack }).is_ok() {
                // Err means the session shut down on its own meanwhile
                let _ = done.await;
            }
        }
    }

    async fn close_link(&self, reason: Option<String>) {
        let handle = self.inner.link.lock().take();
        if let Some(handle) = &handle {
            self.inner.transport.disconnect(handle).await;
        }

        let changed = self.inner.state.send_if_modified(|state| {
            if matches!(state, ConnectionState::Disconnected) {
                false
            } else {
                *state = ConnectionState::Disconnected;
                true
            }
        });
        if changed {
            info!(reason = ?reason, "disconnected");
            let _ = self
                .inner
                .events
                .send(ConnectionEvent::Disconnected { reason });
        }
    }
}
