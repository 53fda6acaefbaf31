//! End-to-end monitoring scenarios against the scripted sock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use sockwatch::source::Step;
use sockwatch::{
    Alarm, AlarmState, ConnectionEvent, ConnectionState, ConnectionSupervisor, MonitoringSession,
    Sample, ScriptFeeder, ScriptedTransport, SessionConfig, SessionError, SessionEvent,
    SessionState, StopReason, Verdict,
};

/// Counts every call the session makes on its alarm.
#[derive(Debug, Default)]
struct CountingAlarm {
    starts: AtomicUsize,
    stops: AtomicUsize,
    notified: Mutex<Vec<Sample>>,
    sounding: Mutex<bool>,
}

#[async_trait]
impl Alarm for CountingAlarm {
    async fn start(&self, _trigger: &Sample) {
        self.starts.fetch_add(1, Ordering::SeqCst);
        *self.sounding.lock() = true;
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        *self.sounding.lock() = false;
    }

    async fn notify_user(&self, trigger: &Sample) {
        self.notified.lock().push(trigger.clone());
    }

    fn state(&self) -> AlarmState {
        if *self.sounding.lock() {
            AlarmState::Sounding
        } else {
            AlarmState::Silent
        }
    }
}

struct Sock {
    feeder: ScriptFeeder,
    transport: Arc<ScriptedTransport>,
    supervisor: ConnectionSupervisor,
    connection_events: mpsc::UnboundedReceiver<ConnectionEvent>,
    alarm: Arc<CountingAlarm>,
}

async fn connected_sock() -> Sock {
    let (feeder, transport) = ScriptedTransport::create("scenario sock");
    let transport = Arc::new(transport);
    let (supervisor, mut connection_events) = ConnectionSupervisor::new(transport.clone());
    supervisor.connect().await.unwrap();
    assert_eq!(connection_events.try_recv(), Ok(ConnectionEvent::Connected));

    Sock {
        feeder,
        transport,
        supervisor,
        connection_events,
        alarm: Arc::new(CountingAlarm::default()),
    }
}

fn verdicts(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<Verdict> {
    let mut verdicts = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Sampled { verdict, .. } = event {
            verdicts.push(verdict);
        }
    }
    verdicts
}

/// Record the session and alarm states at the moment `Disconnected` arrives.
fn on_disconnect(
    mut connection_events: mpsc::UnboundedReceiver<ConnectionEvent>,
    session_state: watch::Receiver<SessionState>,
    alarm: Arc<CountingAlarm>,
) -> JoinHandle<Option<(SessionState, AlarmState)>> {
    tokio::spawn(async move {
        while let Some(event) = connection_events.recv().await {
            if let ConnectionEvent::Disconnected { .. } = event {
                return Some((*session_state.borrow(), alarm.state()));
            }
        }
        None
    })
}

#[tokio::test(start_paused = true)]
async fn pressure_crossing_the_threshold_alerts_twice() {
    let sock = connected_sock().await;
    for body in ["1000", "1016", "1020"] {
        sock.feeder.text(body);
    }
    let (mut session, mut events) = MonitoringSession::new(
        SessionConfig::numeric(1015.0),
        sock.supervisor.clone(),
        sock.alarm.clone(),
    );

    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(6100)).await;

    assert_eq!(
        verdicts(&mut events),
        vec![Verdict::Normal, Verdict::Alert, Verdict::Alert]
    );
    assert_eq!(sock.alarm.starts.load(Ordering::SeqCst), 2);
    assert_eq!(sock.alarm.notified.lock().len(), 2);
    assert_eq!(sock.alarm.stops.load(Ordering::SeqCst), 0);
    assert_eq!(session.state(), SessionState::AlertPending);

    session.stop().await;
    assert_eq!(sock.alarm.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn gait_labels_alert_only_on_members() {
    let sock = connected_sock().await;
    for label in ["HEEL_STRIKE", "WALKING", "UNKNOWN"] {
        sock.feeder.text(label);
    }
    let (mut session, mut events) = MonitoringSession::new(
        SessionConfig::labels(["WALKING"]),
        sock.supervisor.clone(),
        sock.alarm.clone(),
    );

    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(6100)).await;

    assert_eq!(
        verdicts(&mut events),
        vec![Verdict::Normal, Verdict::Alert, Verdict::Normal]
    );
    assert_eq!(sock.alarm.starts.load(Ordering::SeqCst), 1);

    session.stop().await;
}

#[tokio::test(start_paused = true)]
async fn link_drop_on_fourth_tick_ends_the_session() {
    let mut sock = connected_sock().await;
    sock.feeder.text("1000");
    sock.feeder.text("1020");
    sock.feeder.text("1000");
    sock.feeder.push(Step::Drop("peripheral went away".into()));
    let (mut session, mut events) = MonitoringSession::new(
        SessionConfig::numeric(1015.0),
        sock.supervisor.clone(),
        sock.alarm.clone(),
    );

    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(9100)).await;

    assert_eq!(sock.transport.reads(), 4);
    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(sock.supervisor.state(), ConnectionState::Disconnected);
    assert!(sock.alarm.stops.load(Ordering::SeqCst) >= 1);
    assert_eq!(sock.alarm.state(), AlarmState::Silent);

    let mut stopped = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::Stopped(reason) = event {
            stopped.push(reason);
        }
    }
    assert_eq!(stopped.len(), 1);
    assert!(matches!(
        stopped[0],
        StopReason::TransportFailed(_) | StopReason::LinkLost(_)
    ));

    assert!(matches!(
        sock.connection_events.try_recv(),
        Ok(ConnectionEvent::Disconnected { reason: Some(_) })
    ));
    assert!(sock.connection_events.try_recv().is_err());

    // No fifth tick
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(sock.transport.reads(), 4);
}

#[tokio::test(start_paused = true)]
async fn read_failure_disconnects_exactly_once() {
    let mut sock = connected_sock().await;
    sock.feeder.text("1000");
    sock.feeder.push(Step::Fail(sockwatch::TransportError::Unreachable(
        "no route to host".into(),
    )));
    let (mut session, _events) = MonitoringSession::new(
        SessionConfig::default(),
        sock.supervisor.clone(),
        sock.alarm.clone(),
    );
    let mut session_state = session.subscribe();

    session.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(3100)).await;

    assert_eq!(*session_state.borrow_and_update(), SessionState::Stopped);
    assert_eq!(
        sock.connection_events.try_recv(),
        Ok(ConnectionEvent::Disconnected {
            reason: Some("Device unreachable: no route to host".into())
        })
    );
    assert!(sock.connection_events.try_recv().is_err());
    assert!(!sock.transport.is_open());

    // A user disconnect afterwards is a no-op
    sock.supervisor.disconnect().await;
    assert!(sock.connection_events.try_recv().is_err());
    session.stop().await;
}

#[tokio::test(start_paused = true)]
async fn start_before_connecting_is_a_no_op() {
    let (_feeder, transport) = ScriptedTransport::create("unplugged sock");
    let transport = Arc::new(transport);
    let (supervisor, _connection_events) = ConnectionSupervisor::new(transport.clone());
    let alarm = Arc::new(CountingAlarm::default());
    let (mut session, _events) =
        MonitoringSession::new(SessionConfig::default(), supervisor, alarm.clone());

    assert_eq!(session.start().await, Err(SessionError::NotConnected));
    assert_eq!(
        SessionError::NotConnected.to_string(),
        "Please connect to the sensor first"
    );

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.reads(), 0);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(alarm.starts.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn user_disconnect_stops_the_session_first() {
    let mut sock = connected_sock().await;
    sock.feeder.text("1020");
    let (mut session, mut events) = MonitoringSession::new(
        SessionConfig::default(),
        sock.supervisor.clone(),
        sock.alarm.clone(),
    );

    session.start().await.unwrap();
    assert_eq!(sock.alarm.state(), AlarmState::Sounding);

    sock.supervisor.disconnect().await;

    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(sock.alarm.state(), AlarmState::Silent);
    assert!(!sock.supervisor.has_session());
    assert_eq!(
        sock.connection_events.try_recv(),
        Ok(ConnectionEvent::Disconnected { reason: None })
    );

    let _sampled = events.try_recv().unwrap();
    assert_eq!(
        events.try_recv(),
        Ok(SessionEvent::Stopped(StopReason::Disconnected))
    );

    session.stop().await;
    assert_eq!(sock.transport.disconnects(), 1);
}

#[tokio::test(start_paused = true)]
async fn session_is_stopped_before_a_lost_link_is_reported() {
    let Sock {
        feeder,
        supervisor,
        connection_events,
        alarm,
        ..
    } = connected_sock().await;
    feeder.text("1020");
    let (mut session, _events) =
        MonitoringSession::new(SessionConfig::default(), supervisor.clone(), alarm.clone());

    session.start().await.unwrap();
    assert_eq!(alarm.state(), AlarmState::Sounding);
    let observed = on_disconnect(connection_events, session.subscribe(), alarm.clone());

    // Dropped between ticks, not during a read
    assert!(feeder.drop_link("peripheral went away"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let observed = tokio::time::timeout(Duration::from_secs(5), observed)
        .await
        .expect("no disconnect was reported")
        .unwrap();
    assert_eq!(observed, Some((SessionState::Stopped, AlarmState::Silent)));
    assert_eq!(supervisor.state(), ConnectionState::Disconnected);
    session.stop().await;
}

#[tokio::test(start_paused = true)]
async fn session_is_stopped_before_a_failed_read_is_reported() {
    let Sock {
        feeder,
        supervisor,
        connection_events,
        alarm,
        ..
    } = connected_sock().await;
    feeder.text("1020");
    feeder.push(Step::Fail(sockwatch::TransportError::Timeout));
    let (mut session, _events) =
        MonitoringSession::new(SessionConfig::default(), supervisor.clone(), alarm.clone());

    session.start().await.unwrap();
    assert_eq!(alarm.state(), AlarmState::Sounding);
    let observed = on_disconnect(connection_events, session.subscribe(), alarm.clone());

    tokio::time::sleep(Duration::from_millis(3100)).await;

    let observed = tokio::time::timeout(Duration::from_secs(5), observed)
        .await
        .expect("no disconnect was reported")
        .unwrap();
    assert_eq!(observed, Some((SessionState::Stopped, AlarmState::Silent)));
    session.stop().await;
}
