//! Lifecycle states for the connection, the monitoring session and the alarm.

use core::fmt;

/// Health of the link to the sensor.
///
/// Owned by the connection supervisor; sessions only observe it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last connection attempt failed with this message.
    Error(alloc::string::String),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    /// Returns the label used in the status bar.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
            ConnectionState::Error(_) => "Error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Error(msg) => write!(f, "Error: {}", msg),
            other => f.write_str(other.label()),
        }
    }
}

/// Lifecycle of one monitoring session.
///
/// `Idle -> Polling -> {Polling, AlertPending} -> Stopped`. A stopped
/// session is never restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionState {
    #[default]
    Idle,
    Polling,
    /// Polling continues; an alert fired and the alarm has not been silenced.
    AlertPending,
    Stopped,
}

impl SessionState {
    /// True while the poll timer is armed.
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Polling | SessionState::AlertPending)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Polling => "Polling",
            SessionState::AlertPending => "Alert pending",
            SessionState::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the alarm sound is playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AlarmState {
    #[default]
    Silent,
    Sounding,
}

impl AlarmState {
    pub fn is_sounding(&self) -> bool {
        matches!(self, AlarmState::Sounding)
    }
}
