//! # sockwatch
//!
//! A terminal monitor for the Smart Sock sleepwalking alarm.
//!
//! The sock is an ESP32 with a pressure sensor under the sole. It is
//! reachable over plain HTTP on the home network or over Bluetooth LE.
//! sockwatch polls it on a fixed period, decides whether each reading
//! means the wearer is up and walking, and if so rings an alarm and
//! raises a notification until someone answers.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Application                          │
//! │  ┌─────────┐   ┌────────────┐   ┌────────────┐   ┌────────┐  │
//! │  │   app   │──▶│ supervisor │──▶│  session   │──▶│ alarm  │  │
//! │  │ (state) │   │   (link)   │   │ (poll loop)│   │        │  │
//! │  └────┬────┘   └─────┬──────┘   └─────┬──────┘   └────────┘  │
//! │       │              │                │                      │
//! │       ▼              ▼                ▼                      │
//! │  ┌─────────┐   ┌───────────┐    ┌──────────┐                 │
//! │  │   ui    │   │  source   │    │   data   │                 │
//! │  │(ratatui)│   │(transport)│    │ (decode) │                 │
//! │  └─────────┘   └───────────┘    └──────────┘                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`source`]**: the [`Transport`] trait with HTTP, BLE and scripted
//!   implementations
//! - **[`data`]**: payload decoding into [`Sample`]s and duration parsing
//! - **[`alarm`]**: the [`AlarmActuator`] driving a sound device and a
//!   notification sink
//! - **[`session`]**: the [`MonitoringSession`] poll loop and its states
//! - **[`supervisor`]**: the [`ConnectionSupervisor`] owning the link
//! - **[`app`]**, **[`events`]**, **[`ui`]**: the terminal front end
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Poll the sock on the home network
//! sockwatch --address 192.168.1.100
//!
//! # Try the front end against a simulated sock
//! sockwatch --demo
//!
//! # Send WiFi credentials to a sock in setup mode
//! sockwatch --provision --ssid home --password hunter2
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::sync::Arc;
//! use sockwatch::{
//!     AlarmActuator, ConnectionSupervisor, MonitoringSession, NotifierKind, ScriptedTransport,
//!     SessionConfig, SoundKind,
//! };
//!
//! # tokio_test::block_on(async {
//! let (feeder, transport) = ScriptedTransport::create("doc sock");
//! feeder.text("1020.5");
//!
//! let (supervisor, _connection_events) = ConnectionSupervisor::new(Arc::new(transport));
//! let (alarm, _prompts) = AlarmActuator::from_kinds(SoundKind::Silent, NotifierKind::Log);
//! supervisor.connect().await.unwrap();
//!
//! let (mut session, _events) =
//!     MonitoringSession::new(SessionConfig::numeric(1015.0), supervisor.clone(), Arc::new(alarm));
//! session.start().await.unwrap();
//! assert!(session.last_sample().is_some());
//! session.stop().await;
//! # });
//! ```

pub mod alarm;
pub mod app;
pub mod config;
pub mod data;
pub mod events;
pub mod session;
pub mod source;
pub mod supervisor;
pub mod ui;

pub use alarm::{Alarm, AlarmActuator, AlarmError, AlertPrompt, NotifierKind, Resolution, SoundKind};
pub use app::App;
pub use config::{Settings, TransportKind};
pub use data::{DecodeError, SampleDecoder};
pub use session::{MonitoringSession, SessionConfig, SessionError, SessionEvent, StopReason};
pub use sockwatch_types::{
    evaluate, AlarmState, ConnectionState, Sample, SampleKind, SampleValue, SessionState,
    Threshold, Verdict,
};
#[cfg(feature = "ble")]
pub use source::BleTransport;
#[cfg(feature = "http")]
pub use source::HttpTransport;
pub use source::{RawPayload, ScriptFeeder, ScriptedTransport, Transport, TransportError};
pub use supervisor::{ConnectionEvent, ConnectionSupervisor};
