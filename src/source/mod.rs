//! Transport abstraction for reaching the sensor.
//!
//! A [`Transport`] opens a link to the sock, reads one raw payload per
//! call and closes the link again. Implementations exist for the ESP32
//! HTTP firmware, for Bluetooth LE and for a scripted in-memory device
//! used by `--demo` and the tests.
//!
//! Decoding the payload into a [`Sample`](sockwatch_types::Sample) is not
//! the transport's job; see [`crate::data::SampleDecoder`].

#[cfg(feature = "ble")]
mod ble;
#[cfg(feature = "http")]
mod http;
mod scripted;

#[cfg(feature = "ble")]
pub use ble::BleTransport;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use scripted::{ScriptFeeder, ScriptedTransport, Step};

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::config::{Settings, TransportKind};

pub use sockwatch_adapters::TransportError;

/// Raw bytes or text as delivered by a transport, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPayload {
    /// A plain-text body, e.g. the `/pressure` response.
    Text(String),
    /// Base64 text, as carried by the BLE characteristic.
    Base64(String),
    /// Raw characteristic bytes.
    Bytes(Vec<u8>),
}

/// How a BLE characteristic value is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    #[default]
    Base64,
    Raw,
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Identifies one open link.
///
/// Handles are never reused, so a read issued against a link that has
/// since been closed fails instead of reaching a newer link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportHandle {
    id: u64,
    target: String,
}

impl TransportHandle {
    /// Allocate a fresh handle for a link to `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            id: NEXT_HANDLE.fetch_add(1, Ordering::Relaxed),
            target: target.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// What the link points at (URL, BLE address, script name).
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// The result of a successful [`Transport::connect`].
#[derive(Debug)]
pub struct Link {
    pub handle: TransportHandle,
    /// Yields a reason when the link drops without being asked to.
    ///
    /// `None` for transports with no standing connection (HTTP).
    pub drops: Option<mpsc::Receiver<String>>,
}

impl Link {
    pub fn new(handle: TransportHandle) -> Self {
        Self {
            handle,
            drops: None,
        }
    }

    pub fn with_drops(handle: TransportHandle, drops: mpsc::Receiver<String>) -> Self {
        Self {
            handle,
            drops: Some(drops),
        }
    }
}

/// A way of reaching the sensor.
///
/// Every failure is a [`TransportError`]; none of them are retried here.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Open a link to the device.
    async fn connect(&self) -> Result<Link, TransportError>;

    /// Close the link. Failures are logged, not returned.
    async fn disconnect(&self, handle: &TransportHandle);

    /// Fetch one raw payload over an open link.
    async fn read_sample(&self, handle: &TransportHandle) -> Result<RawPayload, TransportError>;

    /// Returns a human-readable description of the transport.
    ///
    /// Used for display in the TUI header.
    fn description(&self) -> &str;
}

/// Build the transport selected by `settings`.
pub async fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn Transport>> {
    match settings.transport {
        TransportKind::Demo => {
            let (_feeder, transport) = ScriptedTransport::demo(settings.mode);
            Ok(Arc::new(transport))
        }
        #[cfg(feature = "http")]
        TransportKind::Http => {
            let adapter = sockwatch_adapters::esp32::Esp32Adapter::builder()
                .address(settings.http.address.clone())
                .read_timeout(settings.http_read_timeout()?)
                .configure_timeout(settings.http_configure_timeout()?)
                .build()?;
            Ok(Arc::new(HttpTransport::new(adapter)))
        }
        #[cfg(feature = "ble")]
        TransportKind::Ble => {
            let adapter = sockwatch_adapters::ble::BleAdapter::builder()
                .name_marker(settings.ble.name_marker.clone())
                .service_uuid(uuid::Uuid::parse_str(&settings.ble.service_uuid)?)
                .characteristic_uuid(uuid::Uuid::parse_str(&settings.ble.characteristic_uuid)?)
                .scan_time(settings.ble_scan_time()?)
                .read_timeout(settings.ble_read_timeout()?)
                .build()
                .await?;
            Ok(Arc::new(BleTransport::new(
                adapter,
                settings.ble.address.clone(),
                settings.ble.encoding,
            )))
        }
        #[allow(unreachable_patterns)]
        other => bail!(
            "transport {:?} is not available in this build; enable the matching cargo feature",
            other
        ),
    }
}

/// Error for reads against a handle that is not the open link.
pub(crate) fn stale_handle(handle: &TransportHandle) -> TransportError {
    TransportError::Disconnected(format!("link to {} is closed", handle.target()))
}
