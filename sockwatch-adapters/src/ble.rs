//! Bluetooth LE adapter reading a single GATT characteristic.
//!
//! The sock advertises a name containing a fixed marker (`SmartSock` by
//! default) and exposes one service/characteristic pair. The characteristic
//! value is the current reading: a decimal pressure or a gait label,
//! usually base64-encoded ASCII.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sockwatch_adapters::ble::BleAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = BleAdapter::builder().name_marker("SmartSock").build().await?;
//!
//!     for device in adapter.discover().await? {
//!         println!("{} ({})", device.name, device.address);
//!     }
//!
//!     let link = adapter.connect(None).await?;
//!     let value = adapter.read(&link).await?;
//!     println!("Raw value: {:?}", value);
//!
//!     adapter.disconnect(&link).await;
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use btleplug::api::{Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::TransportError;

/// Default advertised-name marker used to filter discovered devices.
pub const DEFAULT_NAME_MARKER: &str = "SmartSock";
/// Default GATT service exposing the reading.
pub const DEFAULT_SERVICE_UUID: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);
/// Default characteristic holding the reading.
pub const DEFAULT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);
/// Default scan duration for discovery.
pub const DEFAULT_SCAN_TIME: Duration = Duration::from_secs(10);
/// Default ceiling for a single characteristic read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);

/// A sock found during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    /// Advertised local name.
    pub name: String,
    /// Bluetooth address, used as the device identity.
    pub address: String,
}

/// An open connection to a sock's reading characteristic.
#[derive(Debug, Clone)]
pub struct BleLink {
    peripheral: Peripheral,
    characteristic: Characteristic,
    device: DiscoveredDevice,
}

impl BleLink {
    /// The connected device.
    pub fn device(&self) -> &DiscoveredDevice {
        &self.device
    }
}

/// Adapter for the sock's Bluetooth LE interface.
#[derive(Debug, Clone)]
pub struct BleAdapter {
    central: Adapter,
    name_marker: String,
    service_uuid: Uuid,
    characteristic_uuid: Uuid,
    scan_time: Duration,
    read_timeout: Duration,
}

impl BleAdapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> BleAdapterBuilder {
        BleAdapterBuilder::default()
    }

    /// Scan for socks and return those whose name contains the marker.
    pub async fn discover(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .map(|(_, device)| device)
            .collect())
    }

    /// Connect to a sock and locate the reading characteristic.
    ///
    /// With `address == None` the first matching device is used.
    pub async fn connect(&self, address: Option<&str>) -> Result<BleLink, TransportError> {
        let candidates = self.scan().await?;
        let (peripheral, device) = candidates
            .into_iter()
            .find(|(_, d)| address.map_or(true, |a| d.address.eq_ignore_ascii_case(a)))
            .ok_or_else(|| {
                TransportError::Unreachable(match address {
                    Some(a) => format!("no sock with address {} found", a),
                    None => format!("no device advertising '{}' found", self.name_marker),
                })
            })?;

        info!(name = %device.name, address = %device.address, "connecting to sock");
        peripheral.connect().await?;
        peripheral.discover_services().await?;

        let characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == self.characteristic_uuid && c.service_uuid == self.service_uuid)
            .ok_or_else(|| {
                TransportError::MalformedResponse(format!(
                    "characteristic {} not found in service {}",
                    self.characteristic_uuid, self.service_uuid
                ))
            })?;

        Ok(BleLink {
            peripheral,
            characteristic,
            device,
        })
    }

    /// Read the raw characteristic value.
    pub async fn read(&self, link: &BleLink) -> Result<Vec<u8>, TransportError> {
        match tokio::time::timeout(self.read_timeout, link.peripheral.read(&link.characteristic))
            .await
        {
            Ok(result) => Ok(result?),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    /// Disconnect from the sock. Failures are logged, never returned.
    pub async fn disconnect(&self, link: &BleLink) {
        if let Err(e) = link.peripheral.disconnect().await {
            warn!(address = %link.device.address, error = %e, "BLE disconnect failed");
        }
    }

    /// Watch for the link dropping without being asked to.
    ///
    /// The returned receiver yields once when the central reports the
    /// peripheral disconnected, then closes.
    pub async fn watch_disconnect(
        &self,
        link: &BleLink,
    ) -> Result<mpsc::Receiver<String>, TransportError> {
        let events = self.central.events().await?;
        let id = link.peripheral.id();
        let address = link.device.address.clone();
        let (tx, rx) = mpsc::channel(1);

        tokio::spawn(forward_disconnect(
            events,
            move |event: &CentralEvent| {
                matches!(event, CentralEvent::DeviceDisconnected(disconnected) if *disconnected == id)
            },
            address,
            tx,
        ));

        Ok(rx)
    }

    async fn scan(&self) -> Result<Vec<(Peripheral, DiscoveredDevice)>, TransportError> {
        debug!(marker = %self.name_marker, scan_time = ?self.scan_time, "scanning for socks");
        self.central.start_scan(ScanFilter::default()).await?;
        tokio::time::sleep(self.scan_time).await;
        self.central.stop_scan().await?;

        let mut found = Vec::new();
        for peripheral in self.central.peripherals().await? {
            let Some(properties) = peripheral.properties().await? else {
                continue;
            };
            let Some(name) = properties.local_name else {
                continue;
            };
            if name.contains(&self.name_marker) {
                let device = DiscoveredDevice {
                    name,
                    address: peripheral.address().to_string(),
                };
                found.push((peripheral, device));
            }
        }
        Ok(found)
    }
}

/// Send one drop reason on `tx` when `is_ours` matches an event.
///
/// Returns as soon as the receiver goes away, even if the stream is idle.
async fn forward_disconnect<S, E, F>(
    mut events: S,
    is_ours: F,
    address: String,
    tx: mpsc::Sender<String>,
) where
    S: Stream<Item = E> + Unpin,
    F: Fn(&E) -> bool,
{
    loop {
        tokio::select! {
            _ = tx.closed() => break,
            event = events.next() => match event {
                Some(event) if is_ours(&event) => {
                    debug!(address = %address, "peripheral reported disconnected");
                    let _ = tx.send(format!("{} disconnected", address)).await;
                    break;
                }
                Some(_) => {}
                None => break,
            },
        }
    }
}

/// Builder for BleAdapter.
#[derive(Debug, Default)]
pub struct BleAdapterBuilder {
    name_marker: Option<String>,
    service_uuid: Option<Uuid>,
    characteristic_uuid: Option<Uuid>,
    scan_time: Option<Duration>,
    read_timeout: Option<Duration>,
}

impl BleAdapterBuilder {
    /// Set the substring advertised names must contain (default: "SmartSock").
    pub fn name_marker(mut self, marker: impl Into<String>) -> Self {
        self.name_marker = Some(marker.into());
        self
    }

    /// Set the GATT service UUID.
    pub fn service_uuid(mut self, uuid: Uuid) -> Self {
        self.service_uuid = Some(uuid);
        self
    }

    /// Set the characteristic UUID.
    pub fn characteristic_uuid(mut self, uuid: Uuid) -> Self {
        self.characteristic_uuid = Some(uuid);
        self
    }

    /// Set how long discovery scans for (default: 10 seconds).
    pub fn scan_time(mut self, scan_time: Duration) -> Self {
        self.scan_time = Some(scan_time);
        self
    }

    /// Set the ceiling for a single read (default: 3 seconds).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Build the adapter on the first Bluetooth controller of the host.
    pub async fn build(self) -> Result<BleAdapter, TransportError> {
        let manager = Manager::new().await?;
        let central = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Unreachable("no Bluetooth adapter found".to_string()))?;

        Ok(BleAdapter {
            central,
            name_marker: self
                .name_marker
                .unwrap_or_else(|| DEFAULT_NAME_MARKER.to_string()),
            service_uuid: self.service_uuid.unwrap_or(DEFAULT_SERVICE_UUID),
            characteristic_uuid: self
                .characteristic_uuid
                .unwrap_or(DEFAULT_CHARACTERISTIC_UUID),
            scan_time: self.scan_time.unwrap_or(DEFAULT_SCAN_TIME),
            read_timeout: self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
        })
    }
}
