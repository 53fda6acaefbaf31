//! # sockwatch-adapters
//!
//! Device adapters for the Smart Sock pressure sensor.
//!
//! Each adapter talks to one kind of firmware and hands back raw payloads;
//! decoding and threshold evaluation happen in the `sockwatch` crate.
//!
//! ## Supported Devices
//!
//! - **ESP32 over WiFi** (`http` feature) - polls `GET /pressure`, checks
//!   reachability with `GET /ping` and provisions WiFi credentials with
//!   `POST /configure`
//! - **Bluetooth LE** (`ble` feature) - reads a single GATT characteristic
//!   whose value is a base64-encoded reading or gait label
//!
//! ## Quick Start (ESP32)
//!
//! ```rust,no_run
//! use sockwatch_adapters::esp32::Esp32Adapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = Esp32Adapter::builder()
//!         .address("192.168.1.100")
//!         .build()?;
//!
//!     adapter.ping().await?;
//!     let body = adapter.read_pressure().await?;
//!
//!     println!("Raw pressure: {}", body);
//!     Ok(())
//! }
//! ```

pub mod error;

#[cfg(feature = "http")]
pub mod esp32;

#[cfg(feature = "ble")]
pub mod ble;

pub use error::{ConfigurationError, TransportError};

/// WiFi credentials sent to the sensor during provisioning.
#[derive(Clone, serde::Serialize)]
pub struct WifiCredentials {
    pub ssid: String,
    pub password: String,
}

impl WifiCredentials {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"<redacted>")
            .finish()
    }
}
