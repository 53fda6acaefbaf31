//! ESP32 adapter using the sock firmware's plain HTTP endpoints.
//!
//! ## Endpoints
//!
//! - `GET /pressure` - plain-text decimal pressure in hPa
//! - `GET /ping` - literal `pong` when the firmware is up
//! - `POST /configure` - `{ssid, password}` answered by `{success, message?}`
//!
//! Reads and pings use a short timeout (3 seconds by default), provisioning
//! a longer one (5 seconds).
//!
//! ## Example
//!
//! ```rust,no_run
//! use sockwatch_adapters::esp32::Esp32Adapter;
//! use sockwatch_adapters::WifiCredentials;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let adapter = Esp32Adapter::builder().address("192.168.4.1").build()?;
//!
//!     adapter
//!         .configure(&WifiCredentials::new("home-network", "secret"))
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{ConfigurationError, TransportError, WifiCredentials};

/// Default timeout for `/pressure` and `/ping`.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(3);
/// Default timeout for `/configure`.
pub const DEFAULT_CONFIGURE_TIMEOUT: Duration = Duration::from_secs(5);
/// Default address of the sensor on the local network.
pub const DEFAULT_ADDRESS: &str = "192.168.1.100";

/// Adapter for the ESP32 sensor firmware.
#[derive(Debug, Clone)]
pub struct Esp32Adapter {
    client: Client,
    endpoint: String,
    read_timeout: Duration,
    configure_timeout: Duration,
}

impl Esp32Adapter {
    /// Create a new builder for configuring the adapter.
    pub fn builder() -> Esp32AdapterBuilder {
        Esp32AdapterBuilder::default()
    }

    /// Base URL requests are sent to (e.g. `http://192.168.1.100`).
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the raw body of `GET /pressure`.
    pub async fn read_pressure(&self) -> Result<String, TransportError> {
        self.get_text("/pressure").await
    }

    /// Check that the firmware answers `GET /ping` with `pong`.
    pub async fn ping(&self) -> Result<(), TransportError> {
        let body = self.get_text("/ping").await?;
        if body.trim() == "pong" {
            Ok(())
        } else {
            Err(TransportError::MalformedResponse(
                "Invalid response from ESP32".to_string(),
            ))
        }
    }

    /// Send WiFi credentials to the firmware.
    ///
    /// One-shot: there is no retry. A `{success: false}` answer becomes
    /// [`ConfigurationError::Rejected`] carrying the firmware's message.
    pub async fn configure(&self, credentials: &WifiCredentials) -> Result<(), ConfigurationError> {
        let url = format!("{}/configure", self.endpoint);
        debug!(url = %url, ssid = %credentials.ssid, "sending WiFi credentials");

        let response = self
            .client
            .post(&url)
            .timeout(self.configure_timeout)
            .json(credentials)
            .send()
            .await
            .map_err(TransportError::from)?;

        if !response.status().is_success() {
            return Err(TransportError::MalformedResponse(format!(
                "API returned status {}",
                response.status()
            ))
            .into());
        }

        let answer: ConfigureResponse = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        answer.into_result()
    }

    async fn get_text(&self, path: &str) -> Result<String, TransportError> {
        let url = format!("{}{}", self.endpoint, path);

        let response = self
            .client
            .get(&url)
            .timeout(self.read_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TransportError::MalformedResponse(format!(
                "API returned status {}",
                response.status()
            )));
        }

        Ok(response.text().await?)
    }
}

/// Builder for Esp32Adapter.
#[derive(Debug, Default)]
pub struct Esp32AdapterBuilder {
    address: Option<String>,
    read_timeout: Option<Duration>,
    configure_timeout: Option<Duration>,
}

impl Esp32AdapterBuilder {
    /// Set the sensor address: a bare host (`192.168.1.100`), `host:port`,
    /// or a full `http://` URL.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the timeout for reads and pings (default: 3 seconds).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the timeout for provisioning (default: 5 seconds).
    pub fn configure_timeout(mut self, timeout: Duration) -> Self {
        self.configure_timeout = Some(timeout);
        self
    }

    /// Build the adapter.
    pub fn build(self) -> Result<Esp32Adapter, reqwest::Error> {
        let client = Client::builder().build()?;
        let address = self.address.unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        Ok(Esp32Adapter {
            client,
            endpoint: normalize_endpoint(&address),
            read_timeout: self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT),
            configure_timeout: self.configure_timeout.unwrap_or(DEFAULT_CONFIGURE_TIMEOUT),
        })
    }
}

// Prefix bare hosts with http:// and drop trailing slashes
fn normalize_endpoint(address: &str) -> String {
    let trimmed = address.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Answer to `POST /configure`.
#[derive(Debug, Deserialize)]
struct ConfigureResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

impl ConfigureResponse {
    fn into_result(self) -> Result<(), ConfigurationError> {
        if self.success {
            Ok(())
        } else {
            Err(ConfigurationError::Rejected(
                self.message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Configuration failed".to_string()),
            ))
        }
    }
}
