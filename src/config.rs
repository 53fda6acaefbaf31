//! Settings loaded from a TOML file and `SOCKWATCH_` environment variables.
//!
//! Precedence, lowest first: built-in defaults, the `--config` file,
//! environment variables, command-line flags (applied by the binary).
//!
//! ```toml
//! transport = "http"
//! mode = "numeric"
//! threshold = 1015.0
//! poll_period = "3s"
//!
//! [http]
//! address = "192.168.1.100"
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `SOCKWATCH_HTTP__ADDRESS=10.0.0.7`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use sockwatch_types::SampleKind;

use crate::alarm::{NotifierKind, SoundKind};
use crate::data::duration::parse_duration;
use crate::session::{SessionConfig, DEFAULT_THRESHOLD};
use crate::source::PayloadEncoding;

/// Which transport reaches the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Http,
    Ble,
    /// The built-in simulated sock.
    Demo,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub address: String,
    pub read_timeout: String,
    pub configure_timeout: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            address: "192.168.1.100".to_string(),
            read_timeout: "3s".to_string(),
            configure_timeout: "5s".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BleSettings {
    /// Substring advertised names must contain.
    pub name_marker: String,
    /// Connect to this address instead of the first sock found.
    pub address: Option<String>,
    pub service_uuid: String,
    pub characteristic_uuid: String,
    pub scan_time: String,
    pub read_timeout: String,
    pub encoding: PayloadEncoding,
}

impl Default for BleSettings {
    fn default() -> Self {
        Self {
            name_marker: "SmartSock".to_string(),
            address: None,
            service_uuid: "4fafc201-1fb5-459e-8fcc-c5c9c331914b".to_string(),
            characteristic_uuid: "beb5483e-36e1-4688-b7f5-ea07361b26a8".to_string(),
            scan_time: "10s".to_string(),
            read_timeout: "3s".to_string(),
            encoding: PayloadEncoding::Base64,
        }
    }
}

/// All runtime settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub transport: TransportKind,
    pub http: HttpSettings,
    pub ble: BleSettings,
    pub mode: SampleKind,
    pub threshold: f64,
    pub alert_labels: Vec<String>,
    pub poll_period: String,
    pub sound: SoundKind,
    pub notifier: NotifierKind,
    pub log_file: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            transport: TransportKind::Http,
            http: HttpSettings::default(),
            ble: BleSettings::default(),
            mode: SampleKind::Numeric,
            threshold: DEFAULT_THRESHOLD,
            alert_labels: vec!["WALKING".to_string()],
            poll_period: "3s".to_string(),
            sound: SoundKind::Bell,
            notifier: NotifierKind::Desktop,
            log_file: PathBuf::from("sockwatch.log"),
        }
    }
}

impl Settings {
    /// Load defaults, then `path` if given, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("SOCKWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Reject settings no session could run with.
    pub fn validate(&self) -> Result<()> {
        match self.mode {
            SampleKind::Numeric => {
                if !self.threshold.is_finite() {
                    bail!("threshold must be a finite number, got {}", self.threshold);
                }
            }
            SampleKind::Label => {
                if self.alert_labels.iter().all(|l| l.trim().is_empty()) {
                    bail!("label mode needs at least one alert label");
                }
            }
        }

        if self.poll_period()?.is_zero() {
            bail!("poll_period must be greater than zero");
        }
        self.http_read_timeout()?;
        self.http_configure_timeout()?;
        self.ble_scan_time()?;
        self.ble_read_timeout()?;
        Ok(())
    }

    pub fn poll_period(&self) -> Result<Duration> {
        parse_duration(&self.poll_period).context("poll_period")
    }

    pub fn http_read_timeout(&self) -> Result<Duration> {
        parse_duration(&self.http.read_timeout).context("http.read_timeout")
    }

    pub fn http_configure_timeout(&self) -> Result<Duration> {
        parse_duration(&self.http.configure_timeout).context("http.configure_timeout")
    }

    pub fn ble_scan_time(&self) -> Result<Duration> {
        parse_duration(&self.ble.scan_time).context("ble.scan_time")
    }

    pub fn ble_read_timeout(&self) -> Result<Duration> {
        parse_duration(&self.ble.read_timeout).context("ble.read_timeout")
    }

    /// The session parameters these settings describe.
    pub fn session_config(&self) -> Result<SessionConfig> {
        let config = match self.mode {
            SampleKind::Numeric => SessionConfig::numeric(self.threshold),
            SampleKind::Label => SessionConfig::labels(
                self.alert_labels
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty()),
            ),
        };
        Ok(config.period(self.poll_period()?))
    }
}
