//! Sample - one decoded sensor reading.

use alloc::string::String;
use core::fmt;

/// The representation a session samples in.
///
/// Chosen once when a session is configured; a session never mixes
/// numeric and label samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SampleKind {
    /// Pressure readings in hPa.
    #[default]
    Numeric,
    /// Discrete gait-state labels such as `WALKING` or `HEEL_STRIKE`.
    Label,
}

impl SampleKind {
    /// Returns the lowercase name used in configuration files.
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::Numeric => "numeric",
            SampleKind::Label => "label",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value carried by a [`Sample`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum SampleValue {
    /// A finite pressure value.
    Numeric(f64),
    /// A gait-state label, used verbatim (unrecognized labels are valid).
    Label(String),
}

impl SampleValue {
    /// The representation of this value.
    pub fn kind(&self) -> SampleKind {
        match self {
            SampleValue::Numeric(_) => SampleKind::Numeric,
            SampleValue::Label(_) => SampleKind::Label,
        }
    }

    /// The numeric value, if this is a numeric sample.
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            SampleValue::Numeric(v) => Some(*v),
            SampleValue::Label(_) => None,
        }
    }

    /// The label, if this is a label sample.
    pub fn as_label(&self) -> Option<&str> {
        match self {
            SampleValue::Numeric(_) => None,
            SampleValue::Label(l) => Some(l),
        }
    }
}

impl fmt::Display for SampleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleValue::Numeric(v) => write!(f, "{:.2} {}", v, crate::PRESSURE_UNIT),
            SampleValue::Label(l) => f.write_str(l),
        }
    }
}

/// One decoded sensor reading with its capture time.
///
/// Samples are immutable once produced; fields are read through accessors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    value: SampleValue,
    timestamp_ms: u64,
}

impl Sample {
    /// Create a sample with an explicit capture time (Unix milliseconds).
    pub fn with_timestamp(value: SampleValue, timestamp_ms: u64) -> Self {
        Self {
            value,
            timestamp_ms,
        }
    }

    /// Create a numeric sample captured now.
    #[cfg(feature = "std")]
    pub fn numeric(value: f64) -> Self {
        Self::with_timestamp(SampleValue::Numeric(value), current_timestamp_ms())
    }

    /// Create a label sample captured now.
    #[cfg(feature = "std")]
    pub fn label(label: impl Into<String>) -> Self {
        Self::with_timestamp(SampleValue::Label(label.into()), current_timestamp_ms())
    }

    /// The decoded value.
    pub fn value(&self) -> &SampleValue {
        &self.value
    }

    /// Capture time in Unix milliseconds.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    /// The representation of this sample.
    pub fn kind(&self) -> SampleKind {
        self.value.kind()
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

/// Current wall-clock time in Unix milliseconds.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
