//! Error types for adapters.

use thiserror::Error;

/// Errors that can occur when talking to the sensor.
///
/// Every transport failure is one of these four; a session treats all of
/// them as fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No response within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// The device could not be reached (refused, no route, no adapter).
    #[error("Device unreachable: {0}")]
    Unreachable(String),

    /// The link went down before or during the call.
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// The device answered with something that is not a reading.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors from the one-shot WiFi provisioning call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The device refused the credentials.
    #[error("Configuration rejected: {0}")]
    Rejected(String),

    /// The request never got a usable answer.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::Unreachable(err.to_string())
        } else if err.is_decode() || err.is_body() || err.is_status() {
            TransportError::MalformedResponse(err.to_string())
        } else {
            TransportError::Disconnected(err.to_string())
        }
    }
}

#[cfg(feature = "ble")]
impl From<btleplug::Error> for TransportError {
    fn from(err: btleplug::Error) -> Self {
        match err {
            btleplug::Error::TimedOut(_) => TransportError::Timeout,
            btleplug::Error::NotConnected => TransportError::Disconnected(err.to_string()),
            btleplug::Error::NoSuchCharacteristic | btleplug::Error::UnexpectedCharacteristic => {
                TransportError::MalformedResponse(err.to_string())
            }
            other => TransportError::Unreachable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_converts_into_configuration_error() {
        let err: ConfigurationError = TransportError::Timeout.into();
        assert_eq!(err, ConfigurationError::Transport(TransportError::Timeout));
        assert_eq!(err.to_string(), "Request timed out");
    }

    #[test]
    fn messages_carry_the_raw_reason() {
        let err = TransportError::Unreachable("connection refused".into());
        assert_eq!(err.to_string(), "Device unreachable: connection refused");
        let err = ConfigurationError::Rejected("bad password".into());
        assert_eq!(err.to_string(), "Configuration rejected: bad password");
    }
}
