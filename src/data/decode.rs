//! Sample decoding.
//!
//! A decoder is fixed to one [`SampleKind`] for its whole life. Numeric
//! decoding parses the trimmed text as a finite `f64`; label decoding
//! keeps the trimmed text verbatim, so labels the evaluator does not know
//! are still valid samples.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sockwatch_types::{Sample, SampleKind};
use thiserror::Error;

use crate::source::RawPayload;

/// Why a payload could not become a sample.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The text does not parse as a finite number.
    #[error("Not a number: {0:?}")]
    NotANumber(String),

    /// Nothing but whitespace was received.
    #[error("Empty payload")]
    EmptyPayload,

    /// The bytes are not valid base64 or UTF-8.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),
}

/// Decodes raw payloads into samples of one kind.
#[derive(Debug, Clone, Copy)]
pub struct SampleDecoder {
    kind: SampleKind,
}

impl SampleDecoder {
    pub fn new(kind: SampleKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    /// Decode one payload, stamping the sample with the current time.
    pub fn decode(&self, payload: &RawPayload) -> Result<Sample, DecodeError> {
        let text = payload_text(payload)?;
        let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
        if text.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        match self.kind {
            SampleKind::Numeric => {
                let value: f64 = text
                    .parse()
                    .map_err(|_| DecodeError::NotANumber(text.to_string()))?;
                if !value.is_finite() {
                    return Err(DecodeError::NotANumber(text.to_string()));
                }
                Ok(Sample::numeric(value))
            }
            SampleKind::Label => Ok(Sample::label(text)),
        }
    }
}

fn payload_text(payload: &RawPayload) -> Result<Cow<'_, str>, DecodeError> {
    match payload {
        RawPayload::Text(text) => Ok(Cow::Borrowed(text.as_str())),
        RawPayload::Base64(encoded) => {
            let bytes = STANDARD
                .decode(encoded.trim())
                .map_err(|e| DecodeError::InvalidEncoding(e.to_string()))?;
            String::from_utf8(bytes)
                .map(Cow::Owned)
                .map_err(|e| DecodeError::InvalidEncoding(e.to_string()))
        }
        RawPayload::Bytes(bytes) => std::str::from_utf8(bytes)
            .map(Cow::Borrowed)
            .map_err(|e| DecodeError::InvalidEncoding(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sockwatch_types::SampleValue;

    fn numeric(text: &str) -> Result<Sample, DecodeError> {
        SampleDecoder::new(SampleKind::Numeric).decode(&RawPayload::Text(text.to_string()))
    }

    #[test]
    fn parses_plain_pressure() {
        let sample = numeric("1016.25").unwrap();
        assert_eq!(sample.value(), &SampleValue::Numeric(1016.25));
        assert!(sample.timestamp_ms() > 0);
    }

    #[test]
    fn trims_whitespace_and_newlines() {
        let sample = numeric("  1013.0\r\n").unwrap();
        assert_eq!(sample.value().as_numeric(), Some(1013.0));
    }

    #[test]
    fn rejects_non_numeric_text() {
        assert_eq!(numeric("abc"), Err(DecodeError::NotANumber("abc".into())));
        assert!(matches!(numeric("1016.2 hPa"), Err(DecodeError::NotANumber(_))));
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(matches!(numeric("NaN"), Err(DecodeError::NotANumber(_))));
        assert!(matches!(numeric("inf"), Err(DecodeError::NotANumber(_))));
        assert!(matches!(numeric("1e400"), Err(DecodeError::NotANumber(_))));
    }

    #[test]
    fn rejects_empty_payload() {
        assert_eq!(numeric(""), Err(DecodeError::EmptyPayload));
        assert_eq!(numeric(" \n"), Err(DecodeError::EmptyPayload));
    }

    #[test]
    fn decodes_base64_numeric() {
        // "1020.5"
        let payload = RawPayload::Base64("MTAyMC41".to_string());
        let sample = SampleDecoder::new(SampleKind::Numeric)
            .decode(&payload)
            .unwrap();
        assert_eq!(sample.value().as_numeric(), Some(1020.5));
    }

    #[test]
    fn decodes_base64_label_verbatim() {
        // "HEEL_STRIKE"
        let payload = RawPayload::Base64("SEVFTF9TVFJJS0U=".to_string());
        let sample = SampleDecoder::new(SampleKind::Label).decode(&payload).unwrap();
        assert_eq!(sample.value().as_label(), Some("HEEL_STRIKE"));
    }

    #[test]
    fn unknown_labels_are_still_samples() {
        let payload = RawPayload::Bytes(b"MOONWALKING\0".to_vec());
        let sample = SampleDecoder::new(SampleKind::Label).decode(&payload).unwrap();
        assert_eq!(sample.value().as_label(), Some("MOONWALKING"));
    }

    #[test]
    fn invalid_base64_is_an_encoding_error() {
        let payload = RawPayload::Base64("%%%".to_string());
        assert!(matches!(
            SampleDecoder::new(SampleKind::Label).decode(&payload),
            Err(DecodeError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn invalid_utf8_bytes_are_an_encoding_error() {
        let payload = RawPayload::Bytes(vec![0xff, 0xfe]);
        assert!(matches!(
            SampleDecoder::new(SampleKind::Numeric).decode(&payload),
            Err(DecodeError::InvalidEncoding(_))
        ));
    }

    proptest! {
        #[test]
        fn finite_values_round_trip_through_text(v in -1.0e6f64..1.0e6f64) {
            let sample = numeric(&v.to_string()).unwrap();
            prop_assert_eq!(sample.value().as_numeric(), Some(v));
        }

        #[test]
        fn alphabetic_text_never_decodes_as_numeric(s in "[a-zA-Z_]{1,12}") {
            prop_assert!(matches!(numeric(&s), Err(DecodeError::NotANumber(_))));
        }
    }
}
