//! Turning raw payloads into samples.
//!
//! ## Submodules
//!
//! - [`decode`]: [`SampleDecoder`] maps a [`RawPayload`](crate::source::RawPayload)
//!   to a typed [`Sample`](sockwatch_types::Sample) or a [`DecodeError`]
//! - [`duration`]: Parsing and formatting of duration strings (e.g., "3s", "500ms")
//!
//! ## Data Flow
//!
//! ```text
//! Transport::read_sample()
//!        │  RawPayload (text, base64, bytes)
//!        ▼
//! SampleDecoder::decode()
//!        │  Sample
//!        ▼
//! sockwatch_types::evaluate(&sample, &threshold) ──▶ Verdict
//! ```

pub mod decode;
pub mod duration;

pub use decode::{DecodeError, SampleDecoder};
