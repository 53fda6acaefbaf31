//! # sockwatch-types
//!
//! Core types shared by every sockwatch crate: decoded sensor samples, the
//! thresholds they are classified against, and the lifecycle states of the
//! connection, the monitoring session and the alarm.
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: the types and the evaluator are plain Rust
//! - **Optional serialization**: enable the `serde` feature as needed
//! - **One representation per session**: a sample is either numeric or a
//!   gait label, and the [`SampleKind`] is fixed before the first read
//!
//! ## Example
//!
//! ```rust
//! use sockwatch_types::{evaluate, Sample, Threshold, Verdict};
//!
//! let threshold = Threshold::numeric(1015.0);
//!
//! assert_eq!(evaluate(&Sample::numeric(1000.0), &threshold), Verdict::Normal);
//! assert_eq!(evaluate(&Sample::numeric(1016.0), &threshold), Verdict::Alert);
//!
//! let labels = Threshold::labels(["WALKING"]);
//! assert_eq!(evaluate(&Sample::label("WALKING"), &labels), Verdict::Alert);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod sample;
mod state;
mod threshold;

pub use sample::*;
pub use state::*;
pub use threshold::*;

/// Pressure unit shown next to numeric samples.
pub const PRESSURE_UNIT: &str = "hPa";
