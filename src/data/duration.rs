use std::time::Duration;

use anyhow::{bail, Result};

/// Suffix to milliseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ms", 1.0),
    ("s", 1_000.0),
    ("m", 60_000.0),
    ("h", 3_600_000.0),
];

/// Parse duration strings like "3s", "1500ms", "0.5s", "2m".
///
/// A bare number is taken as milliseconds.
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            return millis(val_str.trim(), *multiplier, s);
        }
    }

    if s.chars().all(|c| c.is_ascii_digit() || c == '.') && !s.is_empty() {
        return millis(s, 1.0, s);
    }

    bail!("Unknown duration format: {}", s)
}

fn millis(val_str: &str, multiplier: f64, original: &str) -> Result<Duration> {
    let val: f64 = val_str.parse()?;
    if !val.is_finite() || val < 0.0 {
        bail!("Invalid duration: {}", original);
    }
    Ok(Duration::from_micros((val * multiplier * 1_000.0).round() as u64))
}

/// Format a duration for display
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1_000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        let secs = d.as_secs();
        format!("{}m{:02}s", secs / 60, secs % 60)
    }
}
