//! Thresholds and the evaluator that classifies samples against them.

use alloc::collections::BTreeSet;
use alloc::string::String;

use crate::{Sample, SampleKind, SampleValue};

/// The boundary a sample is classified against.
///
/// Numeric sessions compare pressure against a single value; label
/// sessions alert when the gait label is in a fixed set.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Threshold {
    /// Alert when a sample is strictly greater than this value.
    Numeric(f64),
    /// Alert when a sample's label is one of these.
    Labels(BTreeSet<String>),
}

impl Threshold {
    /// Create a numeric threshold.
    pub fn numeric(value: f64) -> Self {
        Threshold::Numeric(value)
    }

    /// Create a label threshold from an alert-label set.
    pub fn labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Threshold::Labels(labels.into_iter().map(Into::into).collect())
    }

    /// The sample representation this threshold applies to.
    pub fn kind(&self) -> SampleKind {
        match self {
            Threshold::Numeric(_) => SampleKind::Numeric,
            Threshold::Labels(_) => SampleKind::Label,
        }
    }
}

/// Classification of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Verdict {
    Normal,
    Alert,
}

impl Verdict {
    /// Returns a short symbol for display.
    pub fn symbol(&self) -> &'static str {
        match self {
            Verdict::Normal => "OK",
            Verdict::Alert => "ALERT",
        }
    }

    pub fn is_alert(&self) -> bool {
        matches!(self, Verdict::Alert)
    }
}

/// Classify a sample against a threshold.
///
/// Numeric samples alert on strict excess (equality is normal). Label
/// samples alert on membership in the alert set. A sample whose
/// representation does not match the threshold is `Normal`; the decoder
/// guarantees this never happens inside a session.
pub fn evaluate(sample: &Sample, threshold: &Threshold) -> Verdict {
    let alert = match (sample.value(), threshold) {
        (SampleValue::Numeric(v), Threshold::Numeric(t)) => v > t,
        (SampleValue::Label(l), Threshold::Labels(set)) => set.contains(l),
        _ => false,
    };
    if alert {
        Verdict::Alert
    } else {
        Verdict::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn numeric(v: f64) -> Sample {
        Sample::with_timestamp(SampleValue::Numeric(v), 0)
    }

    fn label(l: &str) -> Sample {
        Sample::with_timestamp(SampleValue::Label(l.into()), 0)
    }

    #[test]
    fn equality_is_normal() {
        assert_eq!(evaluate(&numeric(1015.0), &Threshold::numeric(1015.0)), Verdict::Normal);
    }

    #[test]
    fn pressure_sequence_verdicts() {
        let threshold = Threshold::numeric(1015.0);
        let verdicts: Vec<Verdict> = [1000.0, 1016.0, 1020.0]
            .into_iter()
            .map(|v| evaluate(&numeric(v), &threshold))
            .collect();
        assert_eq!(verdicts, vec![Verdict::Normal, Verdict::Alert, Verdict::Alert]);
    }

    #[test]
    fn gait_sequence_verdicts() {
        let threshold = Threshold::labels(["WALKING"]);
        let verdicts: Vec<Verdict> = ["HEEL_STRIKE", "WALKING", "UNKNOWN"]
            .into_iter()
            .map(|l| evaluate(&label(l), &threshold))
            .collect();
        assert_eq!(verdicts, vec![Verdict::Normal, Verdict::Alert, Verdict::Normal]);
    }

    #[test]
    fn mismatched_representation_is_normal() {
        assert_eq!(evaluate(&label("WALKING"), &Threshold::numeric(0.0)), Verdict::Normal);
        assert_eq!(evaluate(&numeric(5.0), &Threshold::labels(["5"])), Verdict::Normal);
    }

    #[test]
    fn threshold_kind_matches_variant() {
        assert_eq!(Threshold::numeric(1.0).kind(), SampleKind::Numeric);
        assert_eq!(Threshold::labels(["WALKING"]).kind(), SampleKind::Label);
    }

    proptest! {
        /// Numeric samples alert iff strictly above the threshold.
        #[test]
        fn numeric_alert_iff_strictly_greater(v in -1.0e6f64..1.0e6, t in -1.0e6f64..1.0e6) {
            let verdict = evaluate(&numeric(v), &Threshold::numeric(t));
            prop_assert_eq!(verdict == Verdict::Alert, v > t);
        }

        /// A sample exactly at the threshold never alerts.
        #[test]
        fn numeric_equal_never_alerts(t in -1.0e6f64..1.0e6) {
            prop_assert_eq!(evaluate(&numeric(t), &Threshold::numeric(t)), Verdict::Normal);
        }

        /// Label samples alert iff the label is in the alert set.
        #[test]
        fn label_alert_iff_member(
            l in "[A-Z_]{1,12}",
            set in proptest::collection::btree_set("[A-Z_]{1,12}", 0..6),
        ) {
            let expected = set.contains(&l);
            let verdict = evaluate(&label(&l), &Threshold::Labels(set));
            prop_assert_eq!(verdict == Verdict::Alert, expected);
        }
    }
}
