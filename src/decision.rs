//! Fusing classifier probability and regressed logBB into one verdict.
//!
//! Rules are tried in order and the first match wins:
//!
//! | # | Condition                                   | Verdict |
//! |---|---------------------------------------------|---------|
//! | 1 | `prob >= 0.85` and `logbb > -0.3`           | Yes     |
//! | 2 | `prob >= 0.55` and `logbb > 0.0`            | Yes     |
//! | 3 | `prob > 0.4` and `logbb > -0.4`             | Yes     |
//! | 4 | otherwise                                   | No      |
//!
//! After that, `prob < 0.2` forces No whatever the rules said.
//!
//! ```
//! use bbbp::decision::{decide, Verdict};
//!
//! assert_eq!(decide(0.9, -0.2), Verdict::Yes);
//! assert_eq!(decide(0.1, 2.0), Verdict::No);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Final BBB permeability call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Predicted to cross the blood-brain barrier.
    Yes,
    /// Predicted not to cross.
    No,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Yes => f.write_str("Yes"),
            Verdict::No => f.write_str("No"),
        }
    }
}

/// Every boundary of the decision cascade.
///
/// Missing keys in a config file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionThresholds {
    /// Rule 1 minimum probability (inclusive).
    pub high_prob: f64,
    /// Rule 1 logBB floor (exclusive).
    pub high_logbb: f64,
    /// Rule 2 minimum probability (inclusive).
    pub mid_prob: f64,
    /// Rule 2 logBB floor (exclusive).
    pub mid_logbb: f64,
    /// Rule 3 probability floor (exclusive).
    pub low_prob: f64,
    /// Rule 3 logBB floor (exclusive).
    pub low_logbb: f64,
    /// Probabilities strictly below this are always No.
    pub veto_prob: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            high_prob: 0.85,
            high_logbb: -0.3,
            mid_prob: 0.55,
            mid_logbb: 0.0,
            low_prob: 0.4,
            low_logbb: -0.4,
            veto_prob: 0.2,
        }
    }
}

impl DecisionThresholds {
    /// Run the cascade.
    #[must_use]
    pub fn decide(&self, prob: f64, logbb: f64) -> Verdict {
        let passes = (prob >= self.high_prob && logbb > self.high_logbb)
            || (prob >= self.mid_prob && logbb > self.mid_logbb)
            || (prob > self.low_prob && logbb > self.low_logbb);
        if passes && prob >= self.veto_prob {
            Verdict::Yes
        } else {
            Verdict::No
        }
    }
}

/// [`DecisionThresholds::decide`] with the default thresholds.
pub fn decide(prob: f64, logbb: f64) -> Verdict {
    DecisionThresholds::default().decide(prob, logbb)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_cases() {
        assert_eq!(decide(0.90, 0.0), Verdict::Yes); // rule 1
        assert_eq!(decide(0.60, 0.1), Verdict::Yes); // rule 2
        assert_eq!(decide(0.45, -0.2), Verdict::Yes); // rule 3
        assert_eq!(decide(0.50, -0.5), Verdict::No); // no rule
        assert_eq!(decide(0.10, 5.0), Verdict::No); // veto
    }

    #[test]
    fn nearby_cases() {
        assert_eq!(decide(0.90, -0.25), Verdict::Yes);
        assert_eq!(decide(0.45, -0.35), Verdict::Yes);
        assert_eq!(decide(0.15, 1.00), Verdict::No);
    }

    #[test]
    fn boundaries_are_inclusive_or_exclusive_as_documented() {
        assert_eq!(decide(0.85, -0.29), Verdict::Yes);
        assert_eq!(decide(0.85, -0.3), Verdict::Yes); // rule 3 still catches it
        assert_eq!(decide(0.55, 0.0), Verdict::Yes); // rule 3 again
        assert_eq!(decide(0.4, 0.0), Verdict::No); // 0.4 is not > 0.4
        assert_eq!(decide(0.41, -0.4), Verdict::No);
        assert_eq!(decide(0.2, 5.0), Verdict::No);
    }

    #[test]
    fn veto_overrides_a_custom_permissive_cascade() {
        let t = DecisionThresholds {
            low_prob: 0.0,
            ..DecisionThresholds::default()
        };
        assert_eq!(t.decide(0.1, 3.0), Verdict::No);
        assert_eq!(t.decide(0.25, 3.0), Verdict::Yes);
    }

    #[test]
    fn thresholds_deserialize_with_defaults() {
        let t: DecisionThresholds = toml::from_str("low_prob = 0.5").unwrap();
        assert_eq!(t.low_prob, 0.5);
        assert_eq!(t.high_prob, 0.85);
        assert_eq!(Verdict::Yes.to_string(), "Yes");
    }
}
