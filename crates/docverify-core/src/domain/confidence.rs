//! Confidence banding of engine scores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the `high` band.
pub const HIGH_CONFIDENCE: f64 = 0.9;
/// Lower bound of the `medium` band.
pub const MEDIUM_CONFIDENCE: f64 = 0.7;

/// Coarse grouping of an engine confidence score, as shown to reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE {
            ConfidenceBand::High
        } else if score >= MEDIUM_CONFIDENCE {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(ConfidenceBand::from_score(1.0), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.9), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_score(0.89), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.7), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_score(0.69), ConfidenceBand::Low);
        assert_eq!(ConfidenceBand::from_score(0.0), ConfidenceBand::Low);
    }
}
