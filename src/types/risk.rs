//! Credit score and risk category derived from a probability of default

use serde::{Deserialize, Serialize};

/// Best score, assigned to a probability of default of 0.
pub const MAX_CREDIT_SCORE: i32 = 900;
/// Worst score, assigned to a probability of default of 1.
pub const MIN_CREDIT_SCORE: i32 = 300;

/// Map a probability of default onto the [300, 900] credit score range.
///
/// `round(900 - p * 600)`: 900 is the lowest risk, 300 the highest.
pub fn credit_score(probability: f64) -> i32 {
    let span = (MAX_CREDIT_SCORE - MIN_CREDIT_SCORE) as f64;
    (MAX_CREDIT_SCORE as f64 - probability * span).round() as i32
}

/// Risk category classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    /// Determine the category from a probability of default and thresholds
    pub fn from_probability(probability: f64, thresholds: &RiskThresholds) -> Self {
        if probability < thresholds.low {
            RiskCategory::Low
        } else if probability < thresholds.medium {
            RiskCategory::Medium
        } else {
            RiskCategory::High
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
        }
    }
}

/// Upper bounds (exclusive) of the low and medium categories
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub low: f64,
    pub medium: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: 0.3,
            medium: 0.6,
        }
    }
}
