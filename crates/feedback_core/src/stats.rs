//! Rating aggregation over heterogeneous feedback records.
//!
//! # Invariants
//! - Only integer ratings in `1..=5` contribute to averages and breakdowns.
//! - `total` counts every record, rated or not.
//! - The average of zero valid ratings is `0.0`.

use crate::model::feedback::valid_rating;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated statistics returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total_feedback: usize,
    pub average_rating: f64,
    /// Keys `"1"` to `"5"`, always all present.
    pub rating_breakdown: BTreeMap<String, u64>,
}

/// Raw aggregation result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingSummary {
    /// Records seen, including unrated and legacy ones.
    pub total: usize,
    /// Records with a valid rating.
    pub rated: usize,
    pub average: f64,
    /// Occurrences of ratings 1 to 5, indexed `rating - 1`.
    pub breakdown: [u64; 5],
}

impl RatingSummary {
    pub fn breakdown_map(&self) -> BTreeMap<String, u64> {
        self.breakdown
            .iter()
            .enumerate()
            .map(|(index, count)| ((index + 1).to_string(), *count))
            .collect()
    }

    pub fn into_stats(self) -> FeedbackStats {
        FeedbackStats {
            total_feedback: self.total,
            average_rating: self.average,
            rating_breakdown: self.breakdown_map(),
        }
    }
}

/// Summarizes raw stored ratings.
pub fn summarize_ratings<I>(ratings: I) -> RatingSummary
where
    I: IntoIterator<Item = Option<i64>>,
{
    let mut total = 0usize;
    let mut rated = 0usize;
    let mut sum = 0u64;
    let mut breakdown = [0u64; 5];

    for raw in ratings {
        total += 1;
        if let Some(rating) = valid_rating(raw) {
            rated += 1;
            sum += u64::from(rating);
            breakdown[usize::from(rating) - 1] += 1;
        }
    }

    let average = if rated == 0 {
        0.0
    } else {
        sum as f64 / rated as f64
    };

    RatingSummary {
        total,
        rated,
        average,
        breakdown,
    }
}
