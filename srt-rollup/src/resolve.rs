//! Majority-threshold resolver
//!
//! Collapses an indicator's data points into a single verdict. An indicator
//! is Achieved when at least 60% of its applicable data points say so;
//! NotApplicable points are left out of the vote entirely.

use crate::model::DataPoint;
use crate::normalize::NormalizedValue;
use serde::{Deserialize, Serialize};

/// Minimum share of applicable votes (percent) for Achieved
pub const MAJORITY_THRESHOLD_PERCENT: u32 = 60;

/// Final state of one indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorVerdict {
    Achieved,
    NotAchieved,
    /// No applicable data points; excluded from every parent ratio
    NotRated,
}

impl IndicatorVerdict {
    pub fn is_rated(self) -> bool {
        self != IndicatorVerdict::NotRated
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorResolution {
    pub verdict: IndicatorVerdict,
    pub achieved: usize,
    pub not_achieved: usize,
    pub not_applicable: usize,
    /// achieved + not_achieved
    pub applicable: usize,
    /// Unrounded share of applicable points that are Achieved
    pub percentage: Option<f64>,
    /// Distinct labels of the applicable points, in collection order
    pub source_labels: Vec<String>,
    /// Display form, e.g. `"2/3 = 67%"`
    pub breakdown: String,
}

impl IndicatorResolution {
    /// At least one data point was entered, including NotApplicable
    pub fn reviewed(&self) -> bool {
        self.applicable + self.not_applicable > 0
    }
}

/// Resolve an indicator from its collected data points
///
/// Unset points are ignored. The threshold is checked in integer arithmetic
/// so 3 of 5 (exactly 60%) is Achieved.
pub fn resolve_indicator(points: &[DataPoint]) -> IndicatorResolution {
    let mut achieved = 0usize;
    let mut not_achieved = 0usize;
    let mut not_applicable = 0usize;
    let mut source_labels: Vec<String> = Vec::new();

    for point in points {
        match point.value {
            NormalizedValue::Achieved => achieved += 1,
            NormalizedValue::NotAchieved => not_achieved += 1,
            NormalizedValue::NotApplicable => {
                not_applicable += 1;
                continue;
            }
            NormalizedValue::Unset => continue,
        }
        if !source_labels.contains(&point.source_label) {
            source_labels.push(point.source_label.clone());
        }
    }

    let applicable = achieved + not_achieved;
    let (verdict, percentage) = if applicable == 0 {
        (IndicatorVerdict::NotRated, None)
    } else {
        let verdict = if meets_majority(achieved, applicable) {
            IndicatorVerdict::Achieved
        } else {
            IndicatorVerdict::NotAchieved
        };
        (verdict, Some(achieved as f64 * 100.0 / applicable as f64))
    };

    let breakdown = match percentage {
        Some(p) => format!("{}/{} = {}%", achieved, applicable, p.round()),
        None if achieved + not_achieved + not_applicable == 0 => "No data".to_string(),
        None => "No valid data points".to_string(),
    };

    IndicatorResolution {
        verdict,
        achieved,
        not_achieved,
        not_applicable,
        applicable,
        percentage,
        source_labels,
        breakdown,
    }
}

fn meets_majority(achieved: usize, applicable: usize) -> bool {
    achieved * 100 >= MAJORITY_THRESHOLD_PERCENT as usize * applicable
}
