//! Hierarchical aggregator
//!
//! Pure functions that roll indicator verdicts up the hierarchy. Two outcome
//! grading paths exist side by side and are chosen explicitly by the caller:
//!
//! - [`tiered`]: outcome tier 0..3, weighted into a dimension percentage
//! - [`simple`]: outcome percentage graded directly, averaged upward
//!
//! Both share [`Grade`] and its thresholds. Nothing here stores state; every
//! result is recomputed from current verdicts.

pub mod report;
pub mod simple;
pub mod tiered;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use report::{
    completion, indicator_stats, strengths_and_needs, CompletionRate, IndicatorStats,
    StrengthsAndNeeds,
};
pub use simple::{
    grade_distribution, simple_dimension_score, simple_outcome_grade, simple_strand_score,
    simple_substrand_score, GradeDistribution, OutcomeGrade, SimpleDimensionScore,
};
pub use tiered::{
    dimension_score, outcome_tier, substrand_distribution, DimensionScore, OutcomeTier,
    OutcomeTierResult, TierDistribution,
};

/// Lowest percentage graded FA
pub const FULLY_ACHIEVED_MIN: f64 = 90.0;
/// Lowest percentage graded MA
pub const MOSTLY_ACHIEVED_MIN: f64 = 70.0;
/// Lowest percentage graded A
pub const ACHIEVED_MIN: f64 = 50.0;

/// Letter grade shared by both scoring paths
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grade {
    /// Fully Achieved
    FA,
    /// Mostly Achieved
    MA,
    /// Achieved
    A,
    /// Not Sufficient
    NS,
    /// Not Reviewed: nothing rated
    NR,
}

impl Grade {
    /// Grade a percentage. Never returns NR; callers decide when nothing was rated.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= FULLY_ACHIEVED_MIN {
            Grade::FA
        } else if percentage >= MOSTLY_ACHIEVED_MIN {
            Grade::MA
        } else if percentage >= ACHIEVED_MIN {
            Grade::A
        } else {
            Grade::NS
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Grade::FA => "Fully Achieved",
            Grade::MA => "Mostly Achieved",
            Grade::A => "Achieved",
            Grade::NS => "Not Sufficient",
            Grade::NR => "Not Reviewed",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            Grade::FA => "FA",
            Grade::MA => "MA",
            Grade::A => "A",
            Grade::NS => "NS",
            Grade::NR => "NR",
        };
        f.write_str(code)
    }
}

/// Which outcome grading function a view uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringPath {
    #[default]
    Tiered,
    Simple,
}

/// Overall score across dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OverallScore {
    pub percentage: u32,
    pub grade: Grade,
    /// Dimensions with a non-zero percentage
    pub counted_dimensions: usize,
}

/// Rounded mean of the dimension percentages above zero
///
/// A dimension at 0% is indistinguishable from an unreviewed one here and
/// is left out. NR with 0% when none qualify.
pub fn overall_score(dimension_percentages: &[u32]) -> OverallScore {
    let counted: Vec<u32> = dimension_percentages.iter().copied().filter(|p| *p > 0).collect();
    match rounded_mean(&counted) {
        Some(percentage) => OverallScore {
            percentage,
            grade: Grade::from_percentage(f64::from(percentage)),
            counted_dimensions: counted.len(),
        },
        None => OverallScore {
            percentage: 0,
            grade: Grade::NR,
            counted_dimensions: 0,
        },
    }
}

/// `round(mean(values))`, halves rounded up; None for an empty slice
pub(crate) fn rounded_mean(values: &[u32]) -> Option<u32> {
    if values.is_empty() {
        return None;
    }
    let sum: u64 = values.iter().map(|&v| u64::from(v)).sum();
    Some((sum as f64 / values.len() as f64).round() as u32)
}

/// `round(part / whole * 100)`; 0 when whole is 0
pub(crate) fn rounded_percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 * 100.0 / whole as f64).round() as u32
}
