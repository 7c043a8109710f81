//! Simple scoring path
//!
//! Used by single-rater checklists. An outcome is graded directly on its
//! rounded percentage of achieved indicators; substrands, strands and the
//! dimension are plain rounded means of the levels below that have data.

use super::{rounded_mean, rounded_percentage, Grade};
use crate::resolve::IndicatorVerdict;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeGrade {
    pub grade: Grade,
    /// Rounded; 0 when nothing is rated
    pub percentage: u32,
    pub met: usize,
    pub total: usize,
}

impl OutcomeGrade {
    pub fn is_rated(&self) -> bool {
        self.grade != Grade::NR
    }
}

/// Grade an outcome on achieved / rated indicators
pub fn simple_outcome_grade(verdicts: &[IndicatorVerdict]) -> OutcomeGrade {
    let total = verdicts.iter().filter(|v| v.is_rated()).count();
    if total == 0 {
        return OutcomeGrade {
            grade: Grade::NR,
            percentage: 0,
            met: 0,
            total: 0,
        };
    }

    let met = verdicts
        .iter()
        .filter(|v| **v == IndicatorVerdict::Achieved)
        .count();
    let percentage = rounded_percentage(met, total);

    OutcomeGrade {
        grade: Grade::from_percentage(f64::from(percentage)),
        percentage,
        met,
        total,
    }
}

/// Outcome count per grade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[allow(non_snake_case)]
pub struct GradeDistribution {
    pub FA: usize,
    pub MA: usize,
    pub A: usize,
    pub NS: usize,
    pub NR: usize,
    pub total: usize,
}

pub fn grade_distribution(outcomes: &[OutcomeGrade]) -> GradeDistribution {
    let mut distribution = GradeDistribution {
        total: outcomes.len(),
        ..Default::default()
    };
    for outcome in outcomes {
        match outcome.grade {
            Grade::FA => distribution.FA += 1,
            Grade::MA => distribution.MA += 1,
            Grade::A => distribution.A += 1,
            Grade::NS => distribution.NS += 1,
            Grade::NR => distribution.NR += 1,
        }
    }
    distribution
}

/// Mean percentage of the rated outcomes; None when none are rated
pub fn simple_substrand_score(outcomes: &[OutcomeGrade]) -> Option<u32> {
    let rated: Vec<u32> = outcomes
        .iter()
        .filter(|o| o.is_rated())
        .map(|o| o.percentage)
        .collect();
    rounded_mean(&rated)
}

/// Mean of the substrand scores that have data
pub fn simple_strand_score(substrand_scores: &[Option<u32>]) -> Option<u32> {
    let scored: Vec<u32> = substrand_scores.iter().flatten().copied().collect();
    rounded_mean(&scored)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimpleDimensionScore {
    pub percentage: u32,
    pub grade: Grade,
    /// Strands that contributed
    pub scored_strands: usize,
}

/// Mean of the strand scores that have data, graded
pub fn simple_dimension_score(strand_scores: &[Option<u32>]) -> SimpleDimensionScore {
    let scored: Vec<u32> = strand_scores.iter().flatten().copied().collect();
    match rounded_mean(&scored) {
        Some(percentage) => SimpleDimensionScore {
            percentage,
            grade: Grade::from_percentage(f64::from(percentage)),
            scored_strands: scored.len(),
        },
        None => SimpleDimensionScore {
            percentage: 0,
            grade: Grade::NR,
            scored_strands: 0,
        },
    }
}
