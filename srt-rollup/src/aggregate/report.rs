//! Summary views shown next to dimension scores

use super::rounded_percentage;
use super::tiered::OutcomeTier;
use crate::normalize::NormalizedValue;
use serde::Serialize;

/// Value counts for a set of indicators, one value per indicator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndicatorStats {
    pub yes: usize,
    pub no: usize,
    pub nr: usize,
    pub unscored: usize,
    pub total: usize,
}

pub fn indicator_stats(values: &[NormalizedValue]) -> IndicatorStats {
    let mut stats = IndicatorStats {
        total: values.len(),
        ..Default::default()
    };
    for value in values {
        match value {
            NormalizedValue::Achieved => stats.yes += 1,
            NormalizedValue::NotAchieved => stats.no += 1,
            NormalizedValue::NotApplicable => stats.nr += 1,
            NormalizedValue::Unset => stats.unscored += 1,
        }
    }
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionRate {
    pub completed: usize,
    pub total: usize,
    pub percentage: u32,
}

/// Share of indicators with at least one entered value
pub fn completion(reviewed: &[bool]) -> CompletionRate {
    let completed = reviewed.iter().filter(|r| **r).count();
    CompletionRate {
        completed,
        total: reviewed.len(),
        percentage: rounded_percentage(completed, reviewed.len()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrengthsAndNeeds {
    /// Outcomes at tier 3
    pub strengths: Vec<String>,
    /// Outcomes at tier 0 or 1
    pub needs_help: Vec<String>,
}

/// Split outcomes by tier, keeping input order
pub fn strengths_and_needs<'a>(
    outcomes: impl IntoIterator<Item = (&'a str, Option<OutcomeTier>)>,
) -> StrengthsAndNeeds {
    let mut result = StrengthsAndNeeds::default();
    for (id, tier) in outcomes {
        match tier {
            Some(OutcomeTier::Three) => result.strengths.push(id.to_string()),
            Some(OutcomeTier::Zero | OutcomeTier::One) => result.needs_help.push(id.to_string()),
            Some(OutcomeTier::Two) | None => {}
        }
    }
    result
}
