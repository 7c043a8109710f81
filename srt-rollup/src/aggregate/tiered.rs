//! Tiered scoring path
//!
//! Outcome → tier 0..3 by achievement density, substrand → tier histogram,
//! dimension → weighted mean of tiers graded FA/MA/A/NS.

use super::{rounded_percentage, Grade};
use crate::resolve::IndicatorVerdict;
use serde::{Deserialize, Serialize};

/// Achievement density of one outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum OutcomeTier {
    /// Nothing achieved
    Zero,
    /// Some, under 60%
    One,
    /// 60% or more, not all
    Two,
    /// Everything achieved
    Three,
}

impl OutcomeTier {
    pub fn value(self) -> u8 {
        match self {
            OutcomeTier::Zero => 0,
            OutcomeTier::One => 1,
            OutcomeTier::Two => 2,
            OutcomeTier::Three => 3,
        }
    }

    /// Percentage weight in the dimension mean
    pub fn weight(self) -> u32 {
        match self {
            OutcomeTier::Three => 100,
            OutcomeTier::Two => 80,
            OutcomeTier::One => 40,
            OutcomeTier::Zero => 0,
        }
    }
}

impl From<OutcomeTier> for u8 {
    fn from(tier: OutcomeTier) -> Self {
        tier.value()
    }
}

impl TryFrom<u8> for OutcomeTier {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(OutcomeTier::Zero),
            1 => Ok(OutcomeTier::One),
            2 => Ok(OutcomeTier::Two),
            3 => Ok(OutcomeTier::Three),
            other => Err(format!("outcome tier out of range: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeTierResult {
    /// None when no indicator is rated (NR)
    pub tier: Option<OutcomeTier>,
    pub achieved: usize,
    pub rated: usize,
    pub not_rated: usize,
    /// Rounded achieved/rated percentage for display
    pub percentage: Option<u32>,
}

/// Tier an outcome from its indicator verdicts
///
/// NotRated indicators are excluded from both sides of the ratio. Bands apply
/// to the rounded percentage: 3 at 100, 2 at 60 or more, 1 above zero, 0
/// otherwise. So 59.5% is tier 2 and 99.5% is tier 3.
pub fn outcome_tier(verdicts: &[IndicatorVerdict]) -> OutcomeTierResult {
    let achieved = verdicts
        .iter()
        .filter(|v| **v == IndicatorVerdict::Achieved)
        .count();
    let rated = verdicts.iter().filter(|v| v.is_rated()).count();
    let not_rated = verdicts.len() - rated;

    let percentage = (rated > 0).then(|| rounded_percentage(achieved, rated));
    let tier = percentage.map(|pct| {
        if pct >= 100 {
            OutcomeTier::Three
        } else if pct >= 60 {
            OutcomeTier::Two
        } else if pct > 0 {
            OutcomeTier::One
        } else {
            OutcomeTier::Zero
        }
    });

    OutcomeTierResult {
        tier,
        achieved,
        rated,
        not_rated,
        percentage,
    }
}

/// Histogram of outcome tiers within a substrand
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierDistribution {
    pub tier3: usize,
    pub tier2: usize,
    pub tier1: usize,
    pub tier0: usize,
    /// Outcomes with no rated indicators
    pub not_rated: usize,
    pub total: usize,
}

pub fn substrand_distribution(tiers: &[Option<OutcomeTier>]) -> TierDistribution {
    let mut distribution = TierDistribution {
        total: tiers.len(),
        ..Default::default()
    };
    for tier in tiers {
        match tier {
            Some(OutcomeTier::Three) => distribution.tier3 += 1,
            Some(OutcomeTier::Two) => distribution.tier2 += 1,
            Some(OutcomeTier::One) => distribution.tier1 += 1,
            Some(OutcomeTier::Zero) => distribution.tier0 += 1,
            None => distribution.not_rated += 1,
        }
    }
    distribution
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionScore {
    pub percentage: u32,
    pub grade: Grade,
    pub rated_outcomes: usize,
    pub total_outcomes: usize,
}

/// Weighted mean of rated outcome tiers
///
/// Unrated outcomes are skipped. With none rated the result is 0% / NR.
pub fn dimension_score(tiers: &[Option<OutcomeTier>]) -> DimensionScore {
    let weights: Vec<u32> = tiers.iter().flatten().map(|t| t.weight()).collect();

    match super::rounded_mean(&weights) {
        Some(percentage) => DimensionScore {
            percentage,
            grade: Grade::from_percentage(f64::from(percentage)),
            rated_outcomes: weights.len(),
            total_outcomes: tiers.len(),
        },
        None => DimensionScore {
            percentage: 0,
            grade: Grade::NR,
            rated_outcomes: 0,
            total_outcomes: tiers.len(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use IndicatorVerdict::{Achieved as Y, NotAchieved as N, NotRated as NR};

    #[test]
    fn test_outcome_tier_bands() {
        assert_eq!(outcome_tier(&[Y, Y, Y]).tier, Some(OutcomeTier::Three));
        assert_eq!(outcome_tier(&[N, N, N]).tier, Some(OutcomeTier::Zero));
        assert_eq!(outcome_tier(&[Y, Y, Y, N, N]).tier, Some(OutcomeTier::Two));
        assert_eq!(outcome_tier(&[Y, N, N, N, N]).tier, Some(OutcomeTier::One));
    }

    #[test]
    fn test_not_rated_indicators_leave_ratio() {
        let result = outcome_tier(&[Y, NR, NR, Y]);
        assert_eq!(result.tier, Some(OutcomeTier::Three));
        assert_eq!(result.rated, 2);
        assert_eq!(result.not_rated, 2);
        assert_eq!(result.percentage, Some(100));
    }

    #[test]
    fn test_outcome_without_rated_indicators_is_nr() {
        let result = outcome_tier(&[NR, NR]);
        assert_eq!(result.tier, None);
        assert_eq!(result.percentage, None);
        assert_eq!(outcome_tier(&[]).tier, None);
    }

    fn ratio(achieved: usize, rated: usize) -> Vec<IndicatorVerdict> {
        let mut verdicts = vec![Y; achieved];
        verdicts.extend(vec![N; rated - achieved]);
        verdicts
    }

    #[test]
    fn test_tier_follows_rounded_percentage() {
        // 59.5% rounds to 60
        let result = outcome_tier(&ratio(119, 200));
        assert_eq!(result.percentage, Some(60));
        assert_eq!(result.tier, Some(OutcomeTier::Two));

        // 25/42 = 59.52%
        assert_eq!(outcome_tier(&ratio(25, 42)).tier, Some(OutcomeTier::Two));

        // 99.5% rounds to 100
        let result = outcome_tier(&ratio(199, 200));
        assert_eq!(result.percentage, Some(100));
        assert_eq!(result.tier, Some(OutcomeTier::Three));

        // 0.4% rounds to 0
        assert_eq!(outcome_tier(&ratio(1, 250)).tier, Some(OutcomeTier::Zero));
    }

    #[test]
    fn test_tier_agrees_with_reported_percentage() {
        for rated in 1..=50 {
            for achieved in 0..=rated {
                let result = outcome_tier(&ratio(achieved, rated));
                let expected = match result.percentage.unwrap() {
                    100 => OutcomeTier::Three,
                    p if p >= 60 => OutcomeTier::Two,
                    p if p > 0 => OutcomeTier::One,
                    _ => OutcomeTier::Zero,
                };
                assert_eq!(result.tier, Some(expected), "{}/{}", achieved, rated);
            }
        }
    }

    #[test]
    fn test_dimension_weighted_mean() {
        let tiers = [
            Some(OutcomeTier::Three),
            Some(OutcomeTier::Two),
            Some(OutcomeTier::One),
            Some(OutcomeTier::Zero),
        ];
        let score = dimension_score(&tiers);
        assert_eq!(score.percentage, 55);
        assert_eq!(score.grade, Grade::A);
        assert_eq!(score.rated_outcomes, 4);
    }

    #[test]
    fn test_dimension_skips_unrated_outcomes() {
        let score = dimension_score(&[Some(OutcomeTier::Three), None, Some(OutcomeTier::Two)]);
        assert_eq!(score.percentage, 90);
        assert_eq!(score.grade, Grade::FA);
        assert_eq!(score.rated_outcomes, 2);
        assert_eq!(score.total_outcomes, 3);
    }

    #[test]
    fn test_dimension_without_rated_outcomes_is_nr() {
        let score = dimension_score(&[None, None]);
        assert_eq!(score.percentage, 0);
        assert_eq!(score.grade, Grade::NR);
    }

    #[test]
    fn test_substrand_distribution_counts_nr_separately() {
        let distribution = substrand_distribution(&[
            Some(OutcomeTier::Three),
            Some(OutcomeTier::Three),
            Some(OutcomeTier::Zero),
            None,
        ]);
        assert_eq!(distribution.tier3, 2);
        assert_eq!(distribution.tier0, 1);
        assert_eq!(distribution.not_rated, 1);
        assert_eq!(distribution.total, 4);
    }

    #[test]
    fn test_tier_serializes_as_number() {
        assert_eq!(serde_json::to_value(OutcomeTier::Two).unwrap(), 2);
        let tier: OutcomeTier = serde_json::from_str("3").unwrap();
        assert_eq!(tier, OutcomeTier::Three);
        assert!(serde_json::from_str::<OutcomeTier>("4").is_err());
    }
}
