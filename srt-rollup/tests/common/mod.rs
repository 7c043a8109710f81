//! Shared fixtures for srt-rollup integration tests

#![allow(dead_code)]

use srt_common::EventBus;
use srt_rollup::assessment::Assessment;
use srt_rollup::hierarchy::{Hierarchy, IndicatorRow};
use srt_rollup::model::ColumnKey;
use srt_rollup::normalize::RawValue;
use srt_rollup::store::{MemoryScoreStore, ScoreStore};
use std::sync::Arc;

pub const SCHOOL: &str = "S1";

fn row(outcome: &str, code: &str) -> IndicatorRow {
    IndicatorRow {
        dimension_id: "D1".to_string(),
        dimension_title: Some("Teaching and Learning".to_string()),
        strand_id: "D1.S1".to_string(),
        substrand_id: "D1.S1.1".to_string(),
        outcome_id: Some(outcome.to_string()),
        indicator_code: code.to_string(),
        indicator_text: format!("Indicator {}", code),
        ..Default::default()
    }
}

/// One dimension, one substrand, four outcomes:
///
/// - `O1`: `O1.a`
/// - `O2`: `O2.a`, `O2.b`, `O2.c`
/// - `O3`: `O3.a`, `O3.b`
/// - `O4`: `O4.a`
pub fn hierarchy() -> Hierarchy {
    Hierarchy::from_rows(vec![
        row("O1", "O1.a"),
        row("O2", "O2.a"),
        row("O2", "O2.b"),
        row("O2", "O2.c"),
        row("O3", "O3.a"),
        row("O3", "O3.b"),
        row("O4", "O4.a"),
    ])
}

pub fn new_assessment(store: Arc<dyn ScoreStore>) -> Assessment {
    Assessment::new(hierarchy(), store, SCHOOL, Arc::new(EventBus::new(64)))
}

pub fn assessment() -> (Arc<Assessment>, Arc<MemoryScoreStore>) {
    let store = Arc::new(MemoryScoreStore::new());
    (Arc::new(new_assessment(store.clone())), store)
}

/// Rates the fixture so outcomes land on tiers 3, 2, 1 and 0
pub fn rate_one_of_each_tier(assessment: &Assessment) {
    let lt1 = ColumnKey::Rater(1);
    for (code, value) in [
        ("O1.a", "yes"),
        ("O2.a", "yes"),
        ("O2.b", "yes"),
        ("O2.c", "no"),
        ("O3.a", "yes"),
        ("O3.b", "no"),
        ("O4.a", "no"),
    ] {
        assessment.stage(code, lt1, RawValue::from(value), "LT1");
    }
}
