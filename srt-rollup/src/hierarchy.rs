//! Assessment hierarchy topology
//!
//! Ordered `Dimension → Strand → Substrand → Outcome → Indicator` tree. The
//! tree carries no score state: it only tells the aggregator which
//! indicators roll up into which outcome, substrand and dimension.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Group id used when a row leaves a grouping column blank
const UNKNOWN_GROUP: &str = "Unknown";

#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("failed to read hierarchy file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse hierarchy file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub code: String,
    pub text: String,
    pub outcome_id: String,
    pub substrand_id: String,
    pub strand_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: String,
    pub title: String,
    pub indicators: Vec<Indicator>,
}

impl Outcome {
    pub fn indicator_codes(&self) -> impl Iterator<Item = &str> {
        self.indicators.iter().map(|i| i.code.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Substrand {
    pub id: String,
    pub title: String,
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strand {
    pub id: String,
    pub title: String,
    pub substrands: Vec<Substrand>,
}

impl Strand {
    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.substrands.iter().flat_map(|s| s.outcomes.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub id: String,
    pub title: String,
    pub strands: Vec<Strand>,
}

impl Dimension {
    pub fn outcomes(&self) -> impl Iterator<Item = &Outcome> {
        self.strands.iter().flat_map(|s| s.outcomes())
    }

    pub fn indicators(&self) -> impl Iterator<Item = &Indicator> {
        self.outcomes().flat_map(|o| o.indicators.iter())
    }
}

/// One flat line of hierarchy source data
///
/// Titles default to the id when absent. `outcome_id` is optional because
/// source sheets contain header and spacer lines with no outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorRow {
    pub dimension_id: String,
    pub dimension_title: Option<String>,
    pub strand_id: String,
    pub strand_title: Option<String>,
    pub substrand_id: String,
    pub substrand_title: Option<String>,
    pub outcome_id: Option<String>,
    pub outcome_title: Option<String>,
    pub indicator_code: String,
    pub indicator_text: String,
}

/// Position of a node in the tree, by child index at each level
#[derive(Debug, Clone, Copy)]
struct NodePath {
    dimension: usize,
    strand: usize,
    substrand: usize,
    outcome: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    dimensions: Vec<Dimension>,
    dimension_index: HashMap<String, usize>,
    substrand_index: HashMap<String, NodePath>,
    outcome_index: HashMap<String, NodePath>,
    indicator_index: HashMap<String, (NodePath, usize)>,
}

impl Hierarchy {
    /// Build from an already-grouped tree
    ///
    /// Ids are expected to be unique per level; on collision the first node
    /// in tree order wins the lookup.
    pub fn new(dimensions: Vec<Dimension>) -> Self {
        let mut hierarchy = Self {
            dimensions,
            ..Default::default()
        };
        hierarchy.build_index();
        hierarchy
    }

    /// Group flat rows into a tree, preserving first-seen order
    ///
    /// Rows with no outcome or no indicator code are dropped. A repeated
    /// indicator code keeps its first occurrence.
    pub fn from_rows(rows: impl IntoIterator<Item = IndicatorRow>) -> Self {
        let mut dimensions: Vec<Dimension> = Vec::new();
        let mut seen_codes: HashSet<String> = HashSet::new();
        let mut dropped = 0usize;

        for row in rows {
            let code = row.indicator_code.trim();
            let outcome_id = row
                .outcome_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty());

            let outcome_id = match outcome_id {
                Some(id) if !code.is_empty() => id.to_string(),
                _ => {
                    debug!(code = %row.indicator_code, "Dropping hierarchy row without outcome or code");
                    dropped += 1;
                    continue;
                }
            };

            if !seen_codes.insert(code.to_string()) {
                warn!(code, "Duplicate indicator code in hierarchy rows, keeping first");
                dropped += 1;
                continue;
            }

            let dimension_id = group_id(&row.dimension_id);
            let strand_id = group_id(&row.strand_id);
            let substrand_id = group_id(&row.substrand_id);

            let dimension = find_or_push(&mut dimensions, |d| d.id == dimension_id, || Dimension {
                id: dimension_id.clone(),
                title: title_or_id(&row.dimension_title, &dimension_id),
                strands: Vec::new(),
            });
            let strand = find_or_push(&mut dimension.strands, |s| s.id == strand_id, || Strand {
                id: strand_id.clone(),
                title: title_or_id(&row.strand_title, &strand_id),
                substrands: Vec::new(),
            });
            let substrand = find_or_push(&mut strand.substrands, |s| s.id == substrand_id, || Substrand {
                id: substrand_id.clone(),
                title: title_or_id(&row.substrand_title, &substrand_id),
                outcomes: Vec::new(),
            });
            let outcome = find_or_push(&mut substrand.outcomes, |o| o.id == outcome_id, || Outcome {
                id: outcome_id.clone(),
                title: title_or_id(&row.outcome_title, &outcome_id),
                indicators: Vec::new(),
            });

            outcome.indicators.push(Indicator {
                code: code.to_string(),
                text: row.indicator_text.trim().to_string(),
                outcome_id: outcome_id.clone(),
                substrand_id: substrand_id.clone(),
                strand_id: strand_id.clone(),
            });
        }

        if dropped > 0 {
            debug!(dropped, "Hierarchy rows skipped");
        }

        Self::new(dimensions)
    }

    /// Load a JSON array of [`IndicatorRow`]s
    pub fn load_json(path: &Path) -> Result<Self, HierarchyError> {
        let text = std::fs::read_to_string(path).map_err(|source| HierarchyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let rows: Vec<IndicatorRow> =
            serde_json::from_str(&text).map_err(|source| HierarchyError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let hierarchy = Self::from_rows(rows);
        info!(
            path = %path.display(),
            dimensions = hierarchy.dimensions.len(),
            indicators = hierarchy.indicator_index.len(),
            "Loaded hierarchy"
        );
        Ok(hierarchy)
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, id: &str) -> Option<&Dimension> {
        self.dimension_index.get(id).map(|&i| &self.dimensions[i])
    }

    pub fn substrand(&self, id: &str) -> Option<&Substrand> {
        self.substrand_index
            .get(id)
            .map(|p| &self.dimensions[p.dimension].strands[p.strand].substrands[p.substrand])
    }

    pub fn outcome(&self, id: &str) -> Option<&Outcome> {
        self.outcome_index.get(id).map(|p| self.outcome_at(p))
    }

    pub fn indicator(&self, code: &str) -> Option<&Indicator> {
        self.indicator_index
            .get(code)
            .map(|(p, i)| &self.outcome_at(p).indicators[*i])
    }

    pub fn indicator_count(&self) -> usize {
        self.indicator_index.len()
    }

    fn outcome_at(&self, p: &NodePath) -> &Outcome {
        &self.dimensions[p.dimension].strands[p.strand].substrands[p.substrand].outcomes[p.outcome]
    }

    fn build_index(&mut self) {
        for (d, dimension) in self.dimensions.iter().enumerate() {
            self.dimension_index.entry(dimension.id.clone()).or_insert(d);
            for (s, strand) in dimension.strands.iter().enumerate() {
                for (ss, substrand) in strand.substrands.iter().enumerate() {
                    let mut path = NodePath {
                        dimension: d,
                        strand: s,
                        substrand: ss,
                        outcome: 0,
                    };
                    self.substrand_index.entry(substrand.id.clone()).or_insert(path);
                    for (o, outcome) in substrand.outcomes.iter().enumerate() {
                        path.outcome = o;
                        self.outcome_index.entry(outcome.id.clone()).or_insert(path);
                        for (i, indicator) in outcome.indicators.iter().enumerate() {
                            self.indicator_index
                                .entry(indicator.code.clone())
                                .or_insert((path, i));
                        }
                    }
                }
            }
        }
    }
}

fn group_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        UNKNOWN_GROUP.to_string()
    } else {
        trimmed.to_string()
    }
}

fn title_or_id(title: &Option<String>, id: &str) -> String {
    title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(id)
        .to_string()
}

fn find_or_push<T>(items: &mut Vec<T>, matches: impl Fn(&T) -> bool, make: impl FnOnce() -> T) -> &mut T {
    let index = match items.iter().position(matches) {
        Some(i) => i,
        None => {
            items.push(make());
            items.len() - 1
        }
    };
    &mut items[index]
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn row(dimension: &str, strand: &str, substrand: &str, outcome: &str, code: &str) -> IndicatorRow {
        IndicatorRow {
            dimension_id: dimension.to_string(),
            strand_id: strand.to_string(),
            substrand_id: substrand.to_string(),
            outcome_id: Some(outcome.to_string()),
            indicator_code: code.to_string(),
            indicator_text: format!("Indicator {}", code),
            ..Default::default()
        }
    }

    #[test]
    fn test_rows_group_in_first_seen_order() {
        let hierarchy = Hierarchy::from_rows(vec![
            row("D1", "S1", "SS1", "O1", "I1"),
            row("D1", "S1", "SS1", "O1", "I2"),
            row("D1", "S1", "SS2", "O2", "I3"),
            row("D2", "S2", "SS3", "O3", "I4"),
            row("D1", "S1", "SS1", "O1", "I5"),
        ]);

        let ids: Vec<_> = hierarchy.dimensions().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["D1", "D2"]);

        let o1 = hierarchy.outcome("O1").unwrap();
        let codes: Vec<_> = o1.indicator_codes().collect();
        assert_eq!(codes, vec!["I1", "I2", "I5"]);

        let d1 = hierarchy.dimension("D1").unwrap();
        assert_eq!(d1.outcomes().count(), 2);
        assert_eq!(d1.indicators().count(), 4);
        assert_eq!(hierarchy.indicator_count(), 5);
    }

    #[test]
    fn test_rows_without_outcome_or_code_are_dropped() {
        let mut no_outcome = row("D1", "S1", "SS1", "O1", "I9");
        no_outcome.outcome_id = None;
        let mut blank_outcome = row("D1", "S1", "SS1", "O1", "I8");
        blank_outcome.outcome_id = Some("  ".to_string());

        let hierarchy = Hierarchy::from_rows(vec![
            no_outcome,
            blank_outcome,
            row("D1", "S1", "SS1", "O1", ""),
            row("D1", "S1", "SS1", "O1", "I1"),
        ]);

        assert_eq!(hierarchy.indicator_count(), 1);
        assert!(hierarchy.indicator("I9").is_none());
        assert!(hierarchy.indicator("I8").is_none());
    }

    #[test]
    fn test_duplicate_code_keeps_first() {
        let hierarchy = Hierarchy::from_rows(vec![
            row("D1", "S1", "SS1", "O1", "I1"),
            row("D1", "S1", "SS1", "O2", "I1"),
        ]);

        assert_eq!(hierarchy.indicator("I1").unwrap().outcome_id, "O1");
        assert!(hierarchy.outcome("O2").is_none());
    }

    #[test]
    fn test_lookups_and_back_references() {
        let hierarchy = Hierarchy::from_rows(vec![row("D1", "S1", "SS1", "O1", "I1")]);

        let indicator = hierarchy.indicator("I1").unwrap();
        assert_eq!(indicator.outcome_id, "O1");
        assert_eq!(indicator.substrand_id, "SS1");
        assert_eq!(indicator.strand_id, "S1");
        assert_eq!(hierarchy.substrand("SS1").unwrap().outcomes.len(), 1);
        assert!(hierarchy.dimension("missing").is_none());
    }

    #[test]
    fn test_blank_group_ids_become_unknown() {
        let hierarchy = Hierarchy::from_rows(vec![row("", " ", "", "O1", "I1")]);
        let dimension = hierarchy.dimension(UNKNOWN_GROUP).unwrap();
        assert_eq!(dimension.strands[0].id, UNKNOWN_GROUP);
        assert_eq!(dimension.title, UNKNOWN_GROUP);
    }

    #[test]
    fn test_load_json_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hierarchy.json");
        std::fs::write(
            &path,
            r#"[
                {"dimension_id": "D1", "dimension_title": "Leadership", "strand_id": "S1",
                 "substrand_id": "SS1", "outcome_id": "O1", "indicator_code": "I1",
                 "indicator_text": "Vision is shared"},
                {"dimension_id": "D1", "strand_id": "S1", "substrand_id": "SS1",
                 "indicator_code": "HEADER"}
            ]"#,
        )
        .unwrap();

        let hierarchy = Hierarchy::load_json(&path).unwrap();
        assert_eq!(hierarchy.dimension("D1").unwrap().title, "Leadership");
        assert_eq!(hierarchy.indicator_count(), 1);
    }

    #[test]
    fn test_load_json_errors() {
        let missing = Hierarchy::load_json(Path::new("/nonexistent/hierarchy.json"));
        assert!(matches!(missing, Err(HierarchyError::Io { .. })));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Hierarchy::load_json(&path), Err(HierarchyError::Parse { .. })));
    }
}
