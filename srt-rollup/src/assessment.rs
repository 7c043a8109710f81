//! Assessment facade
//!
//! Ties the hierarchy, the two value layers and the sync coordinator
//! together and exposes the operations rendering components call. Every
//! read recomputes from current state; nothing derived is cached.

use crate::aggregate::{
    self, completion, dimension_score, grade_distribution, indicator_stats, outcome_tier,
    simple_dimension_score, simple_outcome_grade, simple_strand_score, simple_substrand_score,
    strengths_and_needs, substrand_distribution, CompletionRate, DimensionScore, Grade,
    GradeDistribution, IndicatorStats, OutcomeGrade, OutcomeTier, OutcomeTierResult,
    OverallScore, ScoringPath, SimpleDimensionScore, StrengthsAndNeeds, TierDistribution,
};
use crate::collect::{collect_data_points, ReadModel};
use crate::hierarchy::{Dimension, Hierarchy, Outcome};
use crate::locks::{lock, read, write};
use crate::model::{ColumnKey, DataPoint};
use crate::normalize::{NormalizedValue, RawValue};
use crate::pending::{Clock, PendingComment, PendingEdit, PendingEditStore, SystemClock};
use crate::remote::RemoteScores;
use crate::resolve::{resolve_indicator, IndicatorResolution, IndicatorVerdict};
use crate::store::ScoreStore;
use crate::sync::{FlushError, FlushReport, MaintenanceError, SyncCoordinator, SyncState};
use serde::Serialize;
use srt_common::{EventBus, SrtEvent};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionReport {
    pub dimension_id: String,
    pub title: String,
    pub score: DimensionScore,
    pub completion: CompletionRate,
    pub stats: IndicatorStats,
    pub strengths_and_needs: StrengthsAndNeeds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrandScore {
    pub strand_id: String,
    pub title: String,
    /// None when no substrand has data
    pub percentage: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleDimensionReport {
    pub dimension_id: String,
    pub title: String,
    pub score: SimpleDimensionScore,
    pub strands: Vec<StrandScore>,
    pub outcome_grades: GradeDistribution,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionSummary {
    pub dimension_id: String,
    pub title: String,
    pub percentage: u32,
    pub grade: Grade,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallReport {
    pub path: ScoringPath,
    pub overall: OverallScore,
    pub dimensions: Vec<DimensionSummary>,
}

/// Effective comment for an indicator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorComment {
    pub indicator_code: String,
    /// Empty when there is none
    pub comment: String,
    /// True when the text comes from a staged, unflushed comment
    pub pending: bool,
}

/// Outcome result on the path the caller asked for
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "path", rename_all = "lowercase")]
pub enum OutcomeView {
    Tiered(OutcomeTierResult),
    Simple(OutcomeGrade),
}

pub struct Assessment {
    hierarchy: Arc<Hierarchy>,
    pending: Arc<RwLock<PendingEditStore>>,
    remote: Arc<RwLock<RemoteScores>>,
    sync: SyncCoordinator,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
    snapshot_path: Mutex<Option<PathBuf>>,
}

impl Assessment {
    pub fn new(
        hierarchy: Hierarchy,
        store: Arc<dyn ScoreStore>,
        school_id: impl Into<String>,
        events: Arc<EventBus>,
    ) -> Self {
        Self::with_clock(hierarchy, store, school_id, events, Arc::new(SystemClock))
    }

    pub fn with_clock(
        hierarchy: Hierarchy,
        store: Arc<dyn ScoreStore>,
        school_id: impl Into<String>,
        events: Arc<EventBus>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let pending = Arc::new(RwLock::new(PendingEditStore::with_clock(clock.clone())));
        let remote = Arc::new(RwLock::new(RemoteScores::default()));
        let sync = SyncCoordinator::new(
            school_id,
            store,
            pending.clone(),
            remote.clone(),
            events.clone(),
            clock.clone(),
        );

        Self {
            hierarchy: Arc::new(hierarchy),
            pending,
            remote,
            sync,
            events,
            clock,
            snapshot_path: Mutex::new(None),
        }
    }

    /// Restore pending edits from `path` and snapshot them there after
    /// every change
    ///
    /// An unreadable snapshot is moved aside to `<path>.corrupt` and the
    /// store starts empty.
    pub fn with_pending_snapshot(self, path: PathBuf) -> Self {
        match PendingEditStore::load_from_file(&path, self.clock.clone()) {
            Ok(restored) => {
                if !restored.is_empty() {
                    info!(path = %path.display(), edits = restored.len(), "Restored pending edits");
                }
                *write(&self.pending) = restored;
            }
            Err(e) => {
                let aside = path.with_extension("json.corrupt");
                warn!(
                    path = %path.display(),
                    moved_to = %aside.display(),
                    error = %e,
                    "Pending edit snapshot unreadable, starting empty"
                );
                if let Err(e) = std::fs::rename(&path, &aside) {
                    warn!(error = %e, "Could not move unreadable snapshot aside");
                }
            }
        }
        *lock(&self.snapshot_path) = Some(path);
        self
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    pub fn school_id(&self) -> &str {
        self.sync.school_id()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Data points for an indicator, pending values layered over confirmed
    pub fn data_points(&self, indicator_code: &str) -> Vec<DataPoint> {
        let pending = read(&self.pending);
        let remote = read(&self.remote);
        collect_data_points(&ReadModel::new(&pending, &remote), indicator_code)
    }

    /// Resolve an indicator by code
    ///
    /// Codes outside the hierarchy still resolve from whatever values exist.
    pub fn resolve_indicator(&self, indicator_code: &str) -> IndicatorResolution {
        resolve_indicator(&self.data_points(indicator_code))
    }

    /// Tier of an outcome; None for an unknown outcome id
    pub fn outcome_tier(&self, outcome_id: &str) -> Option<OutcomeTierResult> {
        let outcome = self.hierarchy.outcome(outcome_id)?;
        Some(self.with_view(|view| outcome_tier(&view.verdicts(outcome))))
    }

    /// Simple-path grade of an outcome; None for an unknown outcome id
    pub fn simple_outcome_grade(&self, outcome_id: &str) -> Option<OutcomeGrade> {
        let outcome = self.hierarchy.outcome(outcome_id)?;
        Some(self.with_view(|view| simple_outcome_grade(&view.verdicts(outcome))))
    }

    pub fn outcome_view(&self, outcome_id: &str, path: ScoringPath) -> Option<OutcomeView> {
        match path {
            ScoringPath::Tiered => self.outcome_tier(outcome_id).map(OutcomeView::Tiered),
            ScoringPath::Simple => self.simple_outcome_grade(outcome_id).map(OutcomeView::Simple),
        }
    }

    pub fn substrand_distribution(&self, substrand_id: &str) -> Option<TierDistribution> {
        let substrand = self.hierarchy.substrand(substrand_id)?;
        let tiers: Vec<_> =
            self.with_view(|view| substrand.outcomes.iter().map(|o| view.tier(o)).collect());
        Some(substrand_distribution(&tiers))
    }

    pub fn dimension_score(&self, dimension_id: &str) -> Option<DimensionScore> {
        let dimension = self.hierarchy.dimension(dimension_id)?;
        Some(self.with_view(|view| view.dimension_score(dimension)))
    }

    /// Tiered dimension score with completion, value counts and the
    /// strongest and weakest outcomes
    pub fn dimension_report(&self, dimension_id: &str) -> Option<DimensionReport> {
        let dimension = self.hierarchy.dimension(dimension_id)?;

        let (tiers, resolutions) = self.with_view(|view| {
            let tiers: Vec<(&str, Option<OutcomeTier>)> = dimension
                .outcomes()
                .map(|o| (o.id.as_str(), view.tier(o)))
                .collect();
            let resolutions: Vec<IndicatorResolution> = dimension
                .indicators()
                .map(|i| view.resolve(&i.code))
                .collect();
            (tiers, resolutions)
        });
        let score = dimension_score(&tiers.iter().map(|(_, t)| *t).collect::<Vec<_>>());
        let reviewed: Vec<bool> = resolutions.iter().map(IndicatorResolution::reviewed).collect();
        let values: Vec<NormalizedValue> = resolutions.iter().map(summary_value).collect();

        Some(DimensionReport {
            dimension_id: dimension.id.clone(),
            title: dimension.title.clone(),
            score,
            completion: completion(&reviewed),
            stats: indicator_stats(&values),
            strengths_and_needs: strengths_and_needs(tiers),
        })
    }

    /// Value counts for an arbitrary set of indicators
    pub fn indicator_stats(&self, codes: &[&str]) -> IndicatorStats {
        let values: Vec<NormalizedValue> = self.with_view(|view| {
            codes
                .iter()
                .map(|code| summary_value(&view.resolve(code)))
                .collect()
        });
        indicator_stats(&values)
    }

    /// Simple-path roll-up: outcome → substrand → strand → dimension
    pub fn simple_dimension(&self, dimension_id: &str) -> Option<SimpleDimensionReport> {
        let dimension = self.hierarchy.dimension(dimension_id)?;
        Some(self.with_view(|view| view.simple_dimension(dimension)))
    }

    /// Overall score across every dimension on the chosen path
    pub fn overall(&self, path: ScoringPath) -> OverallReport {
        let dimensions: Vec<DimensionSummary> = self.with_view(|view| {
            self.hierarchy
                .dimensions()
                .iter()
                .map(|d| {
                    let (percentage, grade) = match path {
                        ScoringPath::Tiered => {
                            let s = view.dimension_score(d);
                            (s.percentage, s.grade)
                        }
                        ScoringPath::Simple => {
                            let s = view.simple_dimension(d).score;
                            (s.percentage, s.grade)
                        }
                    };
                    DimensionSummary {
                        dimension_id: d.id.clone(),
                        title: d.title.clone(),
                        percentage,
                        grade,
                    }
                })
                .collect()
        });

        let percentages: Vec<u32> = dimensions.iter().map(|d| d.percentage).collect();
        OverallReport {
            path,
            overall: aggregate::overall_score(&percentages),
            dimensions,
        }
    }

    /// Stage a local edit; it shadows the confirmed value until flushed
    pub fn stage(
        &self,
        indicator_code: &str,
        column: ColumnKey,
        value: RawValue,
        source_tag: &str,
    ) -> PendingEdit {
        let (edit, pending_for_source) = {
            let mut pending = write(&self.pending);
            let edit = pending.stage(indicator_code, column, value, source_tag).clone();
            (edit, pending.count_for_source(source_tag))
        };

        self.events.emit_lossy(SrtEvent::EditStaged {
            indicator_code: edit.indicator_code.clone(),
            column_key: edit.column.to_string(),
            source_tag: edit.source_tag.clone(),
            pending_for_source,
            timestamp: edit.timestamp,
        });
        self.persist_pending();
        edit
    }

    /// Stage a comment; it shadows the confirmed one until the next flush
    ///
    /// Blank text stages a removal.
    pub fn stage_comment(&self, indicator_code: &str, comment: &str) -> PendingComment {
        let (staged, pending_comments) = {
            let mut pending = write(&self.pending);
            let staged = pending.stage_comment(indicator_code, comment).clone();
            (staged, pending.comment_count())
        };

        self.events.emit_lossy(SrtEvent::CommentStaged {
            indicator_code: staged.indicator_code.clone(),
            pending_comments,
            timestamp: staged.timestamp,
        });
        self.persist_pending();
        staged
    }

    /// Pending comment if one is staged, otherwise the confirmed one
    pub fn comment(&self, indicator_code: &str) -> IndicatorComment {
        let pending = read(&self.pending);
        let (comment, is_pending) = match pending.get_comment(indicator_code) {
            Some(staged) => (staged.comment.clone(), true),
            None => (
                read(&self.remote)
                    .comment(indicator_code)
                    .unwrap_or_default()
                    .to_string(),
                false,
            ),
        };
        IndicatorComment {
            indicator_code: indicator_code.to_string(),
            comment,
            pending: is_pending,
        }
    }

    pub fn pending_comments(&self) -> Vec<PendingComment> {
        read(&self.pending).comment_entries()
    }

    pub fn pending_count(&self, source_tag: &str) -> usize {
        read(&self.pending).count_for_source(source_tag)
    }

    pub fn pending_entries(&self, source_tag: &str) -> Vec<PendingEdit> {
        read(&self.pending).entries_for_source(source_tag)
    }

    /// Abandon every unsaved edit for a source
    pub fn discard_all(&self, source_tag: &str) -> usize {
        let discarded = write(&self.pending).discard_all(source_tag);
        if discarded > 0 {
            info!(source_tag, discarded, "Discarded pending edits");
            self.events.emit_lossy(SrtEvent::EditsDiscarded {
                source_tag: source_tag.to_string(),
                discarded,
                timestamp: self.clock.now(),
            });
            self.persist_pending();
        }
        discarded
    }

    pub async fn flush(&self, source_tag: &str) -> Result<FlushReport, FlushError> {
        let report = self.sync.flush(source_tag).await?;
        if report.count > 0 || report.comments > 0 {
            self.persist_pending();
        }
        Ok(report)
    }

    pub async fn refresh(&self) -> Result<usize, MaintenanceError> {
        self.sync.refresh().await
    }

    pub async fn reset(&self) -> Result<u64, MaintenanceError> {
        let deleted = self.sync.reset().await?;
        self.persist_pending();
        Ok(deleted)
    }

    pub fn set_online(&self, online: bool) -> bool {
        self.sync.set_online(online)
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.sync_state()
    }

    pub fn is_syncing(&self, source_tag: &str) -> bool {
        self.sync.is_syncing(source_tag)
    }

    fn persist_pending(&self) {
        let path = lock(&self.snapshot_path);
        if let Some(path) = path.as_ref() {
            if let Err(e) = read(&self.pending).save_to_file(path) {
                warn!(path = %path.display(), error = %e, "Failed to snapshot pending edits");
            }
        }
    }

    /// Run a multi-indicator read against one consistent state of both
    /// value layers
    fn with_view<R>(&self, f: impl FnOnce(&View<'_>) -> R) -> R {
        let pending = read(&self.pending);
        let remote = read(&self.remote);
        f(&View {
            model: ReadModel::new(&pending, &remote),
        })
    }
}

struct View<'a> {
    model: ReadModel<'a>,
}

impl View<'_> {
    fn resolve(&self, code: &str) -> IndicatorResolution {
        resolve_indicator(&collect_data_points(&self.model, code))
    }

    fn verdicts(&self, outcome: &Outcome) -> Vec<IndicatorVerdict> {
        outcome
            .indicator_codes()
            .map(|code| self.resolve(code).verdict)
            .collect()
    }

    fn tier(&self, outcome: &Outcome) -> Option<OutcomeTier> {
        outcome_tier(&self.verdicts(outcome)).tier
    }

    fn dimension_score(&self, dimension: &Dimension) -> DimensionScore {
        let tiers: Vec<_> = dimension.outcomes().map(|o| self.tier(o)).collect();
        dimension_score(&tiers)
    }

    fn simple_dimension(&self, dimension: &Dimension) -> SimpleDimensionReport {
        let mut all_grades = Vec::new();
        let strands: Vec<StrandScore> = dimension
            .strands
            .iter()
            .map(|strand| {
                let substrand_scores: Vec<Option<u32>> = strand
                    .substrands
                    .iter()
                    .map(|substrand| {
                        let grades: Vec<OutcomeGrade> = substrand
                            .outcomes
                            .iter()
                            .map(|o| simple_outcome_grade(&self.verdicts(o)))
                            .collect();
                        let score = simple_substrand_score(&grades);
                        all_grades.extend(grades);
                        score
                    })
                    .collect();
                StrandScore {
                    strand_id: strand.id.clone(),
                    title: strand.title.clone(),
                    percentage: simple_strand_score(&substrand_scores),
                }
            })
            .collect();

        let strand_scores: Vec<Option<u32>> = strands.iter().map(|s| s.percentage).collect();
        SimpleDimensionReport {
            dimension_id: dimension.id.clone(),
            title: dimension.title.clone(),
            score: simple_dimension_score(&strand_scores),
            strands,
            outcome_grades: grade_distribution(&all_grades),
        }
    }
}

/// One value per indicator for the summary counts
///
/// Reviewed but unrated (only NotApplicable points) counts as "nr".
fn summary_value(resolution: &IndicatorResolution) -> NormalizedValue {
    match resolution.verdict {
        IndicatorVerdict::Achieved => NormalizedValue::Achieved,
        IndicatorVerdict::NotAchieved => NormalizedValue::NotAchieved,
        IndicatorVerdict::NotRated if resolution.reviewed() => NormalizedValue::NotApplicable,
        IndicatorVerdict::NotRated => NormalizedValue::Unset,
    }
}
