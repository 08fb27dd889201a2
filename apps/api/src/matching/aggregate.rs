//! Result aggregation: merges both stages into a `PipelineResult`.
//!
//! Results and heatmap pass through unchanged. `reconcile` compares them with the
//! uploaded candidates (by stable id, joined on display name) so mismatches are
//! logged instead of silently dropped.

use std::collections::{HashMap, HashSet};

use tracing::warn;
use uuid::Uuid;

use crate::matching::error::PipelineError;
use crate::matching::models::{Candidate, CandidateResult, Competency, Heatmap, PipelineResult};
use crate::matching::scoring::ScoringOutput;

/// Reported and rubric-derived scores may differ by rounding alone.
const SCORE_TOLERANCE: u8 = 1;

pub fn require_competencies(competencies: &[Competency]) -> Result<(), PipelineError> {
    if competencies.is_empty() {
        return Err(PipelineError::EmptyCompetencyList);
    }
    Ok(())
}

/// A reported `weighted_match_pct` that disagrees with the heatmap labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreDrift {
    pub name: String,
    pub reported: u8,
    pub rubric: u8,
}

/// Differences between what was uploaded and what the model returned.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Candidates with no result carrying their name.
    pub missing: Vec<Uuid>,
    /// Result names that match no uploaded candidate.
    pub unexpected: Vec<String>,
    /// Display names shared by more than one candidate.
    pub duplicate_names: Vec<String>,
    pub score_drift: Vec<ScoreDrift>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty()
            && self.unexpected.is_empty()
            && self.duplicate_names.is_empty()
            && self.score_drift.is_empty()
    }
}

pub fn reconcile(
    competencies: &[Competency],
    candidates: &[Candidate],
    results: &[CandidateResult],
    heatmap: &Heatmap,
) -> Reconciliation {
    let mut by_name: HashMap<&str, Vec<Uuid>> = HashMap::new();
    for candidate in candidates {
        by_name.entry(candidate.name.as_str()).or_default().push(candidate.id);
    }

    let result_names: HashSet<&str> = results.iter().map(|r| r.name.as_str()).collect();

    let missing = candidates
        .iter()
        .filter(|c| !result_names.contains(c.name.as_str()))
        .map(|c| c.id)
        .collect();

    let unexpected = results
        .iter()
        .filter(|r| !by_name.contains_key(r.name.as_str()))
        .map(|r| r.name.clone())
        .collect();

    let mut seen = HashSet::new();
    let duplicate_names = candidates
        .iter()
        .filter(|c| by_name[c.name.as_str()].len() > 1 && seen.insert(c.name.as_str()))
        .map(|c| c.name.clone())
        .collect();

    let score_drift = results
        .iter()
        .filter_map(|r| {
            let rubric = rubric_score(competencies, heatmap, &r.name)?;
            (r.weighted_match_pct.abs_diff(rubric) > SCORE_TOLERANCE).then(|| ScoreDrift {
                name: r.name.clone(),
                reported: r.weighted_match_pct,
                rubric,
            })
        })
        .collect();

    Reconciliation {
        missing,
        unexpected,
        duplicate_names,
        score_drift,
    }
}

/// Weighted score implied by the heatmap (Full=100, Partial=50, Gap=0).
/// `None` unless every competency has a label for this candidate.
pub fn rubric_score(competencies: &[Competency], heatmap: &Heatmap, candidate: &str) -> Option<u8> {
    // u64 so model-supplied weights up to u32::MAX cannot overflow.
    let total_weight: u64 = competencies.iter().map(|c| u64::from(c.weight)).sum();
    if total_weight == 0 {
        return None;
    }
    let mut weighted = 0u64;
    for competency in competencies {
        let label = heatmap.label(&competency.name, candidate)?;
        weighted += u64::from(competency.weight) * u64::from(label.points());
    }
    let score = (weighted as f64 / total_weight as f64).round();
    Some(score.clamp(0.0, 100.0) as u8)
}

/// Builds the final result. Fails only when there are no competencies.
pub fn aggregate(
    competencies: Vec<Competency>,
    candidates: &[Candidate],
    scoring: ScoringOutput,
) -> Result<PipelineResult, PipelineError> {
    require_competencies(&competencies)?;

    let report = reconcile(&competencies, candidates, &scoring.results, &scoring.heatmap);
    if !report.is_clean() {
        log_reconciliation(candidates, &report);
    }

    Ok(PipelineResult {
        competencies,
        results: scoring.results,
        heatmap: scoring.heatmap,
    })
}

fn log_reconciliation(candidates: &[Candidate], report: &Reconciliation) {
    for id in &report.missing {
        let name = candidates
            .iter()
            .find(|c| c.id == *id)
            .map(|c| c.name.as_str())
            .unwrap_or_default();
        warn!("No score returned for candidate '{name}' ({id})");
    }
    for name in &report.unexpected {
        warn!("Model returned a result for unknown candidate '{name}'");
    }
    for name in &report.duplicate_names {
        warn!("Several CVs share the name '{name}'; their results and heatmap columns will collide");
    }
    for drift in &report.score_drift {
        warn!(
            "weighted_match_pct for '{}' is {} but heatmap labels give {}",
            drift.name, drift.reported, drift.rubric
        );
    }
}
