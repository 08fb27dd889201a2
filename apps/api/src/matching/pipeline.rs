//! Matching pipeline: the full run behind `POST /process`.
//!
//! Flow: validate upload count → extract text (JD + every CV) → competencies →
//!       scoring → aggregate. The two LLM calls are sequential; nothing is shared
//!       between runs except the gateway.

use tracing::info;

use crate::config::PipelineLimits;
use crate::documents::{candidate_name, extract_text, Document, ExtractedText};
use crate::llm_client::{LlmGateway, ModelChoice};
use crate::matching::aggregate::{aggregate, require_competencies};
use crate::matching::competencies::extract_competencies;
use crate::matching::error::PipelineError;
use crate::matching::models::{Candidate, PipelineResult};
use crate::matching::scoring::score_candidates;

/// One job description and its candidate CVs, in upload order.
#[derive(Debug, Clone)]
pub struct MatchRequest {
    pub job_description: Document,
    pub cvs: Vec<Document>,
    pub model: ModelChoice,
}

/// Rejects empty or oversized batches before any extraction or LLM call.
pub fn check_cv_count(count: usize, max: usize) -> Result<(), PipelineError> {
    if count == 0 {
        return Err(PipelineError::NoCandidates);
    }
    if count > max {
        return Err(PipelineError::TooManyCandidates { max, got: count });
    }
    Ok(())
}

pub async fn run_pipeline(
    request: MatchRequest,
    limits: PipelineLimits,
    llm: &dyn LlmGateway,
) -> Result<PipelineResult, PipelineError> {
    check_cv_count(request.cvs.len(), limits.max_cvs)?;

    let model = request.model;
    let (jd_text, candidates) = extract_all(request, limits.max_prompt_chars).await?;
    info!(
        "Extracted JD ({} chars) and {} CVs",
        jd_text.char_count(),
        candidates.len()
    );

    let competencies =
        extract_competencies(jd_text.as_str(), model, llm, limits.strict_competencies).await?;
    require_competencies(&competencies)?;

    let scoring =
        score_candidates(jd_text.as_str(), &competencies, &candidates, model, llm).await?;

    aggregate(competencies, &candidates, scoring)
}

/// Document parsing is blocking work, so it runs off the async executor.
async fn extract_all(
    request: MatchRequest,
    max_chars: usize,
) -> Result<(ExtractedText, Vec<Candidate>), PipelineError> {
    tokio::task::spawn_blocking(move || {
        let jd_text = extract_text(&request.job_description, max_chars);
        let candidates = request
            .cvs
            .iter()
            .map(|cv| Candidate::new(candidate_name(&cv.filename), extract_text(cv, max_chars)))
            .collect();
        (jd_text, candidates)
    })
    .await
    .map_err(|e| PipelineError::ExtractionTask(e.to_string()))
}
