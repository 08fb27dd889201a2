use serde_json::Value;
use thiserror::Error;

use crate::llm_client::LlmError;
use crate::matching::json_extract::MalformedModelOutput;

/// Why a single LLM stage could not produce a JSON object.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("gateway error: {0}")]
    Gateway(#[from] LlmError),

    #[error(transparent)]
    MalformedModelOutput(#[from] MalformedModelOutput),

    #[error("could not render prompt: {0}")]
    Prompt(#[from] serde_json::Error),
}

/// Every way a matching run can fail. Degraded document extraction is not here;
/// it is recovered as empty text before the pipeline sees it.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Upload at least 1 CV")]
    NoCandidates,

    #[error("Max {max} CVs allowed (got {got})")]
    TooManyCandidates { max: usize, got: usize },

    #[error("Competency extraction failed: {0}")]
    CompetencyExtractionFailed(#[source] StageError),

    #[error("Invalid competencies JSON returned by model: {reason}")]
    InvalidCompetencySchema { reason: String, raw: Value },

    #[error("Model returned no competencies")]
    EmptyCompetencyList,

    #[error("Scoring failed: {0}")]
    ScoringFailed(#[source] StageError),

    #[error("Invalid scoring JSON returned by model: {reason}")]
    InvalidScoringSchema { reason: String, raw: Value },

    #[error("Text extraction task failed: {0}")]
    ExtractionTask(String),
}
