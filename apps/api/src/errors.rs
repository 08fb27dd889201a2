use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::export::ExportError;
use crate::matching::error::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Status, machine-readable code, and model output worth echoing back (if any).
    fn parts(&self) -> (StatusCode, &'static str, Option<&Value>) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None),
            AppError::Pipeline(e) => match e {
                PipelineError::NoCandidates | PipelineError::TooManyCandidates { .. } => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", None)
                }
                PipelineError::CompetencyExtractionFailed(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "COMPETENCY_EXTRACTION_FAILED",
                    None,
                ),
                PipelineError::InvalidCompetencySchema { raw, .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INVALID_COMPETENCY_SCHEMA",
                    Some(raw),
                ),
                PipelineError::EmptyCompetencyList => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EMPTY_COMPETENCY_LIST",
                    None,
                ),
                PipelineError::ScoringFailed(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "SCORING_FAILED", None)
                }
                PipelineError::InvalidScoringSchema { raw, .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INVALID_SCORING_SCHEMA",
                    Some(raw),
                ),
                PipelineError::ExtractionTask(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None)
                }
            },
            AppError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXPORT_ERROR", None),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", None),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, raw) = self.parts();

        let message = match &self {
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
            AppError::Validation(msg) => msg.clone(),
            other => {
                // Model diagnostics are returned to the caller so failures can be inspected.
                if status.is_server_error() {
                    tracing::error!("{code}: {other}");
                }
                other.to_string()
            }
        };

        let mut error = json!({
            "code": code,
            "message": message
        });
        if let Some(raw) = raw {
            error["raw"] = raw.clone();
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::error::StageError;
    use crate::matching::json_extract::extract_json;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_no_candidates_is_bad_request() {
        let response = AppError::from(PipelineError::NoCandidates).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "Upload at least 1 CV");
    }

    #[tokio::test]
    async fn test_malformed_output_surfaces_raw_text() {
        let malformed = extract_json("no json here").unwrap_err();
        let err = PipelineError::ScoringFailed(StageError::MalformedModelOutput(malformed));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "SCORING_FAILED");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("no json here"));
    }

    #[tokio::test]
    async fn test_prompt_render_failure_is_scoring_failure() {
        let render_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PipelineError::ScoringFailed(StageError::Prompt(render_err));
        let response = AppError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "SCORING_FAILED");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("could not render prompt"));
    }

    #[tokio::test]
    async fn test_schema_error_echoes_raw_object() {
        let err = PipelineError::InvalidCompetencySchema {
            reason: "missing key".to_string(),
            raw: json!({"skills": ["Go"]}),
        };
        let body = body_json(AppError::from(err).into_response()).await;
        assert_eq!(body["error"]["code"], "INVALID_COMPETENCY_SCHEMA");
        assert_eq!(body["error"]["raw"], json!({"skills": ["Go"]}));
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "An internal server error occurred");
    }
}
