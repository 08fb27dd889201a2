//! Axum route handlers for matching and export.

use axum::{
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
    Json,
};
use tracing::info;

use crate::documents::Document;
use crate::errors::AppError;
use crate::export::{export_xlsx, XLSX_CONTENT_TYPE, XLSX_FILENAME};
use crate::llm_client::ModelChoice;
use crate::matching::models::PipelineResult;
use crate::matching::pipeline::{run_pipeline, MatchRequest};
use crate::state::AppState;

const JD_FIELD: &str = "jd";
const CVS_FIELD: &str = "cvs";
const MODEL_FIELD: &str = "model";

/// Fields collected from the upload form.
#[derive(Debug, Default)]
struct UploadForm {
    jd: Option<Document>,
    cvs: Vec<Document>,
    model: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;

        match (name.as_str(), filename) {
            // Browsers send an empty part when no file was chosen.
            (JD_FIELD | CVS_FIELD, Some(filename)) if filename.is_empty() => {}
            (JD_FIELD, Some(filename)) => form.jd = Some(Document::new(filename, data)),
            (CVS_FIELD, Some(filename)) => form.cvs.push(Document::new(filename, data)),
            (MODEL_FIELD, None) => {
                form.model = Some(String::from_utf8_lossy(&data).trim().to_string());
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /process
///
/// Multipart upload: one `jd` file, 1..=MAX_CVS `cvs` files, optional `model`.
/// Returns competencies, per-candidate results and the heatmap.
pub async fn handle_process(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PipelineResult>, AppError> {
    let form = read_form(multipart).await?;

    let job_description = form
        .jd
        .ok_or_else(|| AppError::Validation("Missing JD file (field name 'jd')".to_string()))?;
    let model = ModelChoice::resolve(form.model.as_deref(), state.config.default_model);

    info!(
        "Matching {} CVs against '{}' with {model}",
        form.cvs.len(),
        job_description.filename
    );

    let request = MatchRequest {
        job_description,
        cvs: form.cvs,
        model,
    };
    let result = run_pipeline(request, state.config.limits, state.llm.as_ref()).await?;

    Ok(Json(result))
}

/// POST /export
///
/// Takes a `PipelineResult` (as returned by /process) and returns an .xlsx workbook.
pub async fn handle_export(
    Json(result): Json<PipelineResult>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = export_xlsx(&result)?;
    info!(
        "Exported {} results and {} competencies ({} bytes)",
        result.results.len(),
        result.competencies.len(),
        bytes.len()
    );

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{XLSX_FILENAME}\""),
            ),
        ],
        bytes,
    ))
}
