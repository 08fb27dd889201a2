//! Competency extraction: JD text in, weighted competency list out.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm_client::{LlmGateway, ModelChoice};
use crate::matching::error::{PipelineError, StageError};
use crate::matching::json_extract::extract_json;
use crate::matching::models::Competency;
use crate::matching::prompts::build_competency_prompt;

pub const COMPETENCY_MAX_TOKENS: u32 = 800;
pub const MIN_COMPETENCIES: usize = 5;
pub const MAX_COMPETENCIES: usize = 12;
pub const TOTAL_WEIGHT: u32 = 100;

/// Shape the model is asked to return.
#[derive(Debug, Deserialize)]
pub struct CompetencyResponse {
    pub competencies: Vec<Competency>,
}

impl CompetencyResponse {
    /// Validating constructor: `competencies` must exist, be a list, and deserialize.
    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        if !value.get("competencies").is_some_and(Value::is_array) {
            return Err(PipelineError::InvalidCompetencySchema {
                reason: "expected an object with a list-valued 'competencies' key".to_string(),
                raw: value,
            });
        }
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(response) => Ok(response),
            Err(e) => Err(PipelineError::InvalidCompetencySchema {
                reason: e.to_string(),
                raw: value,
            }),
        }
    }
}

/// Rule violations in a parsed list. An empty list is not reported here;
/// the aggregator rejects it separately.
pub fn validate_competencies(competencies: &[Competency]) -> Vec<String> {
    let mut problems = Vec::new();
    if competencies.is_empty() {
        return problems;
    }

    let count = competencies.len();
    if !(MIN_COMPETENCIES..=MAX_COMPETENCIES).contains(&count) {
        problems.push(format!(
            "expected {MIN_COMPETENCIES}-{MAX_COMPETENCIES} competencies, got {count}"
        ));
    }

    let oversized = competencies
        .iter()
        .filter(|c| c.weight > TOTAL_WEIGHT)
        .count();
    if oversized > 0 {
        problems.push(format!(
            "{oversized} competencies weigh more than {TOTAL_WEIGHT}"
        ));
    }

    // Summed as u64: weights come straight from the model.
    let total: u64 = competencies.iter().map(|c| u64::from(c.weight)).sum();
    if total != u64::from(TOTAL_WEIGHT) {
        problems.push(format!("weights sum to {total}, expected {TOTAL_WEIGHT}"));
    }

    let unnamed = competencies
        .iter()
        .filter(|c| c.name.trim().is_empty())
        .count();
    if unnamed > 0 {
        problems.push(format!("{unnamed} competencies have an empty name"));
    }

    problems
}

/// Runs the competency stage. With `strict`, a list breaking the count/weight
/// rules is an `InvalidCompetencySchema` error; otherwise it is logged and kept.
pub async fn extract_competencies(
    jd_text: &str,
    model: ModelChoice,
    llm: &dyn LlmGateway,
    strict: bool,
) -> Result<Vec<Competency>, PipelineError> {
    info!("Extracting competencies from JD ({} chars) with {model}", jd_text.len());

    let prompt = build_competency_prompt(jd_text);
    let content = llm
        .chat(model, &prompt.messages(), COMPETENCY_MAX_TOKENS)
        .await
        .map_err(|e| PipelineError::CompetencyExtractionFailed(StageError::Gateway(e)))?;
    debug!("Competency stage returned {} chars", content.len());

    let value = extract_json(&content)
        .map_err(|e| PipelineError::CompetencyExtractionFailed(StageError::MalformedModelOutput(e)))?;
    let response = CompetencyResponse::from_value(value)?;

    let problems = validate_competencies(&response.competencies);
    if !problems.is_empty() {
        let reason = problems.join("; ");
        if strict {
            return Err(PipelineError::InvalidCompetencySchema {
                reason,
                raw: serde_json::to_value(&response.competencies).unwrap_or_default(),
            });
        }
        warn!("Competency list breaks model instructions: {reason}");
    }

    info!("Extracted {} competencies", response.competencies.len());
    Ok(response.competencies)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm_client::testing::MockGateway;
    use crate::llm_client::LlmError;
    use serde_json::json;

    /// Five competencies weighted 30/25/20/15/10.
    pub(crate) fn backend_competencies_json() -> Value {
        json!({
            "competencies": [
                {"name": "Go", "description": "Production Go services", "weight": 30},
                {"name": "Postgres", "description": "Schema design and migrations", "weight": 25},
                {"name": "APIs", "description": "REST/gRPC API design", "weight": 20},
                {"name": "Testing", "description": "Automated testing discipline", "weight": 15},
                {"name": "Communication", "description": "Clear written communication", "weight": 10}
            ]
        })
    }

    fn comps(weights: &[u32]) -> Vec<Competency> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| Competency {
                name: format!("C{i}"),
                description: String::new(),
                weight: *w,
            })
            .collect()
    }

    #[test]
    fn test_from_value_accepts_valid_shape() {
        let response = CompetencyResponse::from_value(backend_competencies_json()).unwrap();
        assert_eq!(response.competencies.len(), 5);
        assert_eq!(response.competencies[1].name, "Postgres");
    }

    #[test]
    fn test_from_value_rejects_missing_key() {
        let err = CompetencyResponse::from_value(json!({"skills": []})).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidCompetencySchema { .. }));
    }

    #[test]
    fn test_from_value_rejects_non_list() {
        let err = CompetencyResponse::from_value(json!({"competencies": "Go"})).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidCompetencySchema { .. }));
    }

    #[test]
    fn test_from_value_rejects_bad_entry() {
        let err = CompetencyResponse::from_value(json!({
            "competencies": [{"name": "Go", "weight": "heavy"}]
        }))
        .unwrap_err();
        match err {
            PipelineError::InvalidCompetencySchema { raw, .. } => {
                assert_eq!(raw["competencies"][0]["weight"], "heavy");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_conforming_list() {
        assert!(validate_competencies(&comps(&[30, 25, 20, 15, 10])).is_empty());
    }

    #[test]
    fn test_validate_flags_weight_sum() {
        let problems = validate_competencies(&comps(&[30, 25, 20, 15, 9]));
        assert_eq!(problems, vec!["weights sum to 99, expected 100".to_string()]);
    }

    #[test]
    fn test_validate_flags_count() {
        let problems = validate_competencies(&comps(&[50, 50]));
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("expected 5-12"));
    }

    #[test]
    fn test_validate_does_not_wrap_huge_weights() {
        let problems = validate_competencies(&comps(&[u32::MAX, 1, 0, 0, 100]));
        assert!(problems.contains(&"1 competencies weigh more than 100".to_string()));
        assert!(problems.contains(&"weights sum to 4294967396, expected 100".to_string()));
    }

    #[test]
    fn test_validate_leaves_empty_list_to_aggregator() {
        assert!(validate_competencies(&[]).is_empty());
    }

    #[tokio::test]
    async fn test_extract_competencies_happy_path() {
        let gateway = MockGateway::with_responses([backend_competencies_json().to_string()]);
        let competencies = extract_competencies("jd", ModelChoice::Gpt4o, &gateway, true)
            .await
            .unwrap();
        assert_eq!(competencies.len(), 5);
        assert_eq!(competencies.iter().map(|c| c.weight).sum::<u32>(), 100);

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, ModelChoice::Gpt4o);
        assert_eq!(calls[0].max_tokens, COMPETENCY_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_gateway_failure_is_extraction_failure() {
        let gateway = MockGateway::new();
        gateway.push_err(LlmError::Api {
            status: 401,
            message: "Invalid API key".to_string(),
        });
        let err = extract_competencies("jd", ModelChoice::default(), &gateway, true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::CompetencyExtractionFailed(StageError::Gateway(_))
        ));
        assert!(err.to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn test_malformed_output_is_extraction_failure() {
        let gateway = MockGateway::with_responses(["I'm sorry, I can't help with that."]);
        let err = extract_competencies("jd", ModelChoice::default(), &gateway, true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::CompetencyExtractionFailed(StageError::MalformedModelOutput(_))
        ));
        assert!(err.to_string().contains("I'm sorry"));
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_bad_weights() {
        let bad = json!({"competencies": [
            {"name": "A", "weight": 10}, {"name": "B", "weight": 10},
            {"name": "C", "weight": 10}, {"name": "D", "weight": 10},
            {"name": "E", "weight": 10}
        ]});
        let gateway = MockGateway::with_responses([bad.to_string()]);
        let err = extract_competencies("jd", ModelChoice::default(), &gateway, true)
            .await
            .unwrap_err();
        match err {
            PipelineError::InvalidCompetencySchema { reason, .. } => {
                assert!(reason.contains("weights sum to 50"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_strict_mode_rejects_weight_that_would_wrap_the_sum() {
        let bad = json!({"competencies": [
            {"name": "A", "weight": u32::MAX}, {"name": "B", "weight": 1},
            {"name": "C", "weight": 0}, {"name": "D", "weight": 0},
            {"name": "E", "weight": 100}
        ]});
        let gateway = MockGateway::with_responses([bad.to_string()]);
        let err = extract_competencies("jd", ModelChoice::default(), &gateway, true)
            .await
            .unwrap_err();
        match err {
            PipelineError::InvalidCompetencySchema { reason, .. } => {
                assert!(reason.contains("weigh more than 100"));
                assert!(reason.contains("weights sum to 4294967396"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_lenient_mode_keeps_bad_weights() {
        let bad = json!({"competencies": [{"name": "A", "weight": 70}, {"name": "B", "weight": 20}]});
        let gateway = MockGateway::with_responses([bad.to_string()]);
        let competencies = extract_competencies("jd", ModelChoice::default(), &gateway, false)
            .await
            .unwrap();
        assert_eq!(competencies.len(), 2);
    }
}
