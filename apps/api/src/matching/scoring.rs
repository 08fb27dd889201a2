//! Candidate scoring: one LLM call that rates every candidate against every competency.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::llm_client::{LlmGateway, ModelChoice};
use crate::matching::error::{PipelineError, StageError};
use crate::matching::json_extract::extract_json;
use crate::matching::models::{Candidate, CandidateResult, Competency, Heatmap};
use crate::matching::prompts::build_scoring_prompt;

pub const SCORING_MAX_TOKENS: u32 = 1600;

/// Shape the model is asked to return. Results are matched to candidates by name
/// downstream; this stage does not check coverage.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringOutput {
    pub results: Vec<CandidateResult>,
    pub heatmap: Heatmap,
}

impl ScoringOutput {
    /// Validating constructor: both keys must be present with the expected JSON types.
    pub fn from_value(value: Value) -> Result<Self, PipelineError> {
        let shape_ok = value.get("results").is_some_and(Value::is_array)
            && value.get("heatmap").is_some_and(Value::is_object);
        if !shape_ok {
            return Err(PipelineError::InvalidScoringSchema {
                reason: "expected an object with a 'results' list and a 'heatmap' object"
                    .to_string(),
                raw: value,
            });
        }
        match serde_json::from_value::<Self>(value.clone()) {
            Ok(output) => Ok(output),
            Err(e) => Err(PipelineError::InvalidScoringSchema {
                reason: e.to_string(),
                raw: value,
            }),
        }
    }
}

pub async fn score_candidates(
    jd_text: &str,
    competencies: &[Competency],
    candidates: &[Candidate],
    model: ModelChoice,
    llm: &dyn LlmGateway,
) -> Result<ScoringOutput, PipelineError> {
    info!(
        "Scoring {} candidates against {} competencies with {model}",
        candidates.len(),
        competencies.len()
    );

    let prompt = build_scoring_prompt(jd_text, competencies, candidates)
        .map_err(|e| PipelineError::ScoringFailed(StageError::Prompt(e)))?;
    let content = llm
        .chat(model, &prompt.messages(), SCORING_MAX_TOKENS)
        .await
        .map_err(|e| PipelineError::ScoringFailed(StageError::Gateway(e)))?;
    debug!("Scoring stage returned {} chars", content.len());

    let value = extract_json(&content)
        .map_err(|e| PipelineError::ScoringFailed(StageError::MalformedModelOutput(e)))?;
    let output = ScoringOutput::from_value(value)?;

    info!("Scoring returned {} results", output.results.len());
    Ok(output)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::documents::ExtractedText;
    use crate::llm_client::testing::MockGateway;
    use crate::llm_client::LlmError;
    use crate::matching::models::MatchLabel;
    use serde_json::json;

    pub(crate) fn alice_scoring_json() -> Value {
        json!({
            "results": [{
                "name": "alice",
                "weighted_match_pct": 68,
                "palantir_knowledge_pct": 0,
                "strengths": ["5 years Go", "Led Postgres migration"],
                "gaps": ["No API design evidence"]
            }],
            "heatmap": {
                "Go": {"alice": "Full"},
                "Postgres": {"alice": "Full"},
                "APIs": {"alice": "Gap"},
                "Testing": {"alice": "Partial"},
                "Communication": {"alice": "Partial"}
            }
        })
    }

    fn alice() -> Vec<Candidate> {
        vec![Candidate::new(
            "alice",
            ExtractedText::truncated("5 years Go, led Postgres migration".to_string(), 1000),
        )]
    }

    #[test]
    fn test_from_value_parses_results_and_heatmap() {
        let output = ScoringOutput::from_value(alice_scoring_json()).unwrap();
        assert_eq!(output.results.len(), 1);
        assert_eq!(output.results[0].weighted_match_pct, 68);
        assert_eq!(output.heatmap.label("APIs", "alice"), Some(MatchLabel::Gap));
    }

    #[test]
    fn test_from_value_requires_heatmap() {
        let err = ScoringOutput::from_value(json!({"results": []})).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidScoringSchema { .. }));
    }

    #[test]
    fn test_from_value_requires_results_list() {
        let err =
            ScoringOutput::from_value(json!({"results": {"alice": 10}, "heatmap": {}})).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidScoringSchema { .. }));
    }

    #[test]
    fn test_from_value_rejects_unknown_label() {
        let err = ScoringOutput::from_value(json!({
            "results": [],
            "heatmap": {"Go": {"alice": "Excellent"}}
        }))
        .unwrap_err();
        match err {
            PipelineError::InvalidScoringSchema { reason, .. } => {
                assert!(reason.contains("excellent"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_score_candidates_uses_scoring_budget() {
        let gateway = MockGateway::with_responses([format!(
            "Here you go:\n```json\n{}\n```",
            alice_scoring_json()
        )]);
        let comps = vec![Competency {
            name: "Go".to_string(),
            description: String::new(),
            weight: 100,
        }];
        let output = score_candidates("jd", &comps, &alice(), ModelChoice::Gpt4Turbo, &gateway)
            .await
            .unwrap();
        assert_eq!(output.results[0].name, "alice");

        let calls = gateway.calls();
        assert_eq!(calls[0].max_tokens, SCORING_MAX_TOKENS);
        assert!(calls[0].messages[1].content.contains("Name: alice"));
    }

    #[tokio::test]
    async fn test_gateway_failure_is_scoring_failure() {
        let gateway = MockGateway::new();
        gateway.push_err(LlmError::EmptyContent);
        let err = score_candidates("jd", &[], &alice(), ModelChoice::default(), &gateway)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ScoringFailed(StageError::Gateway(_))));
    }

    #[tokio::test]
    async fn test_prose_only_is_scoring_failure() {
        let gateway = MockGateway::with_responses(["All candidates look great!"]);
        let err = score_candidates("jd", &[], &alice(), ModelChoice::default(), &gateway)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ScoringFailed(StageError::MalformedModelOutput(_))
        ));
    }
}
