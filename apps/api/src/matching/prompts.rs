// Prompt text for the two matching stages. Builders are pure: same inputs,
// same messages.

use crate::llm_client::prompts::JSON_ONLY_INSTRUCTION;
use crate::llm_client::ChatMessage;
use crate::matching::models::{Candidate, Competency};

/// System prompt for competency extraction.
pub const COMPETENCY_SYSTEM: &str = "You are an expert talent sourcer. \
    Extract the top competencies from the Job Description. \
    The JSON must have a single key 'competencies' whose value is a list of objects. \
    Each competency object must have: 'name' (short), 'description' (1-2 lines), 'weight' (integer). \
    Return 5-12 competencies. Sum of weights must be 100.";

/// Replace `{jd_text}` before sending.
pub const COMPETENCY_PROMPT_TEMPLATE: &str = "JOB DESCRIPTION:
{jd_text}

Return competencies JSON as described.";

/// System prompt for candidate scoring.
pub const SCORING_SYSTEM: &str = "You are an expert technical recruiter and evaluator. \
    You will score each candidate against the competencies list. \
    The JSON must have exactly two keys: 'results' and 'heatmap'. \
    'results' is a list of per-candidate objects: name, weighted_match_pct (0-100 integer), \
    palantir_knowledge_pct (if not applicable for role, return 0), strengths (list), gaps (list). \
    'heatmap' maps competency name -> { candidate_name: 'Full'|'Partial'|'Gap' }. \
    Use the competency weights provided to compute weighted_match_pct. \
    Be concise.";

/// Rubric appended after the candidate blocks.
pub const SCORING_RUBRIC: &str = "For each competency, assign Full (meets or exceeds), \
    Partial (some experience), or Gap (not present). \
    Compute weighted_match_pct as the weighted sum of competency scores: Full=100, Partial=50, Gap=0. \
    Round to nearest integer. \
    If the role is not Palantir-related, set palantir_knowledge_pct=0 for each candidate. \
    Otherwise, estimate Palantir knowledge percent. \
    Use each candidate name exactly as given. \
    Return compact JSON.";

/// A system/user message pair for one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

impl PromptPair {
    pub fn messages(&self) -> [ChatMessage; 2] {
        [
            ChatMessage::system(self.system.as_str()),
            ChatMessage::user(self.user.as_str()),
        ]
    }
}

fn with_json_only(system: &str) -> String {
    format!("{system} {JSON_ONLY_INSTRUCTION}")
}

pub fn build_competency_prompt(jd_text: &str) -> PromptPair {
    PromptPair {
        system: with_json_only(COMPETENCY_SYSTEM),
        user: COMPETENCY_PROMPT_TEMPLATE.replace("{jd_text}", jd_text),
    }
}

/// Embeds the JD, the full competency list and every candidate in upload order.
pub fn build_scoring_prompt(
    jd_text: &str,
    competencies: &[Competency],
    candidates: &[Candidate],
) -> Result<PromptPair, serde_json::Error> {
    let competencies_json = serde_json::to_string_pretty(competencies)?;

    let mut user = format!("JD:\n{jd_text}\n\nCompetencies:\n{competencies_json}\n\nCandidates:\n");
    for candidate in candidates {
        user.push_str(&format!(
            "---\nName: {}\nText:\n{}\n\n",
            candidate.name,
            candidate.text.as_str()
        ));
    }
    user.push('\n');
    user.push_str(SCORING_RUBRIC);

    Ok(PromptPair {
        system: with_json_only(SCORING_SYSTEM),
        user,
    })
}
