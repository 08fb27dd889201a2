use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::documents::ExtractedText;

/// A weighted skill or trait implied by the job description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competency {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub weight: u32,
}

/// A CV after text extraction. `id` is stable within one run; `name` is for display
/// and is not guaranteed unique.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: Uuid,
    pub name: String,
    pub text: ExtractedText,
}

impl Candidate {
    pub fn new(name: impl Into<String>, text: ExtractedText) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            text,
        }
    }
}

/// Per-candidate outcome as reported by the scoring model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    #[serde(deserialize_with = "percent")]
    pub weighted_match_pct: u8,
    #[serde(deserialize_with = "percent", default)]
    pub palantir_knowledge_pct: u8,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
}

/// Qualitative match of one candidate against one competency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MatchLabel {
    Full,
    Partial,
    Gap,
}

impl MatchLabel {
    /// Rubric points: Full=100, Partial=50, Gap=0.
    pub fn points(self) -> u32 {
        match self {
            MatchLabel::Full => 100,
            MatchLabel::Partial => 50,
            MatchLabel::Gap => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchLabel::Full => "Full",
            MatchLabel::Partial => "Partial",
            MatchLabel::Gap => "Gap",
        }
    }
}

impl fmt::Display for MatchLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(MatchLabel::Full),
            "partial" => Ok(MatchLabel::Partial),
            "gap" => Ok(MatchLabel::Gap),
            other => Err(format!(
                "unknown match label '{other}' (expected Full, Partial or Gap)"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for MatchLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Competency name -> candidate name -> label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Heatmap(BTreeMap<String, BTreeMap<String, MatchLabel>>);

impl Heatmap {
    pub fn label(&self, competency: &str, candidate: &str) -> Option<MatchLabel> {
        self.0.get(competency)?.get(candidate).copied()
    }

    /// Cell text for tabular output; absent pairs render as an empty string.
    pub fn cell(&self, competency: &str, candidate: &str) -> &'static str {
        self.label(competency, candidate)
            .map(MatchLabel::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
impl Heatmap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, competency: &str, candidate: &str, label: MatchLabel) {
        self.0
            .entry(competency.to_string())
            .or_default()
            .insert(candidate.to_string(), label);
    }
}

/// Terminal artifact of a matching run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    #[serde(default)]
    pub competencies: Vec<Competency>,
    #[serde(default)]
    pub results: Vec<CandidateResult>,
    #[serde(default)]
    pub heatmap: Heatmap,
}

// Accepts integers or floats (rounded); rejects anything outside 0..=100.
fn percent<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(serde::de::Error::custom(format!(
            "percentage {value} is outside 0-100"
        )));
    }
    Ok(value.round() as u8)
}
