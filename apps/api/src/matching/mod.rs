// Résumé matching: JD competencies, candidate scoring, aggregation.
// All LLM calls go through an injected `LlmGateway`.

pub mod aggregate;
pub mod competencies;
pub mod error;
pub mod handlers;
pub mod json_extract;
pub mod models;
pub mod pipeline;
pub mod prompts;
pub mod scoring;
