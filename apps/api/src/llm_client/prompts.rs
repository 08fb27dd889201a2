// Shared prompt fragments. Each stage that calls the LLM keeps its own
// prompts.rs next to it; this file holds the cross-cutting pieces.

/// Appended to every system prompt that expects a JSON object back.
pub const JSON_ONLY_INSTRUCTION: &str = "Return ONLY valid JSON. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    No extra commentary.";
