// Shared prompt constants used by the model backends.
// Each flow defines its own prompt template in flows/prompts.rs.

/// System instruction sent whenever structured output is requested.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only, matching the requested response schema. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Reply text produced by the mock backend. The prompt is appended verbatim.
pub const MOCK_REPLY_PREFIX: &str =
    "This is a mock response because the Gemini API key is not configured. You asked: ";

pub fn mock_reply(prompt: &str) -> String {
    format!("{MOCK_REPLY_PREFIX}\"{prompt}\"")
}
