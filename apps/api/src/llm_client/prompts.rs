// Shared prompt constants used by the LLM client itself.
// Each service that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for reading uploaded resume documents.
pub const DOCUMENT_EXTRACT_SYSTEM: &str = "You are a document transcription engine. \
    You return the full textual content of the attached document and nothing else.";

/// Instruction sent alongside an attached resume document or image.
pub const DOCUMENT_EXTRACT_PROMPT: &str = "Extract all text from this resume. \
    Preserve section headings, bullet points and reading order. \
    Do NOT summarise, translate, or add commentary. \
    If the document contains no readable text, return an empty response.";
