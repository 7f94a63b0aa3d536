// Prompt fragments shared by every generation prompt.

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps generated CV text anchored to what the user actually provided.
pub const GROUNDING_INSTRUCTION: &str = "\
    Only use facts present in the context below. Do NOT invent employers, \
    degrees, certifications, languages, numbers or dates. \
    If the context does not support a field, return null for it.";
