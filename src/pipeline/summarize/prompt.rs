/// Instruction placed in front of the report text.
pub const SUMMARY_INSTRUCTION: &str = "Summarize the following medical text:";

pub const SUMMARY_SYSTEM_PROMPT: &str = "You summarize medical reports for the patient who \
received them. Write a short plain-language summary of what the report says. Do not add \
diagnoses, values or advice that are not in the text.";

/// Full prompt for one summary request.
pub fn build_summary_prompt(text: &str) -> String {
    format!("{SUMMARY_INSTRUCTION}\n\n{text}")
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
