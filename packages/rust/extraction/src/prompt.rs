//! Prompt construction for registry field extraction.

/// System message sent with every extraction request.
pub const SYSTEM_PROMPT: &str = "You are a cautious regulatory analyst who outputs valid JSON only.";

/// Keep at most `max_chars` characters, never splitting a code point.
pub fn truncate_evidence(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the user message asking for the extraction schema.
pub fn build_user_prompt(evidence_text: &str, max_chars: usize) -> String {
    let evidence = truncate_evidence(evidence_text, max_chars);
    format!(
        r#"You are given visible text captured from a South Korean MFDS medical device registry page.

Extract the following into the exact JSON structure below:
- the product name
- a short device description
- the intended use, only if the page states it explicitly
- the risk class as printed on the page (for example "2" or "Class II")
- the approval (license) number and approval date

Rules:
- Do not guess. Leave a field as an empty string when the page does not state it.
- Keep the Korean wording in "original_ko" and give an English translation in "translated_en".
- Use "confidence_notes" to explain anything uncertain.
- Return JSON only, with no commentary.

{{
  "product_name": {{ "original_ko": "", "translated_en": "" }},
  "device_description": {{ "original_ko": "", "translated_en": "" }},
  "intended_use": {{ "original_ko": "", "translated_en": "" }},
  "risk_class": "",
  "approval_number": "",
  "approval_date": "",
  "confidence_notes": ""
}}

Registry page text:
{evidence}"#
    )
}
