//! Structured parsing of completion-service replies.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use regreview_shared::{Result, ReviewError};

/// A field extracted in the registry's language and translated to English.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BilingualText {
    #[serde(default, deserialize_with = "lenient_string")]
    pub original_ko: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub translated_en: String,
}

/// The target schema the completion service is asked to fill.
///
/// Every key except `confidence_notes` must be present; `null` values are
/// read as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub product_name: BilingualText,
    pub device_description: BilingualText,
    pub intended_use: BilingualText,
    #[serde(deserialize_with = "lenient_string")]
    pub risk_class: String,
    #[serde(deserialize_with = "lenient_string")]
    pub approval_number: String,
    #[serde(deserialize_with = "lenient_string")]
    pub approval_date: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub confidence_notes: String,
}

/// Accept a string, a number (models like to answer `2` for a class) or null.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected a string, got {other}"))),
    }
}

/// Remove a surrounding Markdown code fence (with optional language tag).
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    let body = match rest.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with('{') => body,
        _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };

    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse a reply into [`ExtractedFields`]. Anything unparseable is fatal.
pub fn parse_extraction(content: &str) -> Result<ExtractedFields> {
    let json = strip_code_fences(content);
    serde_json::from_str(json).map_err(|e| {
        let snippet: String = json.chars().take(200).collect();
        ReviewError::MalformedResponse(format!("{e} (got: {snippet})"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = r#"{
  "product_name": { "original_ko": "맥박산소측정기", "translated_en": "Pulse Oximeter" },
  "device_description": { "original_ko": "...", "translated_en": "measure blood oxygen saturation" },
  "intended_use": { "original_ko": "", "translated_en": "" },
  "risk_class": "2",
  "approval_number": "제허 12-345호",
  "approval_date": "2012-05-01",
  "confidence_notes": "Class taken from the grade field."
}"#;

    #[test]
    fn plain_json_passes_through() {
        assert_eq!(strip_code_fences("  {\"a\": 1}\n"), "{\"a\": 1}");
    }

    #[test]
    fn fenced_json_is_unwrapped() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{\"a\": 1}\n```\n"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```json {\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```{\n\"a\": 1}\n```"), "{\n\"a\": 1}");
    }

    #[test]
    fn parses_full_reply() {
        let fields = parse_extraction(REPLY).unwrap();
        assert_eq!(fields.product_name.translated_en, "Pulse Oximeter");
        assert_eq!(fields.risk_class, "2");
        assert!(fields.intended_use.translated_en.is_empty());
        assert_eq!(fields.confidence_notes, "Class taken from the grade field.");
    }

    #[test]
    fn parses_fenced_reply() {
        let fenced = format!("```json\n{REPLY}\n```");
        assert_eq!(parse_extraction(&fenced).unwrap(), parse_extraction(REPLY).unwrap());
    }

    #[test]
    fn tolerates_nulls_and_numbers() {
        let reply = r#"{
          "product_name": { "original_ko": null, "translated_en": "Thermometer" },
          "device_description": { "translated_en": "measure skin temperature" },
          "intended_use": { "original_ko": "", "translated_en": null },
          "risk_class": 2,
          "approval_number": null,
          "approval_date": null
        }"#;
        let fields = parse_extraction(reply).unwrap();
        assert_eq!(fields.risk_class, "2");
        assert!(fields.approval_number.is_empty());
        assert!(fields.product_name.original_ko.is_empty());
        assert!(fields.confidence_notes.is_empty());
    }

    #[test]
    fn missing_required_key_is_malformed() {
        let reply = r#"{ "product_name": { "translated_en": "X" }, "risk_class": "2" }"#;
        let err = parse_extraction(reply).unwrap_err();
        assert!(matches!(err, ReviewError::MalformedResponse(_)));
    }

    #[test]
    fn prose_reply_is_malformed() {
        let err = parse_extraction("I could not find a device on this page.").unwrap_err();
        assert!(err.to_string().starts_with("malformed extraction response"));
        assert!(err.to_string().contains("I could not find"));
    }
}
