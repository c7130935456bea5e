//! Structured field extraction from registry evidence.
//!
//! The captured page text is sent to an OpenAI-compatible chat-completions
//! endpoint with a fixed target schema. The reply must parse into
//! [`ExtractedFields`]; anything else is a fatal [`ReviewError::MalformedResponse`].

mod parse;
mod prompt;

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

use regreview_shared::{LlmConfig, Result, ReviewError};

pub use parse::{BilingualText, ExtractedFields, parse_extraction, strip_code_fences};
pub use prompt::{SYSTEM_PROMPT, build_user_prompt, truncate_evidence};

/// Turns registry page text into structured fields.
#[allow(async_fn_in_trait)]
pub trait Extractor {
    async fn extract(&self, evidence_text: &str) -> Result<ExtractedFields>;
}

/// Chat-completions client configured from `[llm]`.
pub struct OpenAiExtractor {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_evidence_chars: usize,
}

impl OpenAiExtractor {
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ReviewError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_evidence_chars: config.max_evidence_chars,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl Extractor for OpenAiExtractor {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn extract(&self, evidence_text: &str) -> Result<ExtractedFields> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_user_prompt(evidence_text, self.max_evidence_chars) },
            ],
            "temperature": self.temperature,
            "response_format": { "type": "json_object" },
        });

        info!(endpoint = %self.endpoint, "requesting field extraction");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReviewError::Network(format!("{}: {e}", self.endpoint)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ReviewError::Network(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            return Err(ReviewError::ExtractionService {
                status: status.as_u16(),
                body: text,
            });
        }

        let chat: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ReviewError::MalformedResponse(format!("invalid completion envelope: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ReviewError::MalformedResponse("completion has no message content".into()))?;

        debug!(chars = content.len(), "extraction reply received");
        parse_extraction(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FIELDS: &str = r#"{"product_name":{"original_ko":"맥박산소측정기","translated_en":"Pulse Oximeter"},"device_description":{"original_ko":"","translated_en":"measures SpO2"},"intended_use":{"original_ko":"","translated_en":""},"risk_class":"2","approval_number":"제허 12-345호","approval_date":"2012-05-01","confidence_notes":""}"#;

    fn config_for(server: &MockServer) -> LlmConfig {
        LlmConfig {
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            timeout_secs: 5,
            ..LlmConfig::default()
        }
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
    }

    #[tokio::test]
    async fn extracts_fenced_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "response_format": { "type": "json_object" }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion(&format!("```json\n{FIELDS}\n```"))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let extractor = OpenAiExtractor::new(&config_for(&server), "test-key").unwrap();
        let fields = extractor.extract("품목명 맥박산소측정기").await.unwrap();

        assert_eq!(fields.product_name.translated_en, "Pulse Oximeter");
        assert_eq!(fields.risk_class, "2");
        assert_eq!(fields.approval_number, "제허 12-345호");
    }

    #[tokio::test]
    async fn non_success_status_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .mount(&server)
            .await;

        let extractor = OpenAiExtractor::new(&config_for(&server), "k").unwrap();
        let err = extractor.extract("text").await.unwrap_err();

        match err {
            ReviewError::ExtractionService { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream exploded");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn prose_reply_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Sorry, no device here.")))
            .mount(&server)
            .await;

        let extractor = OpenAiExtractor::new(&config_for(&server), "k").unwrap();
        let err = extractor.extract("text").await.unwrap_err();
        assert!(matches!(err, ReviewError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn empty_choices_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let extractor = OpenAiExtractor::new(&config_for(&server), "k").unwrap();
        let err = extractor.extract("text").await.unwrap_err();
        assert!(err.to_string().contains("no message content"));
    }
}
