//! Lab-result field extraction with an external LLM.

use async_trait::async_trait;
use labextract_core::{Error, Prompts, Result};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::LLMConfig;
use crate::providers;
use crate::types::ChatMessage;

/// Key every extraction reply must contain.
pub const LAB_RESULTS_KEY: &str = "lab_results";

pub const SYSTEM_PROMPT: &str = "You are an AI assistant specialized in extracting structured data \
from text. Always respond strictly in the JSON format provided by the user, without additional \
text, explanations, or commentary. If a field is not present in the input, return 'not present' \
as the value for that field.";

/// Deterministic sampling.
const TEMPERATURE: f64 = 0.0;

/// Turns extracted report text into a JSON object with a `lab_results` list.
#[async_trait]
pub trait FieldExtractor: Send + Sync {
    async fn get_fields(&self, text: &str) -> Result<Map<String, Value>>;
}

/// [`FieldExtractor`] backed by a chat-completion API.
pub struct LlmFieldExtractor {
    client: Client,
    config: LLMConfig,
    prompts: Prompts,
}

impl LlmFieldExtractor {
    pub fn new(config: LLMConfig, prompts: Prompts) -> Self {
        Self {
            client: Client::new(),
            config,
            prompts,
        }
    }

    /// The system + user message pair for `text`.
    pub fn build_messages(&self, text: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(self.prompts.render_field_extraction(text)),
        ]
    }
}

#[async_trait]
impl FieldExtractor for LlmFieldExtractor {
    async fn get_fields(&self, text: &str) -> Result<Map<String, Value>> {
        let selection = self
            .config
            .resolve_provider()
            .ok_or_else(|| Error::Config("No LLM provider configured".into()))?;

        debug!(
            "Extracting fields from {} chars with {} ({})",
            text.len(),
            selection.provider,
            selection.model
        );

        let messages = self.build_messages(text);
        let reply = providers::complete(&self.client, &selection, &messages, TEMPERATURE)
            .await
            .map_err(|e| {
                Error::Llm(format!(
                    "Failed to get response from {} API: {}",
                    selection.provider.display_name(),
                    e
                ))
            })?;

        parse_response(&reply)
    }
}

/// Parse a model reply, requiring a JSON object with a `lab_results` list.
pub fn parse_response(reply: &str) -> Result<Map<String, Value>> {
    let parsed: Value = serde_json::from_str(reply)
        .map_err(|e| Error::Llm(format!("Failed to parse response into json: {}", e)))?;

    let object = match parsed {
        Value::Object(map) if map.contains_key(LAB_RESULTS_KEY) => map,
        other => {
            return Err(Error::Llm(format!(
                "'{}' field is not present in response: {}",
                LAB_RESULTS_KEY, other
            )));
        }
    };

    if !object[LAB_RESULTS_KEY].is_array() {
        return Err(Error::Llm(format!(
            "'{}' must be a list, got: {}",
            LAB_RESULTS_KEY, object[LAB_RESULTS_KEY]
        )));
    }

    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn prompts() -> Prompts {
        Prompts {
            field_extraction: "Extract as JSON:\n{extracted_text}".into(),
            parsing_instruction: String::new(),
        }
    }

    fn openai_config(base_url: &str) -> LLMConfig {
        LLMConfig {
            openai_api_key: Some("sk-test".into()),
            openai_base_url: base_url.to_string(),
            ..LLMConfig::default()
        }
    }

    fn completion(content: &str) -> Value {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]})
    }

    #[test]
    fn test_parse_valid() {
        let map = parse_response(r#"{"lab_results":[{"test_name":"Hemoglobin","value":"14.2"}]}"#)
            .unwrap();
        assert_eq!(map["lab_results"][0]["test_name"], "Hemoglobin");
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_response("Sure! Here are the results: Hemoglobin 14.2").unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse response into json"));
    }

    #[test]
    fn test_parse_missing_key() {
        let err = parse_response(r#"{"results": []}"#).unwrap_err();
        assert!(err.to_string().contains("'lab_results' field is not present"));

        let err = parse_response("[]").unwrap_err();
        assert!(err.to_string().contains("'lab_results' field is not present"));
    }

    #[test]
    fn test_parse_non_list() {
        let err = parse_response(r#"{"lab_results": "none"}"#).unwrap_err();
        assert!(err.to_string().contains("must be a list"));
    }

    #[test]
    fn test_build_messages() {
        let extractor = LlmFieldExtractor::new(LLMConfig::default(), prompts());
        let messages = extractor.build_messages("Hemoglobin: 14.2");
        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("'not present'"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "Extract as JSON:\nHemoglobin: 14.2");
    }

    #[tokio::test]
    async fn test_get_fields_openai() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({"model": "gpt-4o-mini", "temperature": 0.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(
                r#"{"lab_results":[{"test_name":"Hemoglobin","value":"14.2"}]}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let extractor = LlmFieldExtractor::new(openai_config(&server.uri()), prompts());
        let fields = extractor.get_fields("Hemoglobin: 14.2").await.unwrap();
        assert_eq!(
            Value::Object(fields),
            json!({"lab_results": [{"test_name": "Hemoglobin", "value": "14.2"}]})
        );
    }

    #[tokio::test]
    async fn test_get_fields_reply_without_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(r#"{"tests": []}"#)))
            .mount(&server)
            .await;

        let extractor = LlmFieldExtractor::new(openai_config(&server.uri()), prompts());
        let err = extractor.get_fields("text").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
        assert!(err.to_string().contains("'lab_results'"));
    }

    #[tokio::test]
    async fn test_get_fields_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let extractor = LlmFieldExtractor::new(openai_config(&server.uri()), prompts());
        let err = extractor.get_fields("text").await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Failed to get response from OpenAI API"), "{}", message);
        assert!(message.contains("quota exceeded"));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_get_fields_anthropic() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(body_partial_json(json!({"system": SYSTEM_PROMPT, "temperature": 0.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "{\"lab_results\": []}"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = LLMConfig {
            anthropic_api_key: Some("ak-test".into()),
            anthropic_base_url: server.uri(),
            ..LLMConfig::default()
        };
        let extractor = LlmFieldExtractor::new(config, prompts());
        let fields = extractor.get_fields("nothing here").await.unwrap();
        assert_eq!(fields["lab_results"], json!([]));
    }

    #[tokio::test]
    async fn test_no_provider() {
        let extractor = LlmFieldExtractor::new(LLMConfig::default(), prompts());
        let err = extractor.get_fields("text").await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
