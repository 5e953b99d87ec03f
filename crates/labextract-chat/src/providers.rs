//! External LLM provider calls (non-streaming).
//!
//! OpenAI and Groq use the same chat-completions format. Anthropic uses the
//! Messages API, which takes the system prompt as a top-level field.

use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::types::{ChatMessage, LLMProvider, ProviderSelection};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: usize = 4096;

/// Send one chat request and return the assistant's text.
pub async fn complete(
    client: &Client,
    selection: &ProviderSelection,
    messages: &[ChatMessage],
    temperature: f64,
) -> Result<String, String> {
    match selection.provider {
        LLMProvider::OpenAI | LLMProvider::Groq => {
            complete_openai_compat(client, selection, messages, temperature).await
        }
        LLMProvider::Anthropic => complete_anthropic(client, selection, messages, temperature).await,
    }
}

/// Complete via OpenAI-compatible APIs (OpenAI, Groq).
async fn complete_openai_compat(
    client: &Client,
    selection: &ProviderSelection,
    messages: &[ChatMessage],
    temperature: f64,
) -> Result<String, String> {
    let url = format!("{}/chat/completions", selection.base_url.trim_end_matches('/'));
    let msgs: Vec<Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let body = json!({
        "model": selection.model,
        "messages": msgs,
        "temperature": temperature,
        "response_format": {"type": "json_object"},
    });

    debug!("Requesting completion from {} with model {}", url, selection.model);

    let response = client
        .post(&url)
        .header("Authorization", format!("Bearer {}", selection.api_key))
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;

    let parsed = read_body(response).await?;
    parsed["choices"][0]["message"]["content"]
        .as_str()
        .map(String::from)
        .ok_or_else(|| format!("Response has no message content: {}", parsed))
}

/// Complete via Anthropic's Messages API.
async fn complete_anthropic(
    client: &Client,
    selection: &ProviderSelection,
    messages: &[ChatMessage],
    temperature: f64,
) -> Result<String, String> {
    // Separate system message from conversation
    let system_msg: Option<&str> = messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.as_str());

    let conv_msgs: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": selection.model,
        "messages": conv_msgs,
        "temperature": temperature,
        "max_tokens": ANTHROPIC_MAX_TOKENS,
    });
    if let Some(sys) = system_msg {
        body["system"] = json!(sys);
    }

    let url = format!("{}/messages", selection.base_url.trim_end_matches('/'));
    debug!("Requesting completion from {} with model {}", url, selection.model);

    let response = client
        .post(&url)
        .header("x-api-key", &selection.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .header("Content-Type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;

    let parsed = read_body(response).await?;
    let text: String = parsed["content"]
        .as_array()
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b["type"] == "text")
                .filter_map(|b| b["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(format!("Response has no text content: {}", parsed));
    }
    Ok(text)
}

async fn read_body(response: reqwest::Response) -> Result<Value, String> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("API error {}: {}", status, body));
    }
    response
        .json::<Value>()
        .await
        .map_err(|e| format!("Invalid response body: {}", e))
}
