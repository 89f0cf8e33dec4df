//! Hosted LLM chat-completion client
//!
//! Provides a `ChatBackend` trait with one implementation:
//! - **OpenAI-compatible** — `POST {base_url}/chat/completions` with bearer auth
//!
//! Single attempt per call: callers degrade to canned output instead of retrying.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LlmConfig;
use crate::error::ValidationError;

// ============================================================================
// ChatBackend trait
// ============================================================================

/// Abstraction over chat-completion providers.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Run one completion and return the trimmed content of the first choice.
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, LlmError>;

    /// Model name, for logging.
    fn model(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Missing API key")]
    MissingApiKey,

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Empty LLM response")]
    EmptyResponse,

    #[error("Malformed JSON in LLM response: {0}")]
    MalformedJson(String),

    #[error("LLM output failed validation: {0}")]
    Validation(#[from] ValidationError),
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    /// Ask the provider for a single JSON object.
    pub json_object: bool,
}

impl CompletionOptions {
    pub fn json(temperature: f32) -> Self {
        Self {
            temperature,
            json_object: true,
        }
    }

    pub fn text(temperature: f32) -> Self {
        Self {
            temperature,
            json_object: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// OpenAiChatClient
// ============================================================================

#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiChatClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Build from config; `Ok(None)` when no API key is present.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>, LlmError> {
        match config.api_key() {
            Some(key) => Ok(Some(Self::new(
                key,
                config.resolved_model(),
                config.base_url.clone(),
                Duration::from_secs(config.timeout_seconds),
            )?)),
            None => Ok(None),
        }
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait]
impl ChatBackend for OpenAiChatClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: CompletionOptions,
    ) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: options.temperature,
            response_format: options
                .json_object
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        tracing::debug!(model = %self.model, json = options.json_object, "LLM chat request");

        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "LLM API error");

            return Err(LlmError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let chat: ChatResponse = response.json().await?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyResponse)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Parse an LLM reply as a JSON object, falling back to the outermost `{...}`
/// span when the model wrapped it in prose or code fences.
pub fn parse_json_object(raw: &str) -> Result<serde_json::Value, LlmError> {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(raw) {
        return Ok(v);
    }

    let start = raw.find('{');
    let end = raw.rfind('}');
    match (start, end) {
        (Some(s), Some(e)) if e > s => serde_json::from_str(&raw[s..=e])
            .map_err(|err| LlmError::MalformedJson(err.to_string())),
        _ => Err(LlmError::MalformedJson("no JSON object found".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OpenAiChatClient {
        OpenAiChatClient::new("test-key", "gpt-4o-mini", server.uri(), Duration::from_secs(5))
            .expect("client")
    }

    fn completion(content: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
        })
    }

    #[tokio::test]
    async fn test_complete_sends_json_mode_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.3,
                "response_format": { "type": "json_object" }
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(completion("  {\"ok\":true}\n")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let out = client(&server)
            .complete(
                &[ChatMessage::system("sys"), ChatMessage::user("hi")],
                CompletionOptions::json(0.3),
            )
            .await
            .unwrap();
        assert_eq!(out, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_error_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": { "message": "Rate limit reached", "type": "requests" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        match client(&server)
            .complete(&[ChatMessage::user("hi")], CompletionOptions::text(0.2))
            .await
        {
            Err(LlmError::Api { code, message }) => {
                assert_eq!(code, 429);
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_empty_choices_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })),
            )
            .mount(&server)
            .await;

        let result = client(&server)
            .complete(&[ChatMessage::user("hi")], CompletionOptions::text(0.2))
            .await;
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let result = OpenAiChatClient::new("", "m", "http://localhost", Duration::from_secs(1));
        assert!(matches!(result, Err(LlmError::MissingApiKey)));
    }

    #[test]
    fn test_parse_json_object_direct() {
        let v = parse_json_object(r#"{"rating":"Unclear"}"#).unwrap();
        assert_eq!(v["rating"], "Unclear");
    }

    #[test]
    fn test_parse_json_object_embedded_in_prose() {
        let raw = "Here you go:\n```json\n{\"rating\": \"Likely False\", \"nested\": {\"a\": 1}}\n```";
        let v = parse_json_object(raw).unwrap();
        assert_eq!(v["rating"], "Likely False");
        assert_eq!(v["nested"]["a"], 1);
    }

    #[test]
    fn test_parse_json_object_garbage() {
        assert!(matches!(
            parse_json_object("no json here"),
            Err(LlmError::MalformedJson(_))
        ));
        assert!(parse_json_object("} backwards {").is_err());
    }
}
