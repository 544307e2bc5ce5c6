//! Classifier backed by the OpenAI chat completions API.

use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ClassifierError, ClassifierResult};
use crate::traits::classifier::Classifier;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Asks each question as a single user message and returns the reply text.
pub struct OpenAIClassifier {
    http_client: Client,
    api_key: SecretBox<str>,
    model: String,
    base_url: String,
}

impl OpenAIClassifier {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: SecretBox::new(Box::from(api_key.into().as_str())),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Create from `OPENAI_API_KEY`, with `OPENAI_MODEL` overriding the model.
    pub fn from_env() -> ClassifierResult<Self> {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| ClassifierError::Config("OPENAI_API_KEY not set".into()))?;

        let classifier = Self::new(api_key);
        Ok(match std::env::var("OPENAI_MODEL") {
            Ok(model) if !model.trim().is_empty() => classifier.with_model(model.trim()),
            _ => classifier,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set a custom base URL (for Azure, proxies, etc.).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request<'a>(&'a self, question: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: question,
            }],
        }
    }
}

impl fmt::Debug for OpenAIClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIClassifier")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

fn first_answer(raw: ChatResponseRaw) -> ClassifierResult<String> {
    raw.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or(ClassifierError::EmptyAnswer)
}

#[async_trait]
impl Classifier for OpenAIClassifier {
    async fn ask(&self, question: &str) -> ClassifierResult<String> {
        let start = std::time::Instant::now();

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .header("Content-Type", "application/json")
            .json(&self.request(question))
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OpenAI request failed");
                ClassifierError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "OpenAI API error");
            return Err(ClassifierError::Api(format!("{status}: {error_text}")));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| ClassifierError::Parse(e.to_string()))?;

        debug!(
            model = %self.model,
            duration_ms = start.elapsed().as_millis(),
            "OpenAI chat completion"
        );

        first_answer(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_api_key() {
        let classifier = OpenAIClassifier::new("sk-very-secret");
        let debug = format!("{classifier:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains(DEFAULT_MODEL));
    }

    #[test]
    fn test_request_is_single_user_message() {
        let classifier = OpenAIClassifier::new("key").with_model("gpt-4o");
        let json = serde_json::to_value(classifier.request("Is this a fit?")).unwrap();

        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Is this a fit?");
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        let classifier = OpenAIClassifier::new("key").with_base_url("http://localhost:8080/v1/");
        assert_eq!(classifier.base_url(), "http://localhost:8080/v1");
    }

    #[test]
    fn test_first_answer_is_trimmed() {
        let raw: ChatResponseRaw = serde_json::from_str(
            r#"{ "choices": [ { "message": { "content": " 1,-1,0 \n" } } ] }"#,
        )
        .unwrap();
        assert_eq!(first_answer(raw).unwrap(), "1,-1,0");
    }

    #[test]
    fn test_missing_content_is_empty_answer() {
        let raw: ChatResponseRaw =
            serde_json::from_str(r#"{ "choices": [ { "message": { "content": null } } ] }"#).unwrap();
        assert!(matches!(first_answer(raw), Err(ClassifierError::EmptyAnswer)));

        let raw: ChatResponseRaw = serde_json::from_str(r#"{ "choices": [] }"#).unwrap();
        assert!(matches!(first_answer(raw), Err(ClassifierError::EmptyAnswer)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let classifier = OpenAIClassifier::new("key").with_base_url("http://127.0.0.1:1");
        let err = classifier.ask("anything").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Network(_)));
    }
}
