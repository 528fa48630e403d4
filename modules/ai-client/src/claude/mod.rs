mod client;
pub(crate) mod types;

use crate::error::{AiError, Result};

use client::ClaudeClient;
use types::*;

// =============================================================================
// Claude Agent
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub(crate) fn client(&self) -> ClaudeClient {
        let client = ClaudeClient::new(&self.api_key, self.http.clone());
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    /// Single-turn completion with explicit output budget and sampling temperature.
    pub async fn complete_with(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .system(system)
            .message(WireMessage::user(user))
            .max_tokens(max_tokens)
            .temperature(temperature);

        let response = self.client().chat(&request).await?;

        response.text().ok_or(AiError::EmptyResponse)
    }

    pub async fn chat_completion(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
    ) -> Result<String> {
        self.complete_with(system, user, 4096, 0.0).await
    }

    pub async fn complete(&self, prompt: &str) -> Result<String> {
        self.chat_completion("You are a helpful assistant.", prompt)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_new() {
        let ai = Claude::new("sk-ant-test", "claude-sonnet-4-5-20250929");
        assert_eq!(ai.model, "claude-sonnet-4-5-20250929");
        assert_eq!(ai.api_key, "sk-ant-test");
    }

    #[test]
    fn test_claude_with_base_url() {
        let ai = Claude::new("sk-ant-test", "claude-sonnet-4-5-20250929")
            .with_base_url("https://custom.api.com");
        assert_eq!(ai.base_url, Some("https://custom.api.com".to_string()));
    }

    #[tokio::test]
    async fn complete_with_sends_system_and_sampling_params() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-ant-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "claude-test",
                "max_tokens": 200,
                "system": "be brief",
            })))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"[\"a\", \"b\"]"}],"stop_reason":"end_turn"}"#)
            .create_async()
            .await;

        let ai = Claude::new("sk-ant-test", "claude-test").with_base_url(server.url());
        let text = ai.complete_with("be brief", "topic", 200, 0.3).await.unwrap();

        assert_eq!(text, "[\"a\", \"b\"]");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_becomes_api_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(529)
            .with_body("overloaded")
            .create_async()
            .await;

        let ai = Claude::new("sk-ant-test", "claude-test").with_base_url(server.url());
        let err = ai.complete("hello").await.unwrap_err();

        match err {
            AiError::Api { status, message } => {
                assert_eq!(status, 529);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn response_without_text_is_empty_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"content":[],"stop_reason":"end_turn"}"#)
            .create_async()
            .await;

        let ai = Claude::new("sk-ant-test", "claude-test").with_base_url(server.url());
        let err = ai.complete("hello").await.unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse));
    }
}
