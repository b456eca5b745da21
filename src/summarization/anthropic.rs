use super::{GenerationClient, GenerationError, GenerationRequest, SYSTEM_PROMPT, transport_error};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Generation client backed by the Anthropic messages API (`POST /v1/messages`).
pub struct AnthropicClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    /// Create a client for `model`, authenticating with `api_key`.
    pub fn new(http: Client, base_url: String, api_key: String, model: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl GenerationClient for AnthropicClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GenerationError> {
        let payload = json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [
                { "role": "user", "content": request.prompt }
            ],
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|error| transport_error("Anthropic", &self.base_url, error))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::ProviderUnavailable(
                "Anthropic rate limit exceeded (429)".into(),
            ));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::GenerationFailed(format!(
                "Anthropic returned {status}: {body}"
            )));
        }

        let body: MessagesResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!(
                "failed to decode Anthropic response: {error}"
            ))
        })?;

        if body.stop_reason.as_deref() == Some("max_tokens") {
            tracing::warn!(model = %self.model, "Anthropic response truncated at max_tokens");
        }

        let text = body
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(
                "Anthropic response contained no text blocks".into(),
            ));
        }

        Ok(text.trim().to_string())
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client(base_url: String) -> AnthropicClient {
        AnthropicClient::new(
            Client::builder()
                .user_agent("rusty-digest-test")
                .build()
                .expect("client"),
            base_url,
            "sk-test".into(),
            "claude-3-haiku-20240307".into(),
        )
    }

    #[tokio::test]
    async fn anthropic_client_joins_text_blocks() {
        let server = MockServer::start_async().await;
        let client = client(server.base_url());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/messages")
                    .header("x-api-key", "sk-test")
                    .header("anthropic-version", ANTHROPIC_VERSION);
                then.status(200).json_body(json!({
                    "content": [
                        { "type": "text", "text": "First half. " },
                        { "type": "text", "text": "Second half." }
                    ],
                    "stop_reason": "end_turn"
                }));
            })
            .await;

        let text = client
            .generate(GenerationRequest::new("Summarize", 100))
            .await
            .expect("text");

        mock.assert();
        assert_eq!(text, "First half. Second half.");
    }

    #[tokio::test]
    async fn anthropic_client_maps_rate_limit() {
        let server = MockServer::start_async().await;
        let client = client(server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(429).body("slow down");
            })
            .await;

        let error = client
            .generate(GenerationRequest::new("Summarize", 100))
            .await
            .expect_err("rate limited");

        assert!(matches!(error, GenerationError::ProviderUnavailable(message) if message.contains("429")));
    }

    #[tokio::test]
    async fn anthropic_client_rejects_empty_content() {
        let server = MockServer::start_async().await;
        let client = client(server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(200).json_body(json!({ "content": [] }));
            })
            .await;

        let error = client
            .generate(GenerationRequest::new("Summarize", 100))
            .await
            .expect_err("empty content");

        assert!(matches!(error, GenerationError::InvalidResponse(_)));
    }
}
