/// OpenAI chat completions client
use crate::{
    ai::{upstream_message, ChatCompletion, ChatModel, ChatRequest, Usage},
    config::OpenAiConfig,
    error::{StudioError, StudioResult},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Chat completion client for the OpenAI API
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> StudioResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("content-studio/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StudioError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    fn api_key(&self) -> StudioResult<&str> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| StudioError::Upstream("OPENAI_API_KEY is not configured".to_string()))
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, request: ChatRequest) -> StudioResult<ChatCompletion> {
        let api_key = self.api_key()?;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let body = CompletionBody {
            model: &self.config.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| StudioError::Upstream(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(StudioError::UpstreamAuth("OpenAI API key is invalid".to_string()));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "OpenAI returned an error");
            return Err(StudioError::Upstream(
                upstream_message(&text)
                    .unwrap_or_else(|| format!("OpenAI returned error: {}", status)),
            ));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| StudioError::Upstream(format!("Invalid OpenAI response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();

        Ok(ChatCompletion {
            content,
            usage: parsed.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[tokio::test]
    async fn test_missing_key_is_reported_before_any_request() {
        let client = OpenAiClient::new(ServerConfig::default().openai).unwrap();
        let err = client
            .complete(ChatRequest {
                system: "s".into(),
                prompt: "p".into(),
                temperature: 0.8,
                max_tokens: 10,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StudioError::Upstream(_)));
        assert_eq!(err.to_string(), "OPENAI_API_KEY is not configured");
    }

    #[test]
    fn test_completion_body_shape() {
        let body = CompletionBody {
            model: "gpt-4o-mini",
            messages: [
                Message { role: "system", content: "sys" },
                Message { role: "user", content: "hi" },
            ],
            temperature: 0.8,
            max_tokens: 200,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["max_tokens"], 200);
    }

    #[test]
    fn test_parse_completion_response() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": " Hello "}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let parsed: CompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some(" Hello "));
        assert_eq!(parsed.usage.unwrap().total_tokens, 12);
    }
}
