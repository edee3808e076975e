/// Request validation and orchestration for the AI endpoints
use crate::{
    ai::{
        prompts, ChatModel, ChatRequest, ImageUpscaler, OpenAiClient, PredictionStatus,
        ReplicateClient, Usage,
    },
    config::ServerConfig,
    error::{StudioError, StudioResult},
    metrics,
};
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc, time::Instant};
use validator::Validate;

fn default_scale() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TitleRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "imageDescription is required"))]
    pub image_description: String,
    pub platform: Option<String>,
    pub keywords: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleResponse {
    pub titles: Vec<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "imageDescription is required"))]
    pub image_description: String,
    pub platform: Option<String>,
    pub keywords: Option<String>,
    pub tone: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescriptionResponse {
    pub description: String,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "imageUrl is required"))]
    pub image_url: String,
    #[serde(default = "default_scale")]
    #[validate(range(min = 2, max = 4, message = "scale must be 2, 3 or 4"))]
    pub scale: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub enhanced_image_url: String,
    pub original_url: String,
    pub scale: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnhanceRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "imageUrls must not be empty"))]
    pub image_urls: Vec<String>,
    #[serde(default = "default_scale")]
    #[validate(range(min = 2, max = 4, message = "scale must be 2, 3 or 4"))]
    pub scale: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEnhanceItem {
    pub original_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEnhanceResponse {
    pub results: Vec<BatchEnhanceItem>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Front door for every AI operation
pub struct AiGateway {
    chat: Arc<dyn ChatModel>,
    upscaler: Arc<dyn ImageUpscaler>,
}

impl AiGateway {
    pub fn new(chat: Arc<dyn ChatModel>, upscaler: Arc<dyn ImageUpscaler>) -> Self {
        Self { chat, upscaler }
    }

    /// Gateway backed by OpenAI and Replicate
    pub fn from_config(config: &ServerConfig) -> StudioResult<Self> {
        if config.openai.api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; title and description generation will fail");
        }
        if config.replicate.api_token.is_none() {
            tracing::warn!("REPLICATE_API_TOKEN not set; image enhancement will fail");
        }

        Ok(Self::new(
            Arc::new(OpenAiClient::new(config.openai.clone())?),
            Arc::new(ReplicateClient::new(config.replicate.clone())?),
        ))
    }

    pub async fn generate_titles(&self, request: TitleRequest) -> StudioResult<TitleResponse> {
        request.validate()?;

        let prompt = prompts::title_prompt(
            &request.image_description,
            request.platform.as_deref(),
            request.keywords.as_deref(),
        );

        let completion = observed(
            "title",
            self.chat.complete(ChatRequest {
                system: prompts::TITLE_SYSTEM.to_string(),
                prompt,
                temperature: prompts::TITLE_TEMPERATURE,
                max_tokens: prompts::TITLE_MAX_TOKENS,
            }),
        )
        .await?;

        Ok(TitleResponse {
            titles: prompts::parse_titles(&completion.content),
            usage: completion.usage,
        })
    }

    pub async fn generate_description(
        &self,
        request: DescriptionRequest,
    ) -> StudioResult<DescriptionResponse> {
        request.validate()?;

        let prompt = prompts::description_prompt(
            &request.image_description,
            request.platform.as_deref(),
            request.keywords.as_deref(),
            request.tone.as_deref(),
        );

        let completion = observed(
            "description",
            self.chat.complete(ChatRequest {
                system: prompts::DESCRIPTION_SYSTEM.to_string(),
                prompt,
                temperature: prompts::DESCRIPTION_TEMPERATURE,
                max_tokens: prompts::DESCRIPTION_MAX_TOKENS,
            }),
        )
        .await?;

        Ok(DescriptionResponse {
            description: completion.content,
            usage: completion.usage,
        })
    }

    pub async fn enhance(&self, request: EnhanceRequest) -> StudioResult<EnhanceResponse> {
        request.validate()?;

        let enhanced = observed(
            "enhance",
            self.upscaler.upscale(&request.image_url, request.scale),
        )
        .await?;

        Ok(EnhanceResponse {
            enhanced_image_url: enhanced,
            original_url: request.image_url,
            scale: request.scale,
        })
    }

    /// Status of an upscaling job started earlier
    pub async fn enhance_status(&self, id: &str) -> StudioResult<PredictionStatus> {
        let id = id.trim();
        if id.is_empty() {
            return Err(StudioError::Validation("id is required".to_string()));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StudioError::Validation("id must be alphanumeric".to_string()));
        }

        observed("enhance_status", self.upscaler.prediction(id)).await
    }

    /// Enhance images one at a time; a failure is recorded and the batch moves on
    pub async fn enhance_batch(
        &self,
        request: BatchEnhanceRequest,
    ) -> StudioResult<BatchEnhanceResponse> {
        request.validate()?;

        let mut results = Vec::with_capacity(request.image_urls.len());
        for url in request.image_urls {
            let outcome = if url.trim().is_empty() {
                Err(StudioError::Validation("imageUrl is required".to_string()))
            } else {
                observed("enhance", self.upscaler.upscale(&url, request.scale)).await
            };

            match outcome {
                Ok(enhanced) => results.push(BatchEnhanceItem {
                    original_url: url,
                    enhanced_image_url: Some(enhanced),
                    error: None,
                }),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Batch enhancement item failed");
                    results.push(BatchEnhanceItem {
                        original_url: url,
                        enhanced_image_url: None,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        let succeeded = results.iter().filter(|r| r.error.is_none()).count();
        let failed = results.len() - succeeded;
        tracing::info!(succeeded, failed, "Batch enhancement finished");

        Ok(BatchEnhanceResponse {
            results,
            succeeded,
            failed,
        })
    }
}

/// Await an upstream call and record its outcome and latency
async fn observed<T>(
    endpoint: &str,
    call: impl Future<Output = StudioResult<T>>,
) -> StudioResult<T> {
    let started = Instant::now();
    let result = call.await;
    let outcome = match &result {
        Ok(_) => "success",
        Err(StudioError::UpstreamAuth(_)) => "unauthorized",
        Err(_) => "error",
    };
    metrics::record_ai_request(endpoint, outcome, started.elapsed().as_secs_f64());
    if let Err(e) = &result {
        tracing::error!(endpoint, error = %e, "AI request failed");
    }
    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ai::ChatCompletion;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Chat model that replays a canned completion and remembers the request
    pub(crate) struct FakeChat {
        pub reply: StudioResult<String>,
        pub seen: Mutex<Vec<ChatRequest>>,
    }

    impl FakeChat {
        pub fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for FakeChat {
        async fn complete(&self, request: ChatRequest) -> StudioResult<ChatCompletion> {
            self.seen.lock().unwrap().push(request);
            match &self.reply {
                Ok(text) => Ok(ChatCompletion {
                    content: text.clone(),
                    usage: Some(Usage {
                        prompt_tokens: 5,
                        completion_tokens: 7,
                        total_tokens: 12,
                    }),
                }),
                Err(StudioError::UpstreamAuth(m)) => Err(StudioError::UpstreamAuth(m.clone())),
                Err(e) => Err(StudioError::Upstream(e.to_string())),
            }
        }
    }

    /// Upscaler that fails for URLs containing "broken"
    pub(crate) struct FakeUpscaler;

    #[async_trait]
    impl ImageUpscaler for FakeUpscaler {
        async fn upscale(&self, image_url: &str, scale: u32) -> StudioResult<String> {
            if image_url.contains("broken") {
                return Err(StudioError::Upstream("Image enhancement failed".to_string()));
            }
            Ok(format!("{}?x{}", image_url, scale))
        }

        async fn prediction(&self, id: &str) -> StudioResult<PredictionStatus> {
            Ok(PredictionStatus {
                status: "succeeded".to_string(),
                output: Some(serde_json::json!(format!("https://cdn/{}.png", id))),
                error: None,
            })
        }
    }

    pub(crate) fn fake_gateway(reply: &str) -> AiGateway {
        AiGateway::new(Arc::new(FakeChat::replying(reply)), Arc::new(FakeUpscaler))
    }

    #[tokio::test]
    async fn test_titles_are_split_and_numbering_removed() {
        let chat = Arc::new(FakeChat::replying("1. Dawn Patrol\n2. Coffee First\n\n3) Lazy Sunday"));
        let gateway = AiGateway::new(chat.clone(), Arc::new(FakeUpscaler));

        let response = gateway
            .generate_titles(TitleRequest {
                image_description: "a dog on a beach".to_string(),
                platform: Some("youtube".to_string()),
                keywords: None,
            })
            .await
            .unwrap();

        assert_eq!(response.titles, vec!["Dawn Patrol", "Coffee First", "Lazy Sunday"]);
        assert_eq!(response.usage.unwrap().total_tokens, 12);

        let seen = chat.seen.lock().unwrap();
        assert_eq!(seen[0].max_tokens, prompts::TITLE_MAX_TOKENS);
        assert!(seen[0].prompt.contains("a dog on a beach"));
    }

    #[tokio::test]
    async fn test_missing_description_is_rejected_before_upstream() {
        let chat = Arc::new(FakeChat::replying("unused"));
        let gateway = AiGateway::new(chat.clone(), Arc::new(FakeUpscaler));

        let err = gateway
            .generate_description(DescriptionRequest {
                image_description: String::new(),
                platform: None,
                keywords: None,
                tone: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StudioError::Validation(ref m) if m.contains("imageDescription is required")));
        assert!(chat.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upstream_auth_failure_propagates() {
        let chat = FakeChat {
            reply: Err(StudioError::UpstreamAuth("OpenAI API key is invalid".to_string())),
            seen: Mutex::new(Vec::new()),
        };
        let gateway = AiGateway::new(Arc::new(chat), Arc::new(FakeUpscaler));

        let err = gateway
            .generate_description(DescriptionRequest {
                image_description: "sunset".to_string(),
                platform: None,
                keywords: None,
                tone: Some("casual".to_string()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StudioError::UpstreamAuth(_)));
    }

    #[tokio::test]
    async fn test_enhance_defaults_and_scale_bounds() {
        let gateway = fake_gateway("");

        let request: EnhanceRequest =
            serde_json::from_str(r#"{"imageUrl":"https://cdn/in.png"}"#).unwrap();
        assert_eq!(request.scale, 2);

        let response = gateway.enhance(request).await.unwrap();
        assert_eq!(response.enhanced_image_url, "https://cdn/in.png?x2");
        assert_eq!(response.original_url, "https://cdn/in.png");

        let err = gateway
            .enhance(EnhanceRequest {
                image_url: "https://cdn/in.png".to_string(),
                scale: 8,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));

        let request: EnhanceRequest = serde_json::from_str("{}").unwrap();
        assert!(gateway.enhance(request).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_continues_past_failures() {
        let gateway = fake_gateway("");

        let response = gateway
            .enhance_batch(BatchEnhanceRequest {
                image_urls: vec![
                    "https://cdn/a.png".to_string(),
                    "https://cdn/broken.png".to_string(),
                    "https://cdn/c.png".to_string(),
                ],
                scale: 3,
            })
            .await
            .unwrap();

        assert_eq!(response.succeeded, 2);
        assert_eq!(response.failed, 1);
        assert_eq!(response.results.len(), 3);
        assert_eq!(
            response.results[2].enhanced_image_url.as_deref(),
            Some("https://cdn/c.png?x3")
        );
        assert!(response.results[1].error.is_some());
    }

    #[tokio::test]
    async fn test_enhance_status_requires_id() {
        let gateway = fake_gateway("");
        assert!(matches!(
            gateway.enhance_status("  ").await,
            Err(StudioError::Validation(_))
        ));
        assert!(matches!(
            gateway.enhance_status("../account").await,
            Err(StudioError::Validation(_))
        ));
        let status = gateway.enhance_status("p1").await.unwrap();
        assert_eq!(status.status, "succeeded");
    }
}
