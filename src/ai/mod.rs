/// AI helpers: title/description drafting and image upscaling
///
/// Providers sit behind [`ChatModel`] and [`ImageUpscaler`] so the gateway
/// can be exercised without network access.

pub mod gateway;
pub mod openai;
pub mod prompts;
pub mod replicate;

pub use gateway::{
    AiGateway, BatchEnhanceItem, BatchEnhanceRequest, BatchEnhanceResponse, DescriptionRequest,
    DescriptionResponse, EnhanceRequest, EnhanceResponse, TitleRequest, TitleResponse,
};
pub use openai::OpenAiClient;
pub use replicate::ReplicateClient;

use crate::error::StudioResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One chat completion call
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub content: String,
    pub usage: Option<Usage>,
}

/// Text generation backend
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> StudioResult<ChatCompletion>;
}

/// State of an asynchronous upscaling job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionStatus {
    pub status: String,
    #[serde(default)]
    pub output: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Image upscaling backend
#[async_trait]
pub trait ImageUpscaler: Send + Sync {
    /// Upscale the image at `image_url`, returning the enhanced image URL
    async fn upscale(&self, image_url: &str, scale: u32) -> StudioResult<String>;

    /// Look up a job started earlier
    async fn prediction(&self, id: &str) -> StudioResult<PredictionStatus>;
}

/// Best-effort human message from a provider's error body
pub(crate) fn upstream_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let message = value
        .pointer("/error/message")
        .or_else(|| value.get("error").filter(|e| e.is_string()))
        .or_else(|| value.get("detail"))
        .and_then(|m| m.as_str())?;
    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}
