/// Replicate predictions client for Real-ESRGAN upscaling
use crate::{
    ai::{upstream_message, ImageUpscaler, PredictionStatus},
    config::ReplicateConfig,
    error::{StudioError, StudioResult},
};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Serialize)]
struct PredictionBody<'a> {
    version: &'a str,
    input: EnhanceInput<'a>,
}

#[derive(Debug, Serialize)]
struct EnhanceInput<'a> {
    image: &'a str,
    scale: u32,
    face_enhance: bool,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl Prediction {
    fn is_finished(&self) -> bool {
        matches!(self.status.as_str(), "succeeded" | "failed" | "canceled")
    }
}

/// Output is either a single URL or a list of URLs; the first one wins
fn output_url(output: Option<&serde_json::Value>) -> Option<String> {
    match output? {
        serde_json::Value::String(url) => Some(url.clone()),
        serde_json::Value::Array(items) => items.first()?.as_str().map(String::from),
        _ => None,
    }
}

fn error_text(error: Option<&serde_json::Value>) -> Option<String> {
    match error? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Image upscaler backed by the Replicate API
#[derive(Clone)]
pub struct ReplicateClient {
    http_client: reqwest::Client,
    config: ReplicateConfig,
}

impl ReplicateClient {
    pub fn new(config: ReplicateConfig) -> StudioResult<Self> {
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

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// `{base}/predictions/{id}` with the id pushed as one encoded segment
    fn prediction_url(&self, id: &str) -> StudioResult<Url> {
        let mut url = Url::parse(&self.config.base_url).map_err(|e| {
            StudioError::Internal(format!("Invalid Replicate base URL: {}", e))
        })?;
        url.path_segments_mut()
            .map_err(|_| StudioError::Internal("Replicate base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(["predictions", id]);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> StudioResult<RequestBuilder> {
        let token = self.config.api_token.as_deref().ok_or_else(|| {
            StudioError::Upstream("REPLICATE_API_TOKEN is not configured".to_string())
        })?;
        Ok(request.bearer_auth(token))
    }

    async fn read_prediction(response: Response) -> StudioResult<Prediction> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(StudioError::UpstreamAuth(
                "Replicate API token is invalid".to_string(),
            ));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Replicate returned an error");
            return Err(StudioError::Upstream(
                upstream_message(&text)
                    .unwrap_or_else(|| format!("Replicate returned error: {}", status)),
            ));
        }

        response
            .json()
            .await
            .map_err(|e| StudioError::Upstream(format!("Invalid Replicate response: {}", e)))
    }

    async fn fetch(&self, id: &str) -> StudioResult<Prediction> {
        let request = self.authorized(self.http_client.get(self.prediction_url(id)?))?;
        let response = request
            .send()
            .await
            .map_err(|e| StudioError::Upstream(format!("Replicate request failed: {}", e)))?;

        Self::read_prediction(response).await
    }
}

#[async_trait]
impl ImageUpscaler for ReplicateClient {
    async fn upscale(&self, image_url: &str, scale: u32) -> StudioResult<String> {
        let body = PredictionBody {
            version: &self.config.enhance_version,
            input: EnhanceInput {
                image: image_url,
                scale,
                face_enhance: false,
            },
        };

        let request = self.authorized(self.http_client.post(self.url("/predictions")))?;
        let response = request
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| StudioError::Upstream(format!("Replicate request failed: {}", e)))?;

        let mut prediction = Self::read_prediction(response).await?;

        // `Prefer: wait` may still hand back a running prediction
        let deadline = Instant::now() + Duration::from_secs(self.config.timeout_secs);
        while !prediction.is_finished() {
            if Instant::now() >= deadline {
                return Err(StudioError::Upstream(format!(
                    "Image enhancement timed out (prediction {})",
                    prediction.id
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
            prediction = self.fetch(&prediction.id).await?;
        }

        if prediction.status != "succeeded" {
            return Err(StudioError::Upstream(
                error_text(prediction.error.as_ref())
                    .unwrap_or_else(|| "Image enhancement failed".to_string()),
            ));
        }

        tracing::debug!(id = %prediction.id, "Replicate prediction succeeded");

        output_url(prediction.output.as_ref()).ok_or_else(|| {
            StudioError::Upstream("Image enhancement returned no output".to_string())
        })
    }

    async fn prediction(&self, id: &str) -> StudioResult<PredictionStatus> {
        let prediction = self.fetch(id).await?;
        Ok(PredictionStatus {
            status: prediction.status,
            output: prediction.output,
            error: prediction.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use serde_json::json;

    #[test]
    fn test_output_url_accepts_string_or_list() {
        assert_eq!(
            output_url(Some(&json!("https://cdn/x.png"))),
            Some("https://cdn/x.png".to_string())
        );
        assert_eq!(
            output_url(Some(&json!(["https://cdn/a.png", "https://cdn/b.png"]))),
            Some("https://cdn/a.png".to_string())
        );
        assert_eq!(output_url(Some(&json!([]))), None);
        assert_eq!(output_url(Some(&json!(42))), None);
        assert_eq!(output_url(None), None);
    }

    #[test]
    fn test_prediction_body_disables_face_enhance() {
        let body = PredictionBody {
            version: "abc",
            input: EnhanceInput {
                image: "https://cdn/in.png",
                scale: 4,
                face_enhance: false,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["input"]["face_enhance"], false);
        assert_eq!(value["input"]["scale"], 4);
        assert_eq!(value["version"], "abc");
    }

    #[test]
    fn test_finished_statuses() {
        let mut p: Prediction =
            serde_json::from_value(json!({"id": "p1", "status": "processing"})).unwrap();
        assert!(!p.is_finished());
        for status in ["succeeded", "failed", "canceled"] {
            p.status = status.to_string();
            assert!(p.is_finished());
        }
    }

    #[test]
    fn test_error_text() {
        assert_eq!(error_text(Some(&json!(null))), None);
        assert_eq!(error_text(Some(&json!("CUDA OOM"))), Some("CUDA OOM".to_string()));
    }

    #[test]
    fn test_prediction_url_keeps_id_in_one_segment() {
        let client = ReplicateClient::new(ServerConfig::default().replicate).unwrap();

        let url = client.prediction_url("abc123").unwrap();
        assert_eq!(url.as_str(), "https://api.replicate.com/v1/predictions/abc123");

        let url = client.prediction_url("../account").unwrap();
        assert!(url.path().starts_with("/v1/predictions/"));
        assert_eq!(url.path_segments().unwrap().count(), 3);
    }

    #[tokio::test]
    async fn test_missing_token_is_reported() {
        let client = ReplicateClient::new(ServerConfig::default().replicate).unwrap();
        let err = client.upscale("https://cdn/in.png", 2).await.unwrap_err();
        assert_eq!(err.to_string(), "REPLICATE_API_TOKEN is not configured");

        let err = client.prediction("p1").await.unwrap_err();
        assert!(matches!(err, StudioError::Upstream(_)));
    }
}
