/// Configuration management for Content Studio
use crate::error::{StudioError, StudioResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Real-ESRGAN model version used for upscaling
pub const DEFAULT_ENHANCE_VERSION: &str =
    "42fed1c4974146d4d2414e2be2c5277c7fcf05fcc3a73abf41610695738c1d7b";

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "content_studio=debug,tower_http=debug";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub uploads: UploadConfig,
    pub openai: OpenAiConfig,
    pub replicate: ReplicateConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Image upload limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes
    pub max_upload_bytes: usize,
}

/// OpenAI chat completion settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Missing key is reported per request, not at startup
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Replicate prediction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateConfig {
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    pub base_url: String,
    pub enhance_version: String,
    pub timeout_secs: u64,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub ai_requests_per_minute: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 3000,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            uploads: UploadConfig {
                max_upload_bytes: 10 * 1024 * 1024,
            },
            openai: OpenAiConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 120,
            },
            replicate: ReplicateConfig {
                api_token: None,
                base_url: "https://api.replicate.com/v1".to_string(),
                enhance_version: DEFAULT_ENHANCE_VERSION.to_string(),
                timeout_secs: 120,
            },
            rate_limit: RateLimitConfig {
                enabled: true,
                ai_requests_per_minute: 30,
            },
            logging: LoggingConfig {
                level: DEFAULT_LOG_FILTER.to_string(),
                json: false,
            },
        }
    }
}

/// Read an optional, non-empty environment variable
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> StudioResult<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let hostname = env::var("STUDIO_HOSTNAME").unwrap_or(defaults.service.hostname);
        let port = env::var("STUDIO_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| StudioError::Validation("Invalid port number".to_string()))?;
        let version = env::var("STUDIO_VERSION").unwrap_or(defaults.service.version);

        let max_upload_bytes = env::var("STUDIO_MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "10485760".to_string())
            .parse()
            .unwrap_or(defaults.uploads.max_upload_bytes);

        let ai_timeout_secs = env::var("STUDIO_AI_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".to_string())
            .parse()
            .unwrap_or(120);

        let openai = OpenAiConfig {
            api_key: non_empty_var("OPENAI_API_KEY"),
            base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai.base_url),
            model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai.model),
            timeout_secs: ai_timeout_secs,
        };

        let replicate = ReplicateConfig {
            api_token: non_empty_var("REPLICATE_API_TOKEN"),
            base_url: env::var("REPLICATE_BASE_URL").unwrap_or(defaults.replicate.base_url),
            enhance_version: env::var("REPLICATE_ENHANCE_VERSION")
                .unwrap_or(defaults.replicate.enhance_version),
            timeout_secs: ai_timeout_secs,
        };

        let rate_limit_enabled = env::var("STUDIO_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let ai_requests_per_minute = env::var("STUDIO_AI_REQUESTS_PER_MINUTE")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let log_level = env::var("RUST_LOG").unwrap_or(defaults.logging.level);
        let log_json = env::var("STUDIO_LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            uploads: UploadConfig { max_upload_bytes },
            openai,
            replicate,
            rate_limit: RateLimitConfig {
                enabled: rate_limit_enabled,
                ai_requests_per_minute,
            },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> StudioResult<()> {
        if self.service.hostname.is_empty() {
            return Err(StudioError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.uploads.max_upload_bytes == 0 {
            return Err(StudioError::Validation(
                "Upload limit must be greater than zero".to_string(),
            ));
        }

        if self.rate_limit.enabled && self.rate_limit.ai_requests_per_minute == 0 {
            return Err(StudioError::Validation(
                "AI requests per minute must be greater than zero when rate limiting is enabled"
                    .to_string(),
            ));
        }

        for url in [&self.openai.base_url, &self.replicate.base_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(StudioError::Validation(format!(
                    "Upstream base URL must be http(s): {}",
                    url
                )));
            }
        }

        Ok(())
    }
}
