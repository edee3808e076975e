/// Application context and dependency injection
use crate::{
    ai::AiGateway,
    config::ServerConfig,
    error::StudioResult,
    images::ImageStore,
    publish::PublishStore,
    rate_limit::RateLimiter,
};
use std::{sync::Arc, time::Instant};

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub images: Arc<ImageStore>,
    pub publish: Arc<PublishStore>,
    pub ai: Arc<AiGateway>,
    // Rate limiter
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppContext {
    /// Create a new application context from configuration
    pub fn new(config: ServerConfig) -> StudioResult<Self> {
        // Validate configuration
        config.validate()?;

        let ai = AiGateway::from_config(&config)?;
        Ok(Self::with_gateway(config, ai))
    }

    /// Context with a caller-supplied AI gateway
    pub fn with_gateway(config: ServerConfig, ai: AiGateway) -> Self {
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        tracing::debug!(
            max_upload_bytes = config.uploads.max_upload_bytes,
            rate_limits = config.rate_limit.enabled,
            "Application context ready"
        );

        Self {
            config: Arc::new(config),
            images: Arc::new(ImageStore::new()),
            publish: Arc::new(PublishStore::new()),
            ai: Arc::new(ai),
            rate_limiter: Arc::new(rate_limiter),
            started_at: Instant::now(),
        }
    }

    /// Get the public service address
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
