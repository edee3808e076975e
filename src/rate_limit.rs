/// Rate Limiting System
///
/// AI routes proxy to paid upstreams, so they share one quota.
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{StudioError, StudioResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

const DEFAULT_AI_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(30) {
    Some(n) => n,
    None => unreachable!(),
};

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    ai: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_minute =
            NonZeroU32::new(config.ai_requests_per_minute).unwrap_or(DEFAULT_AI_PER_MINUTE);

        Self {
            enabled: config.enabled,
            ai: Arc::new(GovernorLimiter::direct(Quota::per_minute(per_minute))),
        }
    }

    /// Check the shared AI quota
    pub fn check_ai(&self) -> StudioResult<()> {
        if !self.enabled {
            return Ok(());
        }

        match self.ai.check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                Err(StudioError::RateLimitExceeded {
                    retry_after: wait.max(Duration::from_secs(1)),
                })
            }
        }
    }
}

/// Rate limiting middleware for the AI routes
pub async fn ai_rate_limit(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, StudioError> {
    if let Err(e) = ctx.rate_limiter.check_ai() {
        tracing::warn!(path = %request.uri().path(), "AI rate limit exceeded");
        return Err(e);
    }

    Ok(next.run(request).await)
}
