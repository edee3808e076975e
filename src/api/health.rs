/// Health and metrics endpoints
///
/// `/health` reports "degraded" while an AI provider has no credential; the
/// stores keep serving, only the matching AI endpoints fail.
use crate::{context::AppContext, error::StudioResult, metrics};
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

/// Health status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Overall status: "healthy" or "degraded"
    pub status: String,

    /// Application version
    pub version: String,

    /// Uptime in seconds
    pub uptime_seconds: f64,

    /// Individual component checks
    pub checks: Vec<ComponentHealth>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health status of individual component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,

    /// Status: "healthy" or "degraded"
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Build health and metrics routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
}

/// Always 200; a degraded service still serves the stores
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthStatus> {
    let checks = vec![
        check_stores(&ctx),
        check_credential("openai", ctx.config.openai.api_key.is_some(), "OPENAI_API_KEY"),
        check_credential(
            "replicate",
            ctx.config.replicate.api_token.is_some(),
            "REPLICATE_API_TOKEN",
        ),
    ];

    let overall_status = determine_overall_status(&checks);

    let uptime = ctx.started_at.elapsed().as_secs_f64();
    metrics::UPTIME_SECONDS.set(uptime);

    let health = HealthStatus {
        status: overall_status.clone(),
        version: ctx.config.service.version.clone(),
        uptime_seconds: uptime,
        checks,
        message: if overall_status == "healthy" {
            None
        } else {
            Some("One or more components are not fully available".to_string())
        },
    };

    Json(health)
}

/// Prometheus scrape endpoint
pub async fn prometheus_metrics(State(ctx): State<AppContext>) -> StudioResult<impl IntoResponse> {
    metrics::UPTIME_SECONDS.set(ctx.started_at.elapsed().as_secs_f64());
    let body = metrics::render_metrics()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

fn check_stores(ctx: &AppContext) -> ComponentHealth {
    let images = ctx.images.snapshot();
    let tasks = ctx.publish.snapshot();

    ComponentHealth {
        name: "stores".to_string(),
        status: "healthy".to_string(),
        error: None,
        details: Some(serde_json::json!({
            "images": images.images.len(),
            "templates": images.templates.len(),
            "tasks": tasks.tasks.len(),
        })),
    }
}

fn check_credential(name: &str, configured: bool, variable: &str) -> ComponentHealth {
    ComponentHealth {
        name: name.to_string(),
        status: if configured { "healthy" } else { "degraded" }.to_string(),
        error: (!configured).then(|| format!("{} is not configured", variable)),
        details: None,
    }
}

/// Determine overall health status from individual checks
fn determine_overall_status(checks: &[ComponentHealth]) -> String {
    if checks.iter().any(|c| c.status == "degraded") {
        "degraded".to_string()
    } else {
        "healthy".to_string()
    }
}
