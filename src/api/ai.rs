/// AI drafting and image enhancement endpoints
use crate::{
    ai::{
        BatchEnhanceRequest, BatchEnhanceResponse, DescriptionRequest, DescriptionResponse,
        EnhanceRequest, EnhanceResponse, PredictionStatus, TitleRequest, TitleResponse,
    },
    context::AppContext,
    error::StudioResult,
    rate_limit::ai_rate_limit,
};
use axum::{
    extract::{Query, State},
    middleware,
    routing::post,
    Json, Router,
};
use serde::Deserialize;

/// Build AI routes; they share the AI rate limit
pub fn routes(ctx: AppContext) -> Router<AppContext> {
    Router::new()
        .route("/api/ai/title", post(generate_title))
        .route("/api/ai/description", post(generate_description))
        .route(
            "/api/ai/enhance",
            post(enhance_image).get(enhance_status),
        )
        .route("/api/ai/enhance/batch", post(enhance_batch))
        .route_layer(middleware::from_fn_with_state(ctx, ai_rate_limit))
}

#[derive(Debug, Deserialize)]
pub struct StatusParams {
    #[serde(default)]
    pub id: String,
}

async fn generate_title(
    State(ctx): State<AppContext>,
    Json(request): Json<TitleRequest>,
) -> StudioResult<Json<TitleResponse>> {
    Ok(Json(ctx.ai.generate_titles(request).await?))
}

async fn generate_description(
    State(ctx): State<AppContext>,
    Json(request): Json<DescriptionRequest>,
) -> StudioResult<Json<DescriptionResponse>> {
    Ok(Json(ctx.ai.generate_description(request).await?))
}

async fn enhance_image(
    State(ctx): State<AppContext>,
    Json(request): Json<EnhanceRequest>,
) -> StudioResult<Json<EnhanceResponse>> {
    Ok(Json(ctx.ai.enhance(request).await?))
}

/// Poll an upscaling job by id
async fn enhance_status(
    State(ctx): State<AppContext>,
    Query(params): Query<StatusParams>,
) -> StudioResult<Json<PredictionStatus>> {
    Ok(Json(ctx.ai.enhance_status(&params.id).await?))
}

async fn enhance_batch(
    State(ctx): State<AppContext>,
    Json(request): Json<BatchEnhanceRequest>,
) -> StudioResult<Json<BatchEnhanceResponse>> {
    Ok(Json(ctx.ai.enhance_batch(request).await?))
}
