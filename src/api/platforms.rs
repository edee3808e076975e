/// Platform catalog
use crate::{
    context::AppContext,
    error::{StudioError, StudioResult},
    platforms::{all_platforms, Platform, PlatformConfig},
};
use axum::{extract::Path, routing::get, Json, Router};

/// Build platform routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/platforms", get(list_platforms))
        .route("/api/platforms/:id", get(get_platform))
}

async fn list_platforms() -> Json<&'static [PlatformConfig]> {
    Json(all_platforms())
}

async fn get_platform(Path(id): Path<String>) -> StudioResult<Json<&'static PlatformConfig>> {
    let platform: Platform = id
        .parse()
        .map_err(|_| StudioError::NotFound(format!("Platform not found: {}", id)))?;
    Ok(Json(platform.config()))
}
