/// Watermark templates and the current template
use crate::{
    context::AppContext,
    error::{StudioError, StudioResult},
    images::models::{TemplatePatch, WatermarkTemplate},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build template routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/templates", get(list_templates).post(add_template))
        .route(
            "/api/templates/current",
            get(get_current_template)
                .put(set_current_template)
                .delete(clear_current_template),
        )
        .route(
            "/api/templates/:id",
            patch(update_template).delete(remove_template),
        )
}

#[derive(Debug, Deserialize)]
pub struct NewTemplate {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "canvasJSON", alias = "canvasJson", default)]
    pub canvas_json: String,
    pub thumbnail: Option<String>,
}

/// Either an existing template id or an inline design
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CurrentTemplateInput {
    ById { id: String },
    Inline(NewTemplate),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateListResponse {
    pub templates: Vec<WatermarkTemplate>,
    pub current_template: Option<WatermarkTemplate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentTemplateResponse {
    pub current_template: Option<WatermarkTemplate>,
}

async fn list_templates(State(ctx): State<AppContext>) -> Json<TemplateListResponse> {
    let state = ctx.images.snapshot();
    Json(TemplateListResponse {
        templates: state.templates.clone(),
        current_template: state.current_template.clone(),
    })
}

/// Save a template; it also becomes the current one
async fn add_template(
    State(ctx): State<AppContext>,
    Json(input): Json<NewTemplate>,
) -> StudioResult<impl IntoResponse> {
    let template = WatermarkTemplate::new(&input.name, input.canvas_json, input.thumbnail)?;
    tracing::info!(id = %template.id, layers = template.layer_count(), "Watermark template saved");

    ctx.images.add_watermark_template(template.clone());
    Ok((StatusCode::CREATED, Json(template)))
}

async fn update_template(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(patch): Json<TemplatePatch>,
) -> StudioResult<Json<WatermarkTemplate>> {
    patch.validate()?;

    ctx.images
        .update_watermark_template(&id, &patch)
        .template(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| StudioError::NotFound(format!("Template not found: {}", id)))
}

async fn remove_template(State(ctx): State<AppContext>, Path(id): Path<String>) -> StatusCode {
    ctx.images.remove_watermark_template(&id);
    StatusCode::NO_CONTENT
}

async fn get_current_template(State(ctx): State<AppContext>) -> Json<CurrentTemplateResponse> {
    Json(CurrentTemplateResponse {
        current_template: ctx.images.snapshot().current_template.clone(),
    })
}

async fn set_current_template(
    State(ctx): State<AppContext>,
    Json(input): Json<CurrentTemplateInput>,
) -> StudioResult<Json<CurrentTemplateResponse>> {
    let template = match input {
        CurrentTemplateInput::ById { id } => ctx
            .images
            .snapshot()
            .template(&id)
            .cloned()
            .ok_or_else(|| StudioError::NotFound(format!("Template not found: {}", id)))?,
        CurrentTemplateInput::Inline(input) => {
            WatermarkTemplate::new(&input.name, input.canvas_json, input.thumbnail)?
        }
    };

    let state = ctx.images.set_watermark_template(Some(template));
    Ok(Json(CurrentTemplateResponse {
        current_template: state.current_template.clone(),
    }))
}

async fn clear_current_template(State(ctx): State<AppContext>) -> StatusCode {
    ctx.images.set_watermark_template(None);
    StatusCode::NO_CONTENT
}
