/// Uploaded images, selection and watermarked renders
use crate::{
    context::AppContext,
    error::{StudioError, StudioResult},
    images::{
        models::{ImageState, ProcessedImage, UploadedImage},
        export_archive,
        upload::{decode_data_url, validate_upload},
    },
};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Build image routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/images",
            get(list_images).post(upload_image).delete(clear_images),
        )
        .route("/api/images/export", get(export_images))
        .route("/api/images/:id", get(get_image).delete(remove_image))
        .route("/api/images/:id/raw", get(get_raw_image))
        .route(
            "/api/images/:id/processed",
            get(get_processed_image).post(add_processed_image),
        )
        .route(
            "/api/images/:id/select",
            post(select_image).delete(deselect_image),
        )
        .route("/api/selection", delete(clear_selection))
        .route("/api/selection/all", post(select_all_images))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportParams {
    #[serde(default)]
    pub include_original: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageListResponse {
    pub images: Vec<UploadedImage>,
    pub selected_images: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub selected_images: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedImageInput {
    pub data_url: String,
}

impl From<&ImageState> for ImageListResponse {
    fn from(state: &ImageState) -> Self {
        Self {
            images: state.images.clone(),
            selected_images: state.selected.iter().cloned().collect(),
        }
    }
}

impl From<&ImageState> for SelectionResponse {
    fn from(state: &ImageState) -> Self {
        Self {
            selected_images: state.selected.iter().cloned().collect(),
        }
    }
}

fn binary_response(mime_type: &str, data: Bytes) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime_type.to_string()),
            (header::CACHE_CONTROL, "private, max-age=3600".to_string()),
        ],
        data,
    )
        .into_response()
}

async fn list_images(State(ctx): State<AppContext>) -> Json<ImageListResponse> {
    Json(ImageListResponse::from(ctx.images.snapshot().as_ref()))
}

/// Upload one image
///
/// Accepts raw binary data in the request body with a Content-Type header;
/// the file name comes from `?name=`.
async fn upload_image(
    State(ctx): State<AppContext>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> StudioResult<impl IntoResponse> {
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
        .unwrap_or_default();

    let name = params
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "untitled".to_string());

    let dimensions = validate_upload(&name, &mime_type, &body, ctx.config.uploads.max_upload_bytes)
        .map_err(|e| {
            tracing::info!(name = %name, error = %e, "Upload rejected");
            e
        })?;

    let image = UploadedImage::new(name, mime_type, body).with_dimensions(dimensions);
    tracing::info!(id = %image.id, name = %image.name, size = image.size, "Image uploaded");

    ctx.images.add_images(vec![image.clone()]);

    Ok((StatusCode::CREATED, Json(image)))
}

/// Zip the selected images, or all of them, with their watermarked renders
async fn export_images(
    State(ctx): State<AppContext>,
    Query(params): Query<ExportParams>,
) -> StudioResult<Response> {
    let state = ctx.images.snapshot();
    let archive = export_archive(&state, params.include_original)?;
    tracing::info!(
        bytes = archive.len(),
        include_original = params.include_original,
        "Images exported"
    );

    let file_name = format!("watermarked-images-{}.zip", Utc::now().timestamp_millis());
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        archive,
    )
        .into_response())
}

async fn clear_images(State(ctx): State<AppContext>) -> StatusCode {
    ctx.images.clear_images();
    StatusCode::NO_CONTENT
}

async fn get_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> StudioResult<Json<UploadedImage>> {
    ctx.images
        .snapshot()
        .image(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| StudioError::NotFound(format!("Image not found: {}", id)))
}

async fn remove_image(State(ctx): State<AppContext>, Path(id): Path<String>) -> StatusCode {
    ctx.images.remove_image(&id);
    StatusCode::NO_CONTENT
}

async fn get_raw_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> StudioResult<Response> {
    let state = ctx.images.snapshot();
    let image = state
        .image(&id)
        .ok_or_else(|| StudioError::NotFound(format!("Image not found: {}", id)))?;

    Ok(binary_response(&image.mime_type, image.data.clone()))
}

async fn get_processed_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> StudioResult<Response> {
    let state = ctx.images.snapshot();
    let processed = state
        .processed_image(&id)
        .ok_or_else(|| StudioError::NotFound(format!("No watermarked render for image {}", id)))?;

    Ok(binary_response(&processed.mime_type, processed.data.clone()))
}

/// Record the watermarked render the editor exported for an image
async fn add_processed_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(input): Json<ProcessedImageInput>,
) -> StudioResult<Json<UploadedImage>> {
    if ctx.images.snapshot().image(&id).is_none() {
        return Err(StudioError::NotFound(format!("Image not found: {}", id)));
    }

    let (mime_type, data) = decode_data_url(&input.data_url)?;
    if data.len() > ctx.config.uploads.max_upload_bytes {
        return Err(StudioError::PayloadTooLarge(
            "rendered image exceeds the upload limit".to_string(),
        ));
    }

    let state = ctx.images.add_processed_image(
        &id,
        ProcessedImage {
            data: Bytes::from(data),
            mime_type,
            rendered_at: Utc::now(),
        },
    );

    // The image may have been removed between the check and the write
    state
        .image(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| StudioError::NotFound(format!("Image not found: {}", id)))
}

async fn select_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> StudioResult<Json<SelectionResponse>> {
    if ctx.images.snapshot().image(&id).is_none() {
        return Err(StudioError::NotFound(format!("Image not found: {}", id)));
    }

    let state = ctx.images.select_image(&id);
    Ok(Json(SelectionResponse::from(state.as_ref())))
}

async fn deselect_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> Json<SelectionResponse> {
    let state = ctx.images.deselect_image(&id);
    Json(SelectionResponse::from(state.as_ref()))
}

async fn select_all_images(State(ctx): State<AppContext>) -> Json<SelectionResponse> {
    let state = ctx.images.select_all_images();
    Json(SelectionResponse::from(state.as_ref()))
}

async fn clear_selection(State(ctx): State<AppContext>) -> Json<SelectionResponse> {
    let state = ctx.images.clear_selection();
    Json(SelectionResponse::from(state.as_ref()))
}
