/// Publish task queue
use crate::{
    context::AppContext,
    error::{StudioError, StudioResult},
    publish::{
        image_warnings, PublishStatus, PublishTask, TaskForm, TaskPatch, TaskStats,
        TaskSubmission,
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Build task routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            "/api/tasks",
            get(list_tasks).post(create_task).delete(clear_tasks),
        )
        .route("/api/tasks/scheduled", get(scheduled_tasks))
        .route("/api/tasks/stats", get(task_stats))
        .route(
            "/api/tasks/:id",
            get(get_task)
                .patch(update_task)
                .put(edit_task)
                .delete(remove_task),
        )
        .route("/api/tasks/:id/cancel", post(cancel_task))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<PublishTask>,
    pub total: usize,
}

impl TaskListResponse {
    fn new(tasks: Vec<&PublishTask>) -> Self {
        Self {
            total: tasks.len(),
            tasks: tasks.into_iter().cloned().collect(),
        }
    }
}

fn task_not_found(id: &str) -> StudioError {
    StudioError::NotFound(format!("Task not found: {}", id))
}

/// Queue view, newest publish time first; `?status=` filters
async fn list_tasks(
    State(ctx): State<AppContext>,
    Query(params): Query<ListParams>,
) -> StudioResult<Json<TaskListResponse>> {
    let status = params
        .status
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "all")
        .map(|s| s.parse::<PublishStatus>())
        .transpose()
        .map_err(StudioError::Validation)?;

    let state = ctx.publish.snapshot();
    Ok(Json(TaskListResponse::new(state.queue(status))))
}

async fn create_task(
    State(ctx): State<AppContext>,
    Json(form): Json<TaskForm>,
) -> StudioResult<impl IntoResponse> {
    let mut submission = form.into_task(None, Utc::now())?;
    submission.image_warnings = image_warnings(&submission.task, &ctx.images.snapshot());
    if !submission.warnings.is_empty() {
        tracing::debug!(
            task_id = %submission.task.id,
            warnings = submission.warnings.len(),
            "task exceeds platform length hints"
        );
    }

    ctx.publish.add_task(submission.task.clone());
    Ok((StatusCode::CREATED, Json(submission)))
}

async fn clear_tasks(State(ctx): State<AppContext>) -> StatusCode {
    ctx.publish.clear_tasks();
    StatusCode::NO_CONTENT
}

async fn scheduled_tasks(State(ctx): State<AppContext>) -> Json<TaskListResponse> {
    let state = ctx.publish.snapshot();
    Json(TaskListResponse::new(state.get_scheduled_tasks()))
}

async fn task_stats(State(ctx): State<AppContext>) -> Json<TaskStats> {
    Json(ctx.publish.snapshot().stats())
}

async fn get_task(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> StudioResult<Json<PublishTask>> {
    ctx.publish
        .snapshot()
        .get_task_by_id(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| task_not_found(&id))
}

/// Merge fields into a task; used by the publisher to record progress
async fn update_task(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> StudioResult<Json<PublishTask>> {
    ctx.publish
        .update_task(&id, patch)
        .get_task_by_id(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| task_not_found(&id))
}

/// Resubmit the form for an existing draft or scheduled task
async fn edit_task(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Json(form): Json<TaskForm>,
) -> StudioResult<Json<TaskSubmission>> {
    let existing = ctx
        .publish
        .snapshot()
        .get_task_by_id(&id)
        .cloned()
        .ok_or_else(|| task_not_found(&id))?;

    if !matches!(existing.status, PublishStatus::Draft | PublishStatus::Scheduled) {
        return Err(StudioError::Conflict(format!(
            "Task {} is {} and can no longer be edited",
            id, existing.status
        )));
    }

    let mut submission = form.into_task(Some(&existing), Utc::now())?;
    submission.image_warnings = image_warnings(&submission.task, &ctx.images.snapshot());
    ctx.publish.replace_task(submission.task.clone());
    tracing::info!(task_id = %id, status = %submission.task.status, "publish task edited");

    Ok(Json(submission))
}

async fn remove_task(State(ctx): State<AppContext>, Path(id): Path<String>) -> StatusCode {
    ctx.publish.remove_task(&id);
    StatusCode::NO_CONTENT
}

async fn cancel_task(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> StudioResult<Json<PublishTask>> {
    ctx.publish
        .cancel_task(&id)?
        .get_task_by_id(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| task_not_found(&id))
}
