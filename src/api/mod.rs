/// API routes and handlers
pub mod ai;
pub mod events;
pub mod health;
pub mod images;
pub mod middleware;
pub mod platforms;
pub mod tasks;
pub mod templates;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes(ctx: AppContext) -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(images::routes())
        .merge(templates::routes())
        .merge(tasks::routes())
        .merge(platforms::routes())
        .merge(events::routes())
        .merge(ai::routes(ctx))
}
