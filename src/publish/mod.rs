/// Publish tasks
///
/// Tasks are created through [`TaskForm`] and held by [`PublishStore`].
/// Nothing in this service moves a task through `publishing` to
/// `published`/`failed`; that belongs to a platform publisher.
// TODO: wire a platform publisher that claims due `scheduled` tasks and records `platform_results`.

pub mod form;
pub mod models;
pub mod store;

pub use form::{image_warnings, ImageWarning, LengthWarning, TaskForm, TaskSubmission};
pub use models::*;
pub use store::{PublishState, PublishStore};
