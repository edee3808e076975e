/// Publish store: the task collection and queries over it
use crate::{
    error::{StudioError, StudioResult},
    metrics,
    publish::models::{PublishStatus, PublishTask, TaskPatch, TaskStats},
};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;

/// Immutable snapshot of the task collection
#[derive(Debug, Clone, Default)]
pub struct PublishState {
    pub tasks: Vec<PublishTask>,
}

impl PublishState {
    pub fn get_task_by_id(&self, id: &str) -> Option<&PublishTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_tasks_by_status(&self, status: PublishStatus) -> Vec<&PublishTask> {
        self.tasks.iter().filter(|t| t.status == status).collect()
    }

    /// Tasks waiting for a future publish time
    pub fn get_scheduled_tasks(&self) -> Vec<&PublishTask> {
        self.tasks.iter().filter(|t| t.is_future_scheduled()).collect()
    }

    /// Queue view: optional status filter, latest publish time first
    pub fn queue(&self, status: Option<PublishStatus>) -> Vec<&PublishTask> {
        let mut tasks = match status {
            Some(status) => self.get_tasks_by_status(status),
            None => self.tasks.iter().collect(),
        };
        tasks.sort_by(|a, b| b.publish_time.cmp(&a.publish_time));
        tasks
    }

    pub fn stats(&self) -> TaskStats {
        let mut stats = TaskStats {
            total: self.tasks.len(),
            by_status: PublishStatus::ALL.iter().map(|s| (*s, 0)).collect(),
        };
        for task in &self.tasks {
            *stats.by_status.entry(task.status).or_insert(0) += 1;
        }
        stats
    }
}

/// Owner of the publish tasks
///
/// Mirrors the image store: copy-on-write snapshots published through a
/// watch channel.
pub struct PublishStore {
    state: watch::Sender<Arc<PublishState>>,
}

impl Default for PublishStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PublishStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(PublishState::default()));
        Self { state }
    }

    pub fn snapshot(&self) -> Arc<PublishState> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PublishState>> {
        self.state.subscribe()
    }

    fn update(&self, f: impl FnOnce(&mut PublishState) -> bool) -> Arc<PublishState> {
        let mut published = None;
        self.state.send_if_modified(|current| {
            let mut next = PublishState::clone(current);
            let changed = f(&mut next);
            if changed {
                record_task_gauges(&next);
                *current = Arc::new(next);
            }
            published = Some(Arc::clone(current));
            changed
        });
        published.unwrap_or_else(|| self.snapshot())
    }

    /// Append a fully-formed task; validation happens at the creation boundary
    pub fn add_task(&self, task: PublishTask) -> Arc<PublishState> {
        tracing::info!(task_id = %task.id, status = %task.status, "adding publish task");
        self.update(|state| {
            state.tasks.push(task);
            true
        })
    }

    /// Merge fields into a task and refresh `updated_at`
    ///
    /// Unknown ids are ignored silently. Any status is accepted.
    pub fn update_task(&self, id: &str, patch: TaskPatch) -> Arc<PublishState> {
        self.update(|state| match state.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.apply(patch, Utc::now());
                true
            }
            None => {
                tracing::debug!(task_id = %id, "update for unknown task ignored");
                false
            }
        })
    }

    /// Swap in an edited task, keeping its position in the collection
    pub fn replace_task(&self, task: PublishTask) -> Arc<PublishState> {
        self.update(|state| match state.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => {
                *existing = task;
                true
            }
            None => false,
        })
    }

    /// Cancel a draft or scheduled task
    pub fn cancel_task(&self, id: &str) -> StudioResult<Arc<PublishState>> {
        let mut outcome = Ok(());
        let state = self.update(|state| {
            let Some(task) = state.tasks.iter_mut().find(|t| t.id == id) else {
                outcome = Err(StudioError::NotFound(format!("Task not found: {}", id)));
                return false;
            };
            if !task.status.can_transition_to(PublishStatus::Cancelled) {
                outcome = Err(StudioError::Conflict(format!(
                    "Task {} is {} and cannot be cancelled",
                    id, task.status
                )));
                return false;
            }
            task.apply(TaskPatch::status(PublishStatus::Cancelled), Utc::now());
            true
        });
        outcome.map(|_| state)
    }

    pub fn remove_task(&self, id: &str) -> Arc<PublishState> {
        self.update(|state| {
            let before = state.tasks.len();
            state.tasks.retain(|t| t.id != id);
            state.tasks.len() != before
        })
    }

    pub fn clear_tasks(&self) -> Arc<PublishState> {
        self.update(|state| {
            let changed = !state.tasks.is_empty();
            state.tasks.clear();
            changed
        })
    }
}

fn record_task_gauges(state: &PublishState) {
    for (status, count) in state.stats().by_status {
        metrics::PUBLISH_TASKS
            .with_label_values(&[status.as_str()])
            .set(count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::Platform;
    use chrono::{DateTime, Duration};

    fn task(id: &str, status: PublishStatus, is_immediate: bool) -> PublishTask {
        let now = Utc::now();
        PublishTask {
            id: id.to_string(),
            title: format!("Title {}", id),
            description: "Body".to_string(),
            platforms: vec![Platform::Youtube],
            image_ids: vec!["img1".to_string()],
            publish_time: now,
            is_immediate,
            status,
            created_at: now,
            updated_at: now,
            published_at: None,
            error: None,
            platform_results: None,
        }
    }

    fn at(task: PublishTask, publish_time: DateTime<Utc>) -> PublishTask {
        PublishTask { publish_time, ..task }
    }

    #[test]
    fn test_update_missing_task_is_silent_noop() {
        let store = PublishStore::new();
        store.add_task(task("t1", PublishStatus::Scheduled, true));
        let before = store.snapshot();

        let after = store.update_task("missing-id", TaskPatch::status(PublishStatus::Cancelled));
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(after.tasks, before.tasks);
    }

    #[test]
    fn test_update_merges_and_refreshes_updated_at() {
        let store = PublishStore::new();
        let original = task("t1", PublishStatus::Scheduled, true);
        let old_updated = original.updated_at - Duration::seconds(10);
        store.add_task(PublishTask {
            updated_at: old_updated,
            ..original
        });

        let patch = TaskPatch {
            title: Some("New title".to_string()),
            ..Default::default()
        };
        let state = store.update_task("t1", patch);
        let updated = state.get_task_by_id("t1").unwrap();
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.description, "Body");
        assert!(updated.updated_at > old_updated);
    }

    #[test]
    fn test_update_accepts_any_status() {
        let store = PublishStore::new();
        store.add_task(task("t1", PublishStatus::Published, true));
        let state = store.update_task("t1", TaskPatch::status(PublishStatus::Draft));
        assert_eq!(state.get_task_by_id("t1").unwrap().status, PublishStatus::Draft);
    }

    #[test]
    fn test_get_tasks_by_status_is_exact_subset() {
        let store = PublishStore::new();
        for (i, status) in PublishStatus::ALL.iter().enumerate() {
            store.add_task(task(&format!("a{}", i), *status, false));
            store.add_task(task(&format!("b{}", i), *status, true));
        }
        let state = store.snapshot();

        for status in PublishStatus::ALL {
            let matching = state.get_tasks_by_status(status);
            let expected = state.tasks.iter().filter(|t| t.status == status).count();
            assert_eq!(matching.len(), expected);
            assert!(matching.iter().all(|t| t.status == status));
        }
    }

    #[test]
    fn test_scheduled_tasks_exclude_immediate() {
        let store = PublishStore::new();
        store.add_task(task("future", PublishStatus::Scheduled, false));
        store.add_task(task("now", PublishStatus::Scheduled, true));
        store.add_task(task("draft", PublishStatus::Draft, false));

        let state = store.snapshot();
        let ids: Vec<&str> = state.get_scheduled_tasks().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["future"]);
    }

    #[test]
    fn test_cancel_enforces_lifecycle() {
        let store = PublishStore::new();
        store.add_task(task("draft", PublishStatus::Draft, true));
        store.add_task(task("done", PublishStatus::Published, true));

        let state = store.cancel_task("draft").unwrap();
        assert_eq!(state.get_task_by_id("draft").unwrap().status, PublishStatus::Cancelled);

        assert!(matches!(store.cancel_task("done"), Err(StudioError::Conflict(_))));
        assert!(matches!(store.cancel_task("draft"), Err(StudioError::Conflict(_))));
        assert!(matches!(store.cancel_task("ghost"), Err(StudioError::NotFound(_))));
    }

    #[test]
    fn test_queue_sorted_latest_first_with_filter() {
        let store = PublishStore::new();
        let now = Utc::now();
        store.add_task(at(task("old", PublishStatus::Scheduled, false), now - Duration::hours(2)));
        store.add_task(at(task("new", PublishStatus::Scheduled, false), now + Duration::hours(2)));
        store.add_task(at(task("mid", PublishStatus::Draft, false), now));

        let state = store.snapshot();
        let all: Vec<&str> = state.queue(None).iter().map(|t| t.id.as_str()).collect();
        assert_eq!(all, vec!["new", "mid", "old"]);

        let scheduled: Vec<&str> = state
            .queue(Some(PublishStatus::Scheduled))
            .iter()
            .map(|t| t.id.as_str())
            .collect();
        assert_eq!(scheduled, vec!["new", "old"]);
    }

    #[test]
    fn test_stats_count_every_status() {
        let store = PublishStore::new();
        store.add_task(task("a", PublishStatus::Scheduled, true));
        store.add_task(task("b", PublishStatus::Scheduled, false));
        store.add_task(task("c", PublishStatus::Failed, true));

        let stats = store.snapshot().stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_status[&PublishStatus::Scheduled], 2);
        assert_eq!(stats.by_status[&PublishStatus::Failed], 1);
        assert_eq!(stats.by_status[&PublishStatus::Draft], 0);
        assert_eq!(stats.by_status.len(), 6);
    }

    #[test]
    fn test_remove_replace_and_clear() {
        let store = PublishStore::new();
        store.add_task(task("a", PublishStatus::Draft, true));
        store.add_task(task("b", PublishStatus::Draft, true));

        let mut edited = task("a", PublishStatus::Scheduled, true);
        edited.title = "Edited".to_string();
        let state = store.replace_task(edited);
        assert_eq!(state.tasks[0].title, "Edited");

        let state = store.remove_task("a");
        assert_eq!(state.tasks.len(), 1);
        assert!(state.get_task_by_id("a").is_none());

        let state = store.clear_tasks();
        assert!(state.tasks.is_empty());
    }
}
