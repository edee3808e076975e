/// Publish task data models
use crate::platforms::Platform;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Lifecycle state of a publish task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Draft,
    Scheduled,
    Publishing,
    Published,
    Failed,
    Cancelled,
}

impl PublishStatus {
    pub const ALL: [PublishStatus; 6] = [
        PublishStatus::Draft,
        PublishStatus::Scheduled,
        PublishStatus::Publishing,
        PublishStatus::Published,
        PublishStatus::Failed,
        PublishStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Scheduled => "scheduled",
            PublishStatus::Publishing => "publishing",
            PublishStatus::Published => "published",
            PublishStatus::Failed => "failed",
            PublishStatus::Cancelled => "cancelled",
        }
    }

    /// No transition leaves a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PublishStatus::Published | PublishStatus::Failed | PublishStatus::Cancelled
        )
    }

    /// Whether the declared lifecycle allows moving from `self` to `next`
    ///
    /// `PublishStore::update_task` does not consult this; callers that want
    /// the lifecycle enforced go through `PublishStore::cancel_task` or check
    /// here first.
    pub fn can_transition_to(&self, next: PublishStatus) -> bool {
        use PublishStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (Draft, Scheduled)
                | (Draft, Cancelled)
                | (Scheduled, Cancelled)
                | (Scheduled, Publishing)
                | (Publishing, Published)
                | (Publishing, Failed)
        )
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PublishStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PublishStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Unknown publish status: {}", s))
    }
}

/// Outcome of publishing to one platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A request to publish content to one or more platforms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishTask {
    pub id: String,
    pub title: String,
    pub description: String,
    pub platforms: Vec<Platform>,
    pub image_ids: Vec<String>,
    pub publish_time: DateTime<Utc>,
    pub is_immediate: bool,
    pub status: PublishStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_results: Option<BTreeMap<Platform, PlatformResult>>,
}

impl PublishTask {
    /// Scheduled for a future instant rather than "publish now"
    pub fn is_future_scheduled(&self) -> bool {
        self.status == PublishStatus::Scheduled && !self.is_immediate
    }

    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(platforms) = patch.platforms {
            self.platforms = platforms;
        }
        if let Some(image_ids) = patch.image_ids {
            self.image_ids = image_ids;
        }
        if let Some(publish_time) = patch.publish_time {
            self.publish_time = publish_time;
        }
        if let Some(is_immediate) = patch.is_immediate {
            self.is_immediate = is_immediate;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(published_at) = patch.published_at {
            self.published_at = Some(published_at);
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        if let Some(platform_results) = patch.platform_results {
            self.platform_results = Some(platform_results);
        }
        self.updated_at = now;
    }
}

/// Fields merged into an existing task by `update_task`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub platforms: Option<Vec<Platform>>,
    pub image_ids: Option<Vec<String>>,
    pub publish_time: Option<DateTime<Utc>>,
    pub is_immediate: Option<bool>,
    pub status: Option<PublishStatus>,
    pub published_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub platform_results: Option<BTreeMap<Platform, PlatformResult>>,
}

impl TaskPatch {
    pub fn status(status: PublishStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

/// Task counts per status, plus the total
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub by_status: BTreeMap<PublishStatus, usize>,
}
