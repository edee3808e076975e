/// Task creation boundary: validates form input and builds publish tasks
use crate::{
    error::{StudioError, StudioResult},
    images::ImageState,
    platforms::{char_len, Platform},
    publish::models::{PublishStatus, PublishTask},
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Real UTC offsets stay within fourteen hours either way
const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

fn default_immediate() -> bool {
    true
}

/// Raw task form as submitted by the client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub platforms: Vec<Platform>,
    #[serde(default)]
    pub image_ids: Vec<String>,
    #[serde(default = "default_immediate")]
    pub is_immediate: bool,
    /// `YYYY-MM-DD`, local to the submitter
    pub publish_date: Option<String>,
    /// `HH:MM` or `HH:MM:SS`, local to the submitter
    pub publish_time: Option<String>,
    /// Minutes east of UTC for the submitter's local time
    #[serde(default)]
    pub utc_offset_minutes: i32,
    /// Save as draft, bypassing validation
    #[serde(default)]
    pub draft: bool,
}

impl Default for TaskForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            platforms: Vec::new(),
            image_ids: Vec::new(),
            is_immediate: true,
            publish_date: None,
            publish_time: None,
            utc_offset_minutes: 0,
            draft: false,
        }
    }
}

/// A title or description longer than a selected platform allows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LengthWarning {
    pub platform: Platform,
    pub field: &'static str,
    pub limit: usize,
    pub length: usize,
}

/// An attached image a target platform will not take as-is
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageWarning {
    pub platform: Platform,
    pub image_id: String,
    pub reason: String,
}

/// Result of a successful submission
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSubmission {
    pub task: PublishTask,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LengthWarning>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_warnings: Vec<ImageWarning>,
}

/// Format and size hints for a task's images against each of its platforms
///
/// Ids the image store no longer holds are skipped.
pub fn image_warnings(task: &PublishTask, images: &ImageState) -> Vec<ImageWarning> {
    let mut warnings = Vec::new();
    for image in task.image_ids.iter().filter_map(|id| images.image(id)) {
        for platform in &task.platforms {
            let config = platform.config();
            if !config.accepts_file(&image.name) {
                warnings.push(ImageWarning {
                    platform: *platform,
                    image_id: image.id.clone(),
                    reason: format!(
                        "{} accepts {}",
                        config.name,
                        config.supported_formats.join(", ")
                    ),
                });
            }
            if !config.accepts_size(image.size) {
                warnings.push(ImageWarning {
                    platform: *platform,
                    image_id: image.id.clone(),
                    reason: format!("{} limits images to {}MB", config.name, config.max_image_size),
                });
            }
        }
    }
    warnings
}

impl TaskForm {
    /// Scheduled instant in UTC, if date and time are present and parse
    fn scheduled_at(&self) -> Result<Option<DateTime<Utc>>, (&'static str, String)> {
        let (Some(date), Some(time)) = (
            self.publish_date.as_deref().filter(|d| !d.trim().is_empty()),
            self.publish_time.as_deref().filter(|t| !t.trim().is_empty()),
        ) else {
            return Ok(None);
        };

        if !(-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&self.utc_offset_minutes) {
            return Err((
                "utcOffsetMinutes",
                format!(
                    "UTC offset must be within {} minutes",
                    MAX_UTC_OFFSET_MINUTES
                ),
            ));
        }

        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| ("publishDate", "Publish date must be YYYY-MM-DD".to_string()))?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
            .map_err(|_| ("publishTime", "Publish time must be HH:MM".to_string()))?;

        let local = date.and_time(time);
        let utc = local
            .checked_sub_signed(Duration::minutes(i64::from(self.utc_offset_minutes)))
            .ok_or(("publishDate", "Publish date is out of range".to_string()))?;
        Ok(Some(utc.and_utc()))
    }

    /// Every failing field with its message; empty when the form is valid
    pub fn validate(&self, now: DateTime<Utc>) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();

        if self.title.trim().is_empty() {
            errors.insert("title".to_string(), "Title is required".to_string());
        }

        if self.description.trim().is_empty() {
            errors.insert("description".to_string(), "Description is required".to_string());
        }

        if self.platforms.is_empty() {
            errors.insert(
                "platforms".to_string(),
                "Select at least one platform".to_string(),
            );
        }

        if self.image_ids.is_empty() {
            errors.insert("images".to_string(), "Select at least one image".to_string());
        }

        if !self.is_immediate {
            if self.publish_date.as_deref().map_or(true, |d| d.trim().is_empty()) {
                errors.insert("publishDate".to_string(), "Publish date is required".to_string());
            }
            if self.publish_time.as_deref().map_or(true, |t| t.trim().is_empty()) {
                errors.insert("publishTime".to_string(), "Publish time is required".to_string());
            }
            match self.scheduled_at() {
                Ok(Some(at)) if at <= now => {
                    errors.insert(
                        "publishTime".to_string(),
                        "Publish time must be in the future".to_string(),
                    );
                }
                Ok(_) => {}
                Err((field, message)) => {
                    errors.insert(field.to_string(), message);
                }
            }
        }

        errors
    }

    /// Per-platform length hints for the trimmed title and description
    pub fn length_warnings(&self) -> Vec<LengthWarning> {
        let title_len = char_len(self.title.trim());
        let description_len = char_len(self.description.trim());
        let mut warnings = Vec::new();

        for platform in unique(&self.platforms) {
            let config = platform.config();
            if let Some(limit) = config.max_title_length.filter(|l| title_len > *l) {
                warnings.push(LengthWarning {
                    platform,
                    field: "title",
                    limit,
                    length: title_len,
                });
            }
            if let Some(limit) = config.max_description_length.filter(|l| description_len > *l) {
                warnings.push(LengthWarning {
                    platform,
                    field: "description",
                    limit,
                    length: description_len,
                });
            }
        }

        warnings
    }

    /// Build a task from this form
    ///
    /// `existing` is the task being edited; its id and creation time carry
    /// over. Non-draft submissions must validate and start as `scheduled`;
    /// drafts keep whatever they have.
    pub fn into_task(
        self,
        existing: Option<&PublishTask>,
        now: DateTime<Utc>,
    ) -> StudioResult<TaskSubmission> {
        if !self.draft {
            let errors = self.validate(now);
            if !errors.is_empty() {
                tracing::debug!(fields = ?errors.keys().collect::<Vec<_>>(), "task form rejected");
                return Err(StudioError::TaskValidation(errors));
            }
        }

        let publish_time = if self.is_immediate {
            now
        } else {
            // Drafts may carry an unparseable or missing schedule
            self.scheduled_at().ok().flatten().unwrap_or(now)
        };

        let warnings = self.length_warnings();

        let task = PublishTask {
            id: existing
                .map(|t| t.id.clone())
                .unwrap_or_else(|| format!("task-{}", uuid::Uuid::new_v4())),
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            platforms: unique(&self.platforms),
            image_ids: unique(&self.image_ids),
            publish_time,
            is_immediate: self.is_immediate,
            status: if self.draft {
                PublishStatus::Draft
            } else {
                PublishStatus::Scheduled
            },
            created_at: existing.map(|t| t.created_at).unwrap_or(now),
            updated_at: now,
            published_at: None,
            error: None,
            platform_results: None,
        };

        Ok(TaskSubmission {
            task,
            warnings,
            image_warnings: Vec::new(),
        })
    }
}

/// Drop repeats, keeping first occurrence order
fn unique<T: Clone + PartialEq>(items: &[T]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch_form() -> TaskForm {
        TaskForm {
            title: "Launch Post".to_string(),
            description: "Hello world".to_string(),
            platforms: vec![Platform::Youtube, Platform::Instagram],
            image_ids: vec!["img1".to_string()],
            is_immediate: true,
            ..Default::default()
        }
    }

    fn future_form(now: DateTime<Utc>, offset: Duration) -> TaskForm {
        let at = now + offset;
        TaskForm {
            is_immediate: false,
            publish_date: Some(at.format("%Y-%m-%d").to_string()),
            publish_time: Some(at.format("%H:%M:%S").to_string()),
            ..launch_form()
        }
    }

    #[test]
    fn test_launch_post_scenario() {
        let now = Utc::now();
        let submission = launch_form().into_task(None, now).unwrap();
        let task = submission.task;

        assert_eq!(task.status, PublishStatus::Scheduled);
        assert!(task.is_immediate);
        assert!(task.platform_results.is_none());
        assert_eq!(task.publish_time, now);
        assert_eq!(task.platforms, vec![Platform::Youtube, Platform::Instagram]);
        assert!(task.id.starts_with("task-"));
        assert!(submission.warnings.is_empty());
    }

    #[test]
    fn test_empty_title_rejected_unless_draft() {
        let form = TaskForm {
            title: "   ".to_string(),
            ..launch_form()
        };

        match form.clone().into_task(None, Utc::now()) {
            Err(StudioError::TaskValidation(fields)) => {
                assert!(fields.contains_key("title"));
                assert_eq!(fields.len(), 1);
            }
            other => panic!("expected validation failure, got {:?}", other),
        }

        let draft = TaskForm { draft: true, ..form };
        let task = draft.into_task(None, Utc::now()).unwrap().task;
        assert_eq!(task.status, PublishStatus::Draft);
        assert_eq!(task.title, "");
    }

    #[test]
    fn test_reports_every_missing_field() {
        let form = TaskForm {
            is_immediate: false,
            ..Default::default()
        };
        let errors = form.validate(Utc::now());
        let keys: Vec<&str> = errors.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["description", "images", "platforms", "publishDate", "publishTime", "title"]
        );
    }

    #[test]
    fn test_past_publish_time_rejected() {
        let now = Utc::now();
        let form = future_form(now, Duration::hours(-1));
        let errors = form.validate(now);
        assert_eq!(errors.get("publishTime").unwrap(), "Publish time must be in the future");
        assert!(form.into_task(None, now).is_err());
    }

    #[test]
    fn test_future_publish_time_accepted() {
        let now = Utc::now();
        let form = future_form(now, Duration::days(1));
        let task = form.into_task(None, now).unwrap().task;
        assert_eq!(task.status, PublishStatus::Scheduled);
        assert!(!task.is_immediate);
        assert!(task.publish_time > now);
    }

    #[test]
    fn test_utc_offset_applied() {
        let now = "2030-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let form = TaskForm {
            is_immediate: false,
            publish_date: Some("2030-01-02".to_string()),
            publish_time: Some("08:00".to_string()),
            utc_offset_minutes: 480,
            ..launch_form()
        };
        let task = form.into_task(None, now).unwrap().task;
        assert_eq!(task.publish_time.to_rfc3339(), "2030-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_malformed_time_reported_on_field() {
        let form = TaskForm {
            is_immediate: false,
            publish_date: Some("2030-01-02".to_string()),
            publish_time: Some("eight".to_string()),
            ..launch_form()
        };
        let errors = form.validate(Utc::now());
        assert_eq!(errors.get("publishTime").unwrap(), "Publish time must be HH:MM");
    }

    #[test]
    fn test_extreme_dates_and_offsets_reported_on_field() {
        let form = TaskForm {
            is_immediate: false,
            publish_date: Some(NaiveDate::MAX.format("%Y-%m-%d").to_string()),
            publish_time: Some("23:30".to_string()),
            utc_offset_minutes: -60,
            ..launch_form()
        };
        let errors = form.validate(Utc::now());
        assert_eq!(errors.get("publishDate").unwrap(), "Publish date is out of range");

        let form = TaskForm {
            publish_date: Some("-262143-01-01".to_string()),
            publish_time: Some("23:59".to_string()),
            utc_offset_minutes: i32::MAX,
            ..form
        };
        let errors = form.validate(Utc::now());
        assert!(errors.contains_key("utcOffsetMinutes"));

        // Drafts fall back to now instead of failing
        let draft = TaskForm { draft: true, ..form };
        let now = Utc::now();
        assert_eq!(draft.into_task(None, now).unwrap().task.publish_time, now);
    }

    #[test]
    fn test_edit_keeps_identity() {
        let now = Utc::now();
        let original = launch_form().into_task(None, now - Duration::hours(1)).unwrap().task;

        let edited_form = TaskForm {
            title: "Launch Post v2".to_string(),
            ..launch_form()
        };
        let edited = edited_form.into_task(Some(&original), now).unwrap().task;
        assert_eq!(edited.id, original.id);
        assert_eq!(edited.created_at, original.created_at);
        assert_eq!(edited.updated_at, now);
        assert_eq!(edited.title, "Launch Post v2");
    }

    #[test]
    fn test_length_warnings_per_platform() {
        let form = TaskForm {
            title: "a".repeat(25),
            platforms: vec![Platform::Xiaohongshu, Platform::Wechat, Platform::Instagram],
            ..launch_form()
        };
        let warnings = form.length_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].platform, Platform::Xiaohongshu);
        assert_eq!(warnings[0].limit, 20);
        assert_eq!(warnings[0].length, 25);
    }

    #[test]
    fn test_duplicate_targets_collapsed() {
        let form = TaskForm {
            platforms: vec![Platform::Twitter, Platform::Twitter],
            image_ids: vec!["a".into(), "b".into(), "a".into()],
            ..launch_form()
        };
        let task = form.into_task(None, Utc::now()).unwrap().task;
        assert_eq!(task.platforms, vec![Platform::Twitter]);
        assert_eq!(task.image_ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_image_warnings_flag_format_and_size() {
        use crate::images::models::UploadedImage;
        use axum::body::Bytes;

        let webp = UploadedImage::new(
            "poster.webp".to_string(),
            "image/webp".to_string(),
            Bytes::from_static(b"webp"),
        );
        let mut big = UploadedImage::new(
            "cover.jpg".to_string(),
            "image/jpeg".to_string(),
            Bytes::from_static(b"jpg"),
        );
        big.size = 3 * 1024 * 1024;

        let mut images = ImageState::default();
        images.images = vec![webp.clone(), big.clone()];

        let form = TaskForm {
            platforms: vec![Platform::Youtube, Platform::Wechat],
            image_ids: vec![webp.id.clone(), big.id.clone(), "gone".to_string()],
            ..launch_form()
        };
        let task = form.into_task(None, Utc::now()).unwrap().task;
        let warnings = image_warnings(&task, &images);

        // webp on WeChat, 3MB on YouTube (2MB limit); WeChat allows 5MB
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].platform, Platform::Wechat);
        assert_eq!(warnings[0].image_id, webp.id);
        assert_eq!(warnings[1].platform, Platform::Youtube);
        assert_eq!(warnings[1].image_id, big.id);
        assert!(warnings[1].reason.contains("2MB"));
    }
}
