/// Image store data models
use crate::error::{StudioError, StudioResult};
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An uploaded source image
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub id: String,
    /// Raw file payload; served from `preview`
    #[serde(skip)]
    pub data: Bytes,
    pub preview: String,
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watermarked_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<ImageDimensions>,
}

impl UploadedImage {
    /// Build a new image with a fresh id; duplicate uploads never share one
    pub fn new(name: String, mime_type: String, data: Bytes) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        Self {
            preview: preview_url(&id),
            size: data.len() as u64,
            id,
            data,
            name,
            mime_type,
            uploaded_at: Utc::now(),
            watermarked_preview: None,
            dimensions: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Option<ImageDimensions>) -> Self {
        self.dimensions = dimensions;
        self
    }
}

/// Image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

pub fn preview_url(image_id: &str) -> String {
    format!("/api/images/{}/raw", image_id)
}

pub fn processed_url(image_id: &str) -> String {
    format!("/api/images/{}/processed", image_id)
}

/// A reusable watermark design
///
/// `canvas_json` is the editor's serialized canvas; the service only checks
/// that it is JSON and never interprets the layers beyond counting them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkTemplate {
    pub id: String,
    pub name: String,
    #[serde(rename = "canvasJSON", alias = "canvasJson")]
    pub canvas_json: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WatermarkTemplate {
    pub fn new(name: &str, canvas_json: String, thumbnail: Option<String>) -> StudioResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StudioError::Validation("Template name is required".to_string()));
        }
        ensure_canvas_json(&canvas_json)?;

        Ok(Self {
            id: format!("template-{}", uuid::Uuid::new_v4()),
            name: name.to_string(),
            canvas_json,
            thumbnail,
            created_at: Utc::now(),
        })
    }

    /// Number of overlay objects in the serialized canvas
    pub fn layer_count(&self) -> usize {
        serde_json::from_str::<serde_json::Value>(&self.canvas_json)
            .ok()
            .and_then(|v| v.get("objects").and_then(|o| o.as_array()).map(Vec::len))
            .unwrap_or(0)
    }

    pub fn apply(&mut self, patch: &TemplatePatch) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(canvas_json) = &patch.canvas_json {
            self.canvas_json = canvas_json.clone();
        }
        if let Some(thumbnail) = &patch.thumbnail {
            self.thumbnail = Some(thumbnail.clone());
        }
    }
}

/// Partial update for a watermark template
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplatePatch {
    pub name: Option<String>,
    #[serde(rename = "canvasJSON", alias = "canvasJson")]
    pub canvas_json: Option<String>,
    pub thumbnail: Option<String>,
}

impl TemplatePatch {
    pub fn validate(&self) -> StudioResult<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(StudioError::Validation("Template name cannot be empty".to_string()));
            }
        }
        if let Some(canvas_json) = &self.canvas_json {
            ensure_canvas_json(canvas_json)?;
        }
        Ok(())
    }
}

fn ensure_canvas_json(canvas_json: &str) -> StudioResult<()> {
    serde_json::from_str::<serde_json::Value>(canvas_json)
        .map(|_| ())
        .map_err(|e| StudioError::Validation(format!("canvasJSON is not valid JSON: {}", e)))
}

/// A watermarked rendering of an uploaded image
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub data: Bytes,
    pub mime_type: String,
    pub rendered_at: DateTime<Utc>,
}

/// Ordered selection with set semantics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Selection(Vec<String>);

impl Selection {
    /// Returns false when the id was already selected
    pub fn insert(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.0.push(id.to_string());
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|selected| selected != id);
        self.0.len() != before
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|selected| selected == id)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }
}

impl FromIterator<String> for Selection {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut selection = Selection::default();
        for id in iter {
            selection.insert(&id);
        }
        selection
    }
}

/// Immutable snapshot of everything the image store owns
#[derive(Debug, Clone, Default)]
pub struct ImageState {
    pub images: Vec<UploadedImage>,
    pub selected: Selection,
    pub templates: Vec<WatermarkTemplate>,
    pub current_template: Option<WatermarkTemplate>,
    pub processed: HashMap<String, ProcessedImage>,
}

impl ImageState {
    pub fn image(&self, id: &str) -> Option<&UploadedImage> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn template(&self, id: &str) -> Option<&WatermarkTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn processed_image(&self, image_id: &str) -> Option<&ProcessedImage> {
        self.processed.get(image_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_uploads_get_distinct_ids() {
        let data = Bytes::from_static(b"same bytes");
        let a = UploadedImage::new("a.png".into(), "image/png".into(), data.clone());
        let b = UploadedImage::new("a.png".into(), "image/png".into(), data);
        assert_ne!(a.id, b.id);
        assert_eq!(a.preview, format!("/api/images/{}/raw", a.id));
        assert_eq!(a.size, 10);
    }

    #[test]
    fn test_selection_is_a_set() {
        let mut selection = Selection::default();
        assert!(selection.insert("a"));
        assert!(!selection.insert("a"));
        assert!(selection.insert("b"));
        assert_eq!(selection.len(), 2);
        assert!(selection.remove("a"));
        assert!(!selection.remove("a"));
        assert_eq!(selection.iter().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_template_requires_name_and_json() {
        assert!(WatermarkTemplate::new("  ", "{}".into(), None).is_err());
        assert!(WatermarkTemplate::new("Logo", "not json".into(), None).is_err());

        let template = WatermarkTemplate::new(
            " Logo ",
            r#"{"version":"5.3.0","objects":[{"type":"text"},{"type":"image"}]}"#.into(),
            None,
        )
        .unwrap();
        assert_eq!(template.name, "Logo");
        assert_eq!(template.layer_count(), 2);
        assert!(template.id.starts_with("template-"));
    }

    #[test]
    fn test_template_serializes_canvas_field_name() {
        let template = WatermarkTemplate::new("Logo", "{}".into(), None).unwrap();
        let json = serde_json::to_value(&template).unwrap();
        assert!(json.get("canvasJSON").is_some());
        assert!(json.get("thumbnail").is_none());
    }

    #[test]
    fn test_template_patch() {
        let mut template = WatermarkTemplate::new("Logo", "{}".into(), None).unwrap();
        let patch = TemplatePatch {
            name: Some("Corner logo".into()),
            thumbnail: Some("data:image/png;base64,AA==".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_ok());
        template.apply(&patch);
        assert_eq!(template.name, "Corner logo");
        assert_eq!(template.canvas_json, "{}");
        assert!(template.thumbnail.is_some());

        let bad = TemplatePatch {
            canvas_json: Some("{".into()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
