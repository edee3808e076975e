/// Image store: uploaded images, selection, watermark templates and renders
use crate::{
    images::models::{
        processed_url, ImageState, ProcessedImage, Selection, TemplatePatch, UploadedImage,
        WatermarkTemplate,
    },
    metrics,
};
use std::sync::Arc;
use tokio::sync::watch;

/// Owner of the image state
///
/// Every mutation swaps in a new immutable [`ImageState`] snapshot and
/// notifies subscribers. Mutations are synchronous and hold the channel's
/// write lock for their duration, so readers never observe a half-applied
/// change.
pub struct ImageStore {
    state: watch::Sender<Arc<ImageState>>,
}

impl Default for ImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(ImageState::default()));
        Self { state }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<ImageState> {
        self.state.borrow().clone()
    }

    /// Receive a new snapshot after every effective mutation
    pub fn subscribe(&self) -> watch::Receiver<Arc<ImageState>> {
        self.state.subscribe()
    }

    /// Apply `f` to a copy of the state; publish it only when `f` reports a change
    fn update(&self, f: impl FnOnce(&mut ImageState) -> bool) -> Arc<ImageState> {
        let mut published = None;
        self.state.send_if_modified(|current| {
            let mut next = ImageState::clone(current);
            let changed = f(&mut next);
            if changed {
                metrics::IMAGES_STORED.set(next.images.len() as i64);
                *current = Arc::new(next);
            }
            published = Some(Arc::clone(current));
            changed
        });
        published.unwrap_or_else(|| self.snapshot())
    }

    // ========== Images ==========

    pub fn add_images(&self, images: Vec<UploadedImage>) -> Arc<ImageState> {
        if images.is_empty() {
            return self.snapshot();
        }
        tracing::debug!(count = images.len(), "adding images");
        self.update(|state| {
            state.images.extend(images);
            true
        })
    }

    /// Remove an image together with its selection and rendered output
    pub fn remove_image(&self, id: &str) -> Arc<ImageState> {
        self.update(|state| {
            let before = state.images.len();
            state.images.retain(|img| img.id != id);
            if state.images.len() == before {
                return false;
            }
            state.selected.remove(id);
            state.processed.remove(id);
            true
        })
    }

    pub fn clear_images(&self) -> Arc<ImageState> {
        self.update(|state| {
            let changed = !state.images.is_empty()
                || !state.selected.is_empty()
                || !state.processed.is_empty();
            state.images.clear();
            state.selected.clear();
            state.processed.clear();
            changed
        })
    }

    // ========== Selection ==========

    /// Select an image; unknown and already-selected ids are ignored
    pub fn select_image(&self, id: &str) -> Arc<ImageState> {
        self.update(|state| state.image(id).is_some() && state.selected.insert(id))
    }

    pub fn deselect_image(&self, id: &str) -> Arc<ImageState> {
        self.update(|state| state.selected.remove(id))
    }

    pub fn select_all_images(&self) -> Arc<ImageState> {
        self.update(|state| {
            let all: Selection = state.images.iter().map(|img| img.id.clone()).collect();
            let changed = all != state.selected;
            state.selected = all;
            changed
        })
    }

    pub fn clear_selection(&self) -> Arc<ImageState> {
        self.update(|state| {
            let changed = !state.selected.is_empty();
            state.selected.clear();
            changed
        })
    }

    // ========== Watermark templates ==========

    /// Set or clear the current template without touching the saved collection
    pub fn set_watermark_template(&self, template: Option<WatermarkTemplate>) -> Arc<ImageState> {
        self.update(|state| {
            state.current_template = template;
            true
        })
    }

    /// Save a template and make it current
    pub fn add_watermark_template(&self, template: WatermarkTemplate) -> Arc<ImageState> {
        self.update(|state| {
            state.current_template = Some(template.clone());
            state.templates.push(template);
            true
        })
    }

    /// Merge `patch` into a saved template; the current template follows when ids match
    pub fn update_watermark_template(&self, id: &str, patch: &TemplatePatch) -> Arc<ImageState> {
        self.update(|state| {
            let Some(template) = state.templates.iter_mut().find(|t| t.id == id) else {
                return false;
            };
            template.apply(patch);

            if let Some(current) = state.current_template.as_mut().filter(|c| c.id == id) {
                current.apply(patch);
            }
            true
        })
    }

    pub fn remove_watermark_template(&self, id: &str) -> Arc<ImageState> {
        self.update(|state| {
            let before = state.templates.len();
            state.templates.retain(|t| t.id != id);
            let removed = state.templates.len() != before;

            let was_current = state.current_template.as_ref().is_some_and(|c| c.id == id);
            if was_current {
                state.current_template = None;
            }
            removed || was_current
        })
    }

    // ========== Processed images ==========

    /// Record a watermarked rendering, replacing any earlier one for the image
    ///
    /// Renders for unknown images are dropped.
    pub fn add_processed_image(&self, image_id: &str, rendered: ProcessedImage) -> Arc<ImageState> {
        self.update(|state| {
            let Some(image) = state.images.iter_mut().find(|img| img.id == image_id) else {
                return false;
            };
            image.watermarked_preview = Some(processed_url(image_id));
            state.processed.insert(image_id.to_string(), rendered);
            true
        })
    }
}
