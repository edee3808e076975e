/// Zip archive of images and their watermarked renders
use crate::{
    error::{StudioError, StudioResult},
    images::models::{ImageState, UploadedImage},
};
use image::ImageFormat;
use std::{
    collections::HashSet,
    io::{Cursor, Write},
};
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// Folder every entry sits under inside the archive
pub const EXPORT_FOLDER: &str = "watermarked-images";

const COMPRESSION_LEVEL: i64 = 6;

/// Images an export covers: the selection, or everything when nothing is selected
pub fn export_candidates(state: &ImageState) -> Vec<&UploadedImage> {
    if state.selected.is_empty() {
        state.images.iter().collect()
    } else {
        state
            .images
            .iter()
            .filter(|image| state.selected.contains(&image.id))
            .collect()
    }
}

/// Name without its last extension
fn stem(name: &str) -> &str {
    name.rfind('.').map_or(name, |i| &name[..i])
}

fn extension(mime_type: &str) -> &'static str {
    ImageFormat::from_mime_type(mime_type)
        .and_then(|format| format.extensions_str().first().copied())
        .unwrap_or("png")
}

/// Suffix repeated names so every archive entry is distinct
fn unique_name(used: &mut HashSet<String>, name: String) -> String {
    if used.insert(name.clone()) {
        return name;
    }

    let (base, ext) = match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name.as_str(), ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{} ({}){}", base, n, ext);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Entry names and payloads for one export, in image order
///
/// A rendered image contributes `<stem>_watermarked.<ext>`; with
/// `include_original` the upload follows as `<stem>_original.<ext>`. An
/// image without a render and without `include_original` goes in as the
/// upload under its own name.
pub fn export_entries<'a>(
    state: &'a ImageState,
    include_original: bool,
) -> Vec<(String, &'a [u8])> {
    let mut used = HashSet::new();
    let mut entries = Vec::new();

    for image in export_candidates(state) {
        let base = stem(&image.name);
        let processed = state.processed_image(&image.id);

        if let Some(processed) = processed {
            let name = format!("{}_watermarked.{}", base, extension(&processed.mime_type));
            entries.push((unique_name(&mut used, name), processed.data.as_ref()));
        }

        if include_original {
            let name = format!("{}_original.{}", base, extension(&image.mime_type));
            entries.push((unique_name(&mut used, name), image.data.as_ref()));
        } else if processed.is_none() {
            entries.push((unique_name(&mut used, image.name.clone()), image.data.as_ref()));
        }
    }

    entries
}

/// Build the zip archive for an export
pub fn export_archive(state: &ImageState, include_original: bool) -> StudioResult<Vec<u8>> {
    let entries = export_entries(state, include_original);
    if entries.is_empty() {
        return Err(StudioError::Validation("No images to export".to_string()));
    }

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(COMPRESSION_LEVEL));

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer
            .start_file(format!("{}/{}", EXPORT_FOLDER, name), options)
            .map_err(|e| StudioError::Internal(format!("Failed to add {} to archive: {}", name, e)))?;
        writer
            .write_all(data)
            .map_err(|e| StudioError::Internal(format!("Failed to write {}: {}", name, e)))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| StudioError::Internal(format!("Failed to finish archive: {}", e)))?;
    Ok(cursor.into_inner())
}
