/// Upload and rendered-image payload validation
use crate::{
    error::{StudioError, StudioResult},
    images::models::ImageDimensions,
};
use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use std::io::Cursor;

/// MIME types accepted from the uploader
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

/// Check an incoming file and read its dimensions
///
/// Rejections name the file, as the uploader shows them per file.
pub fn validate_upload(
    name: &str,
    mime_type: &str,
    data: &[u8],
    max_bytes: usize,
) -> StudioResult<Option<ImageDimensions>> {
    if data.is_empty() {
        return Err(StudioError::Validation(format!("{}: file is empty", name)));
    }

    if data.len() > max_bytes {
        return Err(StudioError::PayloadTooLarge(format!(
            "{}: file is too large (max {}MB)",
            name,
            max_bytes / (1024 * 1024)
        )));
    }

    validate_mime_type(name, mime_type)?;
    ensure_content_matches(name, mime_type, data)?;

    Ok(extract_image_dimensions(data))
}

fn validate_mime_type(name: &str, mime_type: &str) -> StudioResult<()> {
    if ACCEPTED_MIME_TYPES.contains(&mime_type) {
        Ok(())
    } else {
        Err(StudioError::UnsupportedMediaType(format!(
            "{}: unsupported file type {}",
            name, mime_type
        )))
    }
}

/// The payload header must agree with the declared type
fn ensure_content_matches(name: &str, mime_type: &str, data: &[u8]) -> StudioResult<()> {
    let detected = image::guess_format(data).map_err(|_| {
        StudioError::Validation(format!("{}: content is not a recognizable image", name))
    })?;

    match ImageFormat::from_mime_type(mime_type) {
        Some(declared) if declared == detected => Ok(()),
        _ => Err(StudioError::Validation(format!(
            "{}: content does not match declared type {}",
            name, mime_type
        ))),
    }
}

fn extract_image_dimensions(data: &[u8]) -> Option<ImageDimensions> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?;

    match reader.into_dimensions() {
        Ok((width, height)) => Some(ImageDimensions { width, height }),
        Err(e) => {
            tracing::warn!("Failed to extract image dimensions: {}", e);
            None
        }
    }
}

/// Decode a `data:<mime>;base64,<payload>` URL as produced by canvas export
pub fn decode_data_url(data_url: &str) -> StudioResult<(String, Vec<u8>)> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| StudioError::Validation("dataUrl must start with data:".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| StudioError::Validation("dataUrl is missing its payload".to_string()))?;

    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| StudioError::Validation("dataUrl must be base64 encoded".to_string()))?;

    if !mime_type.starts_with("image/") {
        return Err(StudioError::UnsupportedMediaType(format!(
            "rendered image has type {}",
            mime_type
        )));
    }

    let bytes = general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| StudioError::Validation(format!("dataUrl payload is not base64: {}", e)))?;

    if bytes.is_empty() {
        return Err(StudioError::Validation("dataUrl payload is empty".to_string()));
    }

    Ok((mime_type.to_string(), bytes))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Encode a tiny PNG for tests
    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::new(width, height);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn test_valid_png_upload_reports_dimensions() {
        let data = png_bytes(4, 3);
        let dims = validate_upload("cat.png", "image/png", &data, 1024 * 1024).unwrap();
        assert_eq!(dims, Some(ImageDimensions { width: 4, height: 3 }));
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let data = png_bytes(4, 3);
        let err = validate_upload("cat.png", "image/png", &data, 10).unwrap_err();
        assert!(matches!(err, StudioError::PayloadTooLarge(_)));
        assert!(err.to_string().contains("cat.png"));
    }

    #[test]
    fn test_rejects_unsupported_type() {
        let err = validate_upload("doc.pdf", "application/pdf", b"%PDF-1.4", 1024).unwrap_err();
        assert!(matches!(err, StudioError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_rejects_mismatched_content() {
        let data = png_bytes(2, 2);
        let err = validate_upload("cat.jpg", "image/jpeg", &data, 1024 * 1024).unwrap_err();
        assert!(matches!(err, StudioError::Validation(_)));
    }

    #[test]
    fn test_decode_data_url() {
        let encoded = general_purpose::STANDARD.encode(png_bytes(1, 1));
        let url = format!("data:image/png;base64,{}", encoded);
        let (mime, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime, "image/png");
        assert!(image::guess_format(&bytes).is_ok());
    }

    #[test]
    fn test_decode_data_url_rejects_garbage() {
        assert!(decode_data_url("http://example.com/a.png").is_err());
        assert!(decode_data_url("data:image/png;base64").is_err());
        assert!(decode_data_url("data:image/png,plain").is_err());
        assert!(decode_data_url("data:text/plain;base64,aGk=").is_err());
        assert!(decode_data_url("data:image/png;base64,!!!").is_err());
    }
}
