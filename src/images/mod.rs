/// Image management
///
/// Holds uploaded images, the selection, watermark templates and the cache of
/// watermarked renders for the session. Nothing here touches disk or network.

pub mod export;
pub mod models;
pub mod store;
pub mod upload;

pub use export::export_archive;
pub use models::*;
pub use store::ImageStore;
pub use upload::{decode_data_url, validate_upload, ACCEPTED_MIME_TYPES};
