use anyhow::Result;

pub mod image_dir;

pub use image_dir::{ImageDirSource, DEFAULT_IMAGE_EXTENSIONS};

/// A lazily streamed source of raw items (here: file paths).
///
/// Errors are yielded per item so a caller can decide whether one unreadable
/// entry aborts the whole listing.
pub trait DataSource<T>: Send + Sync {
    fn stream(&self) -> Result<Box<dyn Iterator<Item = Result<T>> + Send>>;
}
