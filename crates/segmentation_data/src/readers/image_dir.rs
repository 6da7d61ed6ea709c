use super::DataSource;
use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::PathBuf;
use walkdir::WalkDir;

/// Extensions accepted when none are given explicitly.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] =
    &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"];

/// Lists image files in a directory (optionally recursive, filtered by
/// extension). Only paths are produced; decoding happens per sampled index.
///
/// # Example
/// ```ignore
/// let images = ImageDirSource::new("./data/train", &["jpg"], false).list_sorted()?;
/// let masks = ImageDirSource::new("./data/train_masks", &["gif"], false).list_sorted()?;
/// // images[i] pairs with masks[i]
/// ```
#[derive(Debug, Clone)]
pub struct ImageDirSource {
    dir_path: PathBuf,
    extensions: Vec<String>,
    recurse: bool,
}

impl ImageDirSource {
    /// # Arguments
    /// - `dir_path`: Directory to scan.
    /// - `extensions`: File extensions to include (e.g., `["jpg", "png"]`). Case-insensitive.
    /// - `recurse`: If `true`, scans subdirectories recursively.
    pub fn new(dir_path: impl Into<PathBuf>, extensions: &[&str], recurse: bool) -> Self {
        Self {
            dir_path: dir_path.into(),
            extensions: extensions.iter().map(|s| s.to_lowercase()).collect(),
            recurse,
        }
    }

    /// Top-level listing with [`DEFAULT_IMAGE_EXTENSIONS`].
    pub fn with_default_extensions(dir_path: impl Into<PathBuf>) -> Self {
        Self::new(dir_path, DEFAULT_IMAGE_EXTENSIONS, false)
    }

    pub fn dir_path(&self) -> &PathBuf {
        &self.dir_path
    }

    /// Collects the whole listing, sorted by path. Sorting both the image and
    /// the mask directory is what aligns the i-th image with the i-th mask.
    pub fn list_sorted(&self) -> Result<Vec<PathBuf>> {
        let mut paths = self.stream()?.collect::<Result<Vec<_>>>()?;
        paths.sort();
        Ok(paths)
    }
}

impl DataSource<PathBuf> for ImageDirSource {
    fn stream(&self) -> Result<Box<dyn Iterator<Item = Result<PathBuf>> + Send>> {
        let dir_metadata = fs::metadata(&self.dir_path)
            .with_context(|| format!("Failed to access directory: {}", self.dir_path.display()))?;
        if !dir_metadata.is_dir() {
            bail!("Path is not a directory: {}", self.dir_path.display());
        }

        let extensions = self.extensions.clone();
        let path_iter: Box<dyn Iterator<Item = Result<PathBuf>> + Send> = if self.recurse {
            Box::new(WalkDir::new(&self.dir_path).into_iter().map(|entry| {
                entry
                    .map(|e| e.path().to_path_buf())
                    .map_err(|e| anyhow!("Failed to read directory entry: {}", e))
            }))
        } else {
            Box::new(fs::read_dir(&self.dir_path)?.map(|entry| {
                entry
                    .map(|e| e.path())
                    .map_err(|e| anyhow!("Failed to read directory entry: {}", e))
            }))
        };

        // Skip symlinks, directories and files with other extensions.
        let iter = path_iter.filter_map(move |path_result| match path_result {
            Ok(path) => {
                if path.is_symlink() {
                    return None;
                }

                match path.metadata() {
                    Ok(metadata) if metadata.is_file() => {
                        let extension_matches = path
                            .extension()
                            .and_then(|e| e.to_str())
                            .is_some_and(|e| extensions.contains(&e.to_lowercase()));
                        extension_matches.then_some(Ok(path))
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(e).with_context(|| {
                        format!("Failed to get metadata for: {}", path.display())
                    })),
                }
            }
            Err(e) => Some(Err(e)),
        });
        Ok(Box::new(iter))
    }
}
