use crate::transforms::Transform;
use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, ImageReader, RgbImage};
use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::PathBuf;
use tracing::trace;

/// An RGB image and its single-channel mask, kept together so every
/// geometric transform is applied to both with the same parameters.
#[derive(Debug, Clone)]
pub struct ImageMaskPair {
    pub image: RgbImage,
    pub mask: GrayImage,
}

impl ImageMaskPair {
    pub fn new(image: RgbImage, mask: GrayImage) -> Self {
        Self { image, mask }
    }
}

// ============================================================================
// LoadImage
// ============================================================================

/// Reads and decodes one image file. The format is guessed from the content,
/// so masks stored as GIF next to JPEG photos are fine.
#[derive(Debug, Clone)]
pub struct LoadImage {
    buffer_size: usize,
}

impl Default for LoadImage {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadImage {
    /// Creates a loader with an 8KB read buffer.
    pub fn new() -> Self {
        Self { buffer_size: 8192 }
    }
}

impl Transform<PathBuf, DynamicImage> for LoadImage {
    fn apply(&self, path: PathBuf) -> Result<DynamicImage> {
        let file = File::open(&path)
            .with_context(|| format!("Failed to open image: {}", path.display()))?;

        let file_size = file.metadata()?.len() as usize;
        let mut reader = BufReader::with_capacity(self.buffer_size, file);
        let mut buffer = Vec::with_capacity(file_size);
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read image: {}", path.display()))?;

        let image = ImageReader::new(Cursor::new(buffer))
            .with_guessed_format()?
            .decode()
            .with_context(|| format!("Failed to decode image: {}", path.display()))?;

        trace!(path = %path.display(), width = image.width(), height = image.height(), "decoded");
        Ok(image)
    }
}

// ============================================================================
// LoadPair
// ============================================================================

/// Loads an `(image_path, mask_path)` pair: the image as RGB, the mask as
/// 8-bit grayscale.
#[derive(Debug, Clone, Default)]
pub struct LoadPair {
    loader: LoadImage,
}

impl LoadPair {
    pub fn new() -> Self {
        Self {
            loader: LoadImage::new(),
        }
    }
}

impl Transform<(PathBuf, PathBuf), ImageMaskPair> for LoadPair {
    fn apply(&self, (image_path, mask_path): (PathBuf, PathBuf)) -> Result<ImageMaskPair> {
        let image = self.loader.apply(image_path)?.to_rgb8();
        let mask = self.loader.apply(mask_path)?.to_luma8();
        Ok(ImageMaskPair::new(image, mask))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Luma, Rgb};
    use tempfile::tempdir;

    #[test]
    fn test_load_image() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("car.png");
        let mut img = RgbImage::new(3, 2);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(2, 1, Rgb([0, 0, 255]));
        img.save(&path)?;

        let loaded = LoadImage::new().apply(path)?;
        assert_eq!(loaded.dimensions(), (3, 2));
        let rgb = loaded.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 0, 0]));
        assert_eq!(rgb.get_pixel(2, 1), &Rgb([0, 0, 255]));
        Ok(())
    }

    #[test]
    fn test_load_pair_converts_channels() -> Result<()> {
        let dir = tempdir()?;
        let image_path = dir.path().join("car.png");
        let mask_path = dir.path().join("car_mask.png");

        RgbImage::from_pixel(4, 4, Rgb([10, 20, 30])).save(&image_path)?;
        // Masks often arrive as RGB files; they must still come out single-channel.
        RgbImage::from_fn(4, 4, |x, _| {
            if x < 2 {
                Rgb([255, 255, 255])
            } else {
                Rgb([0, 0, 0])
            }
        })
        .save(&mask_path)?;

        let pair = LoadPair::new().apply((image_path, mask_path))?;
        assert_eq!(pair.image.dimensions(), (4, 4));
        assert_eq!(pair.mask.dimensions(), (4, 4));
        assert_eq!(pair.mask.get_pixel(0, 0), &Luma([255]));
        assert_eq!(pair.mask.get_pixel(3, 0), &Luma([0]));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = LoadPair::new().apply((
            PathBuf::from("does/not/exist.jpg"),
            PathBuf::from("does/not/exist_mask.gif"),
        ));
        let msg = format!("{:#}", result.unwrap_err());
        assert!(msg.contains("exist.jpg"));
    }
}
