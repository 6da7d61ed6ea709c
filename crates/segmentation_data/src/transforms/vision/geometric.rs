use super::io::ImageMaskPair;
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::imageops::{self, FilterType};

// ============================================================================
// ResizePair
// ============================================================================

/// Resizes an image and its mask to exactly `height × width`, ignoring the
/// source aspect ratio.
///
/// The image uses the configured filter. The mask always uses `Nearest` so no
/// intermediate label values appear along object borders.
///
/// # Filter Types
/// - `Nearest`: Nearest neighbour, fastest; the generator default
/// - `Triangle`: Bilinear filter
/// - `CatmullRom`: Bicubic sharpening
/// - `Gaussian`: Blurring/smoothing
/// - `Lanczos3`: Lanczos with window 3, highest quality re-sampling but slowest.
#[derive(Debug, Clone)]
pub struct ResizePair {
    height: u32,
    width: u32,
    filter: FilterType,
}

impl ResizePair {
    pub fn new(height: u32, width: u32, filter: FilterType) -> Result<Self> {
        ensure!(
            width > 0 && height > 0,
            "Image dimensions must be positive after resizing (got {}x{})",
            height,
            width
        );
        Ok(Self {
            height,
            width,
            filter,
        })
    }
}

impl Transform<ImageMaskPair, ImageMaskPair> for ResizePair {
    fn apply(&self, pair: ImageMaskPair) -> Result<ImageMaskPair> {
        let target = (self.width, self.height);
        let image = if pair.image.dimensions() == target {
            pair.image
        } else {
            imageops::resize(&pair.image, self.width, self.height, self.filter)
        };
        let mask = if pair.mask.dimensions() == target {
            pair.mask
        } else {
            imageops::resize(&pair.mask, self.width, self.height, FilterType::Nearest)
        };
        Ok(ImageMaskPair::new(image, mask))
    }
}
