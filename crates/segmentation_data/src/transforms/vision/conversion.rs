use super::io::ImageMaskPair;
use crate::sample::SegmentationSample;
use crate::transforms::Transform;
use anyhow::{ensure, Context, Result};
use image::{GrayImage, RgbImage};
use tch::{Kind, Tensor};

/// Turns raw interleaved `u8` pixels into an `f32` tensor of shape
/// `[height, width, channels]` with values in `[0.0, 1.0]`.
fn pixels_to_tensor(raw: &[u8], height: u32, width: u32, channels: i64) -> Result<Tensor> {
    ensure!(
        width > 0 && height > 0,
        "Image dimensions must be positive (got {}x{})",
        height,
        width
    );
    Tensor::from_slice(raw)
        .reshape(&[height as i64, width as i64, channels])
        .to_kind(Kind::Float)
        .f_div_scalar(255.0)
        .context("Failed to normalize tensor values")
}

// ============================================================================
// ToTensor
// ============================================================================

/// Converts an RGB image to a channel-last `[H, W, 3]` float tensor in [0, 1].
#[derive(Debug)]
pub struct ToTensor;

impl Transform<RgbImage, Tensor> for ToTensor {
    fn apply(&self, img: RgbImage) -> Result<Tensor> {
        let (width, height) = img.dimensions();
        pixels_to_tensor(img.as_raw(), height, width, 3)
    }
}

// ============================================================================
// MaskToTensor
// ============================================================================

/// Converts a grayscale mask to a `[H, W, 1]` float tensor in [0, 1].
#[derive(Debug)]
pub struct MaskToTensor;

impl Transform<GrayImage, Tensor> for MaskToTensor {
    fn apply(&self, mask: GrayImage) -> Result<Tensor> {
        let (width, height) = mask.dimensions();
        pixels_to_tensor(mask.as_raw(), height, width, 1)
    }
}

// ============================================================================
// PairToSample
// ============================================================================

/// Final pipeline stage: normalizes both halves of a pair into a [`SegmentationSample`].
#[derive(Debug)]
pub struct PairToSample;

impl Transform<ImageMaskPair, SegmentationSample> for PairToSample {
    fn apply(&self, pair: ImageMaskPair) -> Result<SegmentationSample> {
        let image = ToTensor.apply(pair.image)?;
        let mask = MaskToTensor.apply(pair.mask)?;
        SegmentationSample::new(image, mask)
    }
}
