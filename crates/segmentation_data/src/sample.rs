use anyhow::{ensure, Result};
use tch::Tensor;

/// One normalized training example: an image tensor `[H, W, C]` and its mask
/// tensor `[H, W, 1]`, both `f32` in `[0, 1]`.
///
/// Samples are built per drawn index and dropped once stacked into a batch.
#[derive(Debug)]
pub struct SegmentationSample {
    pub image: Tensor,
    pub mask: Tensor,
}

/// Shallow clone: shares tensor storage.
impl Clone for SegmentationSample {
    fn clone(&self) -> Self {
        Self {
            image: self.image.shallow_clone(),
            mask: self.mask.shallow_clone(),
        }
    }
}

impl SegmentationSample {
    /// Pairs an image with its mask, checking that both are 3-D and share
    /// height and width.
    pub fn new(image: Tensor, mask: Tensor) -> Result<Self> {
        let image_size = image.size();
        let mask_size = mask.size();
        ensure!(
            image_size.len() == 3 && mask_size.len() == 3,
            "Image and mask must be [H, W, C] tensors (got {:?} and {:?})",
            image_size,
            mask_size
        );
        ensure!(
            image_size[..2] == mask_size[..2],
            "Image {:?} and mask {:?} differ in height/width",
            image_size,
            mask_size
        );
        ensure!(
            mask_size[2] == 1,
            "Mask must have a single channel (got {:?})",
            mask_size
        );
        Ok(Self { image, mask })
    }

    /// `(height, width)` shared by image and mask.
    pub fn dims(&self) -> (i64, i64) {
        let size = self.image.size();
        (size[0], size[1])
    }
}

#[cfg(test)]
mod sample_test {
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn test_sample_construction() -> Result<()> {
        let sample = SegmentationSample::new(
            Tensor::zeros(&[4, 6, 3], (Kind::Float, Device::Cpu)),
            Tensor::ones(&[4, 6, 1], (Kind::Float, Device::Cpu)),
        )?;
        assert_eq!(sample.dims(), (4, 6));

        let copy = sample.clone();
        assert_eq!(copy.mask.double_value(&[3, 5, 0]), 1.0);
        Ok(())
    }

    #[test]
    fn test_sample_rejects_misaligned_mask() {
        let image = Tensor::zeros(&[4, 6, 3], (Kind::Float, Device::Cpu));
        let wrong_hw = Tensor::zeros(&[4, 5, 1], (Kind::Float, Device::Cpu));
        assert!(SegmentationSample::new(image.shallow_clone(), wrong_hw).is_err());

        let two_channels = Tensor::zeros(&[4, 6, 2], (Kind::Float, Device::Cpu));
        assert!(SegmentationSample::new(image.shallow_clone(), two_channels).is_err());

        let flat = Tensor::zeros(&[24], (Kind::Float, Device::Cpu));
        assert!(SegmentationSample::new(image, flat).is_err());
    }
}
