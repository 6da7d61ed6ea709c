use crate::sample::SegmentationSample;
use anyhow::{bail, ensure, Result};
use tch::{Device, Tensor};

/// A stacked batch of [`SegmentationSample`]s ready for a training step.
///
/// - `images`: `[N, H, W, C]`
/// - `masks`: `[N, H, W, 1]`
///
/// with `N` the generator's `batch_size`. A batch may contain the same
/// sample more than once because indices are drawn with replacement.
#[derive(Debug)]
pub struct SegmentationBatch {
    pub images: Tensor,
    pub masks: Tensor,
}

impl SegmentationBatch {
    /// Stacks samples along a new leading dimension.
    ///
    /// Every sample must have the same image shape and the same mask shape;
    /// the first offending sample is named in the error.
    pub fn collate(samples: &[SegmentationSample]) -> Result<Self> {
        if samples.is_empty() {
            bail!("Cannot collate empty sample list");
        }

        let image_shape = samples[0].image.size();
        let mask_shape = samples[0].mask.size();
        for (i, sample) in samples.iter().enumerate().skip(1) {
            ensure!(
                sample.image.size() == image_shape,
                "Shape mismatch in sample {} for images: expected {:?}, got {:?}",
                i,
                image_shape,
                sample.image.size()
            );
            ensure!(
                sample.mask.size() == mask_shape,
                "Shape mismatch in sample {} for masks: expected {:?}, got {:?}",
                i,
                mask_shape,
                sample.mask.size()
            );
        }

        let images: Vec<&Tensor> = samples.iter().map(|s| &s.image).collect();
        let masks: Vec<&Tensor> = samples.iter().map(|s| &s.mask).collect();
        Ok(Self {
            images: Tensor::stack(&images, 0),
            masks: Tensor::stack(&masks, 0),
        })
    }

    /// Number of samples in the batch.
    pub fn batch_size(&self) -> i64 {
        self.images.size()[0]
    }

    /// Copies both tensors to `device` (CPU/GPU).
    pub fn to_device(&self, device: Device) -> Self {
        Self {
            images: self.images.to_device(device),
            masks: self.masks.to_device(device),
        }
    }
}

#[cfg(test)]
mod batch_test {
    use super::*;
    use tch::Kind;

    fn make_sample(value: f64, height: i64, width: i64) -> SegmentationSample {
        SegmentationSample::new(
            Tensor::full(&[height, width, 3], value, (Kind::Float, Device::Cpu)),
            Tensor::full(&[height, width, 1], value, (Kind::Float, Device::Cpu)),
        )
        .unwrap()
    }

    #[test]
    fn test_collate_stacks_leading_dim() -> Result<()> {
        let samples = vec![
            make_sample(0.0, 5, 7),
            make_sample(0.5, 5, 7),
            make_sample(1.0, 5, 7),
        ];
        let batch = SegmentationBatch::collate(&samples)?;

        assert_eq!(batch.batch_size(), 3);
        assert_eq!(batch.images.size(), vec![3, 5, 7, 3]);
        assert_eq!(batch.masks.size(), vec![3, 5, 7, 1]);
        assert_eq!(batch.images.double_value(&[1, 0, 0, 2]), 0.5);
        assert_eq!(batch.masks.double_value(&[2, 4, 6, 0]), 1.0);
        Ok(())
    }

    #[test]
    fn test_collate_rejects_empty_and_mismatched() {
        assert!(SegmentationBatch::collate(&[]).is_err());

        let mixed = vec![make_sample(0.0, 5, 7), make_sample(0.0, 6, 7)];
        let err = SegmentationBatch::collate(&mixed).unwrap_err();
        assert!(err.to_string().contains("sample 1"));
    }

    #[test]
    fn test_to_device() -> Result<()> {
        let batch = SegmentationBatch::collate(&[make_sample(0.25, 2, 2)])?;
        let target = Device::cuda_if_available();
        let moved = batch.to_device(target);

        assert_eq!(moved.images.device(), target);
        assert_eq!(moved.masks.device(), target);
        assert_eq!(batch.images.device(), Device::Cpu);
        Ok(())
    }
}
