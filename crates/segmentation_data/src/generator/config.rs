//! Configuration for a single [`BatchGenerator`](super::BatchGenerator).
//!
//! ```ignore
//! let config = GeneratorConfig::builder()
//!     .batch_size(4)
//!     .img_dim(ImageDim::new(171, 256))
//!     .augment(true)
//!     .num_colors(8)
//!     .seed(42)
//!     .build();
//! ```

use crate::transforms::vision::AugmentationConfig;
use anyhow::{ensure, Result};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};

/// Aspect ratio (height / width) of the source photos.
pub const DEFAULT_ASPECT_RATIO: f64 = 1280.0 / 1918.0;
pub const DEFAULT_IMG_WIDTH: u32 = 256;
pub const DEFAULT_BATCH_SIZE: usize = 2;
pub const DEFAULT_NUM_COLORS: usize = 8;

/// Target `height × width` every image and mask is resized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDim {
    pub height: u32,
    pub width: u32,
}

impl ImageDim {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// `height = round(aspect_ratio * width)`.
    pub fn from_width(width: u32, aspect_ratio: f64) -> Result<Self> {
        ensure!(width > 0, "Image width must be positive");
        ensure!(
            aspect_ratio.is_finite() && aspect_ratio > 0.0,
            "Aspect ratio must be a positive number (got {})",
            aspect_ratio
        );
        let height = (aspect_ratio * width as f64).round();
        ensure!(
            height >= 1.0 && height <= u32::MAX as f64,
            "Aspect ratio {} gives an unusable height {} for width {}",
            aspect_ratio,
            height,
            width
        );
        Ok(Self::new(height as u32, width))
    }
}

impl Default for ImageDim {
    fn default() -> Self {
        // 1280/1918 * 256 rounds to 171.
        Self::new(171, DEFAULT_IMG_WIDTH)
    }
}

/// Configuration for a batch generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Samples per batch (> 0)
    pub batch_size: usize,
    /// Master switch for random augmentation. When false the augmentation
    /// stage still runs, with every chance at zero.
    pub augment: bool,
    /// Resize target
    pub img_dim: ImageDim,
    /// Palette size for color quantization
    pub num_colors: usize,
    /// Seed for index sampling and augmentation; random when `None`
    pub seed: Option<u64>,
    /// Draw indices with replacement (default) or distinct within a batch
    pub replacement: bool,
    /// Resampling filter for images (default nearest neighbour, like the
    /// mask, which always uses it)
    pub filter: FilterType,
    /// Overrides the default augmentation chances and ranges when `augment` is true
    pub augmentation: Option<AugmentationConfig>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            augment: true,
            img_dim: ImageDim::default(),
            num_colors: DEFAULT_NUM_COLORS,
            seed: None,
            replacement: true,
            filter: FilterType::Nearest,
            augmentation: None,
        }
    }
}

impl GeneratorConfig {
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder::default()
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.batch_size > 0,
            "batch_size must be positive (got {})",
            self.batch_size
        );
        ensure!(
            self.img_dim.height > 0 && self.img_dim.width > 0,
            "img_dim must be positive (got {}x{})",
            self.img_dim.height,
            self.img_dim.width
        );
        ensure!(
            self.num_colors > 0,
            "num_colors must be positive (got {})",
            self.num_colors
        );
        Ok(())
    }

    /// The augmentation settings this generator actually runs with.
    pub fn augmentation_config(&self) -> AugmentationConfig {
        if !self.augment {
            return AugmentationConfig::disabled(self.num_colors);
        }
        self.augmentation
            .clone()
            .unwrap_or_else(|| AugmentationConfig::default().with_num_colors(self.num_colors))
    }
}

/// Builder for GeneratorConfig with method chaining
#[derive(Default)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    pub fn augment(mut self, augment: bool) -> Self {
        self.config.augment = augment;
        self
    }

    pub fn img_dim(mut self, img_dim: ImageDim) -> Self {
        self.config.img_dim = img_dim;
        self
    }

    pub fn num_colors(mut self, num_colors: usize) -> Self {
        self.config.num_colors = num_colors;
        self
    }

    /// Makes index draws and augmentation reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn maybe_seed(mut self, seed: Option<u64>) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn replacement(mut self, replacement: bool) -> Self {
        self.config.replacement = replacement;
        self
    }

    /// Smoother image resizing, e.g. `FilterType::Triangle`.
    pub fn filter(mut self, filter: FilterType) -> Self {
        self.config.filter = filter;
        self
    }

    pub fn augmentation(mut self, augmentation: AugmentationConfig) -> Self {
        self.config.augmentation = Some(augmentation);
        self
    }

    pub fn build(self) -> GeneratorConfig {
        self.config
    }
}
