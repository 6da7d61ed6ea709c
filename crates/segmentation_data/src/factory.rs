//! One-call setup: partition the data directory and build the train,
//! validation and test generators on top of it.

use crate::generator::{
    BatchGenerator, GeneratorConfig, ImageDim, DEFAULT_ASPECT_RATIO, DEFAULT_BATCH_SIZE,
    DEFAULT_IMG_WIDTH, DEFAULT_NUM_COLORS,
};
use crate::partition::{DatasetPartitioner, PartitionSet};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Settings for [`get_generators`]. Deserializable so the CLI can read it
/// from a JSON file; every field has a default.
///
/// ```json
/// { "data_root": "data", "img_width": 256, "batch_size": 4, "seed": 7 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Directory holding the image and mask subdirectories
    pub data_root: PathBuf,
    pub images_subdir: String,
    pub masks_subdir: String,
    pub img_width: u32,
    /// height / width of the resize target
    pub aspect_ratio: f64,
    pub batch_size: usize,
    /// Augment the training generator (validation and test never augment)
    pub augment: bool,
    pub num_colors: usize,
    /// Fixes the split and every generator's draws
    pub seed: Option<u64>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            images_subdir: "train".to_string(),
            masks_subdir: "train_masks".to_string(),
            img_width: DEFAULT_IMG_WIDTH,
            aspect_ratio: DEFAULT_ASPECT_RATIO,
            batch_size: DEFAULT_BATCH_SIZE,
            augment: true,
            num_colors: DEFAULT_NUM_COLORS,
            seed: None,
        }
    }
}

impl FactoryConfig {
    pub fn builder() -> FactoryConfigBuilder {
        FactoryConfigBuilder::default()
    }

    /// Reads a JSON config; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn images_dir(&self) -> PathBuf {
        self.data_root.join(&self.images_subdir)
    }

    pub fn masks_dir(&self) -> PathBuf {
        self.data_root.join(&self.masks_subdir)
    }

    pub fn img_dim(&self) -> Result<ImageDim> {
        ImageDim::from_width(self.img_width, self.aspect_ratio)
    }

    pub fn partitioner(&self) -> DatasetPartitioner {
        let partitioner = DatasetPartitioner::new(self.images_dir(), self.masks_dir());
        match self.seed {
            Some(seed) => partitioner.with_seed(seed),
            None => partitioner,
        }
    }

    fn generator_config(&self, img_dim: ImageDim, augment: bool, offset: u64) -> GeneratorConfig {
        GeneratorConfig::builder()
            .batch_size(self.batch_size)
            .img_dim(img_dim)
            .augment(augment)
            .num_colors(self.num_colors)
            .maybe_seed(self.seed.map(|s| s.wrapping_add(offset)))
            .build()
    }
}

#[derive(Default)]
pub struct FactoryConfigBuilder {
    config: FactoryConfig,
}

impl FactoryConfigBuilder {
    pub fn data_root(mut self, data_root: impl Into<PathBuf>) -> Self {
        self.config.data_root = data_root.into();
        self
    }

    pub fn subdirs(mut self, images: impl Into<String>, masks: impl Into<String>) -> Self {
        self.config.images_subdir = images.into();
        self.config.masks_subdir = masks.into();
        self
    }

    pub fn img_width(mut self, img_width: u32) -> Self {
        self.config.img_width = img_width;
        self
    }

    pub fn aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        self.config.aspect_ratio = aspect_ratio;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn augment(mut self, augment: bool) -> Self {
        self.config.augment = augment;
        self
    }

    pub fn num_colors(mut self, num_colors: usize) -> Self {
        self.config.num_colors = num_colors;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn build(self) -> FactoryConfig {
        self.config
    }
}

/// The three generators plus the partitions they draw from.
pub struct GeneratorSet {
    pub train: BatchGenerator,
    pub validation: BatchGenerator,
    pub test: BatchGenerator,
    pub partitions: PartitionSet,
}

impl GeneratorSet {
    /// `(train, validation, test)`.
    pub fn into_tuple(self) -> (BatchGenerator, BatchGenerator, BatchGenerator) {
        (self.train, self.validation, self.test)
    }
}

/// Partitions `config.data_root` and returns the train, validation and test
/// generators.
///
/// Only the training generator augments, and only when `config.augment` is
/// set. With a seed, the partitioner uses it as is and the generators use
/// `seed`, `seed + 1` and `seed + 2`.
///
/// # Example
/// ```ignore
/// let config = FactoryConfig::builder().data_root("data").batch_size(4).seed(7).build();
/// let (mut train, mut val, _test) = get_generators(&config)?.into_tuple();
/// let batch = train.next_batch()?;
/// ```
pub fn get_generators(config: &FactoryConfig) -> Result<GeneratorSet> {
    let img_dim = config.img_dim().context("Invalid image size")?;
    let partitions = config
        .partitioner()
        .partition()
        .with_context(|| format!("Failed to partition {}", config.data_root.display()))?;

    let train = BatchGenerator::named(
        "train",
        partitions.train.clone(),
        config.generator_config(img_dim, config.augment, 0),
    )?;
    let validation = BatchGenerator::named(
        "validation",
        partitions.validation.clone(),
        config.generator_config(img_dim, false, 1),
    )?;
    let test = BatchGenerator::named(
        "test",
        partitions.test.clone(),
        config.generator_config(img_dim, false, 2),
    )?;

    info!(
        data_root = %config.data_root.display(),
        height = img_dim.height,
        width = img_dim.width,
        batch_size = config.batch_size,
        "generators ready"
    );

    Ok(GeneratorSet {
        train,
        validation,
        test,
        partitions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() -> Result<()> {
        let config = FactoryConfig::default();
        assert_eq!(config.img_dim()?, ImageDim::new(171, 256));
        assert_eq!(config.images_dir(), PathBuf::from("data/train"));
        assert_eq!(config.masks_dir(), PathBuf::from("data/train_masks"));
        assert_eq!(config.batch_size, 2);
        assert!(config.augment);
        Ok(())
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> Result<()> {
        let config: FactoryConfig =
            serde_json::from_str(r#"{ "img_width": 128, "seed": 5, "augment": false }"#)?;
        assert_eq!(config.img_width, 128);
        assert_eq!(config.seed, Some(5));
        assert!(!config.augment);
        assert_eq!(config.num_colors, 8);
        assert_eq!(config.img_dim()?, ImageDim::new(85, 128));
        Ok(())
    }

    #[test]
    fn test_generator_seeds_are_offset() {
        let config = FactoryConfig::builder().seed(u64::MAX).build();
        let dim = ImageDim::new(2, 2);
        assert_eq!(config.generator_config(dim, true, 0).seed, Some(u64::MAX));
        assert_eq!(config.generator_config(dim, false, 1).seed, Some(0));

        let unseeded = FactoryConfig::default();
        assert_eq!(unseeded.generator_config(dim, false, 2).seed, None);
    }

    #[test]
    fn test_missing_data_root_is_an_error() {
        let config = FactoryConfig::builder().data_root("no/such/root").build();
        assert!(get_generators(&config).is_err());
    }
}
