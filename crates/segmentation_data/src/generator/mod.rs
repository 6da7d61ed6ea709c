//! Infinite batch generators over one dataset partition.
//!
//! Every call to [`BatchGenerator::next_batch`] draws `batch_size` indices
//! uniformly at random (with replacement by default), loads each pair through
//! the per-sample pipeline
//!
//! ```text
//! (image path, mask path)
//!   → LoadPair → ResizePair → RandomAugmentation → PairToSample
//! ```
//!
//! and stacks the results into `images: [N, H, W, 3]` and `masks: [N, H, W, 1]`.
//! There are no epochs: the generator never runs out.
//!
//! # Seed Handling
//! With `config.seed = Some(s)`, step `k` draws its indices from `s + k` and
//! seeds this thread's augmentation RNG from a salted `s` plus `k`. Two
//! generators built with the same seed over the same partition yield identical
//! batches. Without a seed, indices come from a random base seed and
//! augmentation draws from `rand::rng()`.

mod config;
pub mod rng;

pub use config::{
    GeneratorConfig, GeneratorConfigBuilder, ImageDim, DEFAULT_ASPECT_RATIO, DEFAULT_BATCH_SIZE,
    DEFAULT_IMG_WIDTH, DEFAULT_NUM_COLORS,
};

use crate::batch::SegmentationBatch;
use crate::partition::FilenamePartition;
use crate::sample::SegmentationSample;
use crate::sampler::{RandomSampler, Sampler};
use crate::transforms::vision::{LoadPair, PairToSample, RandomAugmentation, ResizePair};
use crate::transforms::Transform;
use anyhow::{anyhow, ensure, Context, Result};
use rng::{clear_step_rng, init_step_rng};
use std::iter::Take;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Keeps the augmentation stream independent of the index stream when both
/// derive from the same user seed.
const AUGMENT_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

type PairPipeline = Box<dyn Transform<(PathBuf, PathBuf), SegmentationSample>>;

/// Endless source of [`SegmentationBatch`]es drawn from one partition.
///
/// Also an [`Iterator`] whose `next()` always returns `Some`; bound it with
/// [`take_steps`](Self::take_steps) or `.take(n)`.
///
/// # Example
/// ```ignore
/// let config = GeneratorConfig::builder().batch_size(4).augment(true).seed(7).build();
/// let mut train = BatchGenerator::new(partitions.train.clone(), config)?;
/// for batch in train.take_steps(100) {
///     let batch = batch?;
///     // batch.images: [4, 171, 256, 3], batch.masks: [4, 171, 256, 1]
/// }
/// ```
pub struct BatchGenerator {
    name: String,
    partition: Arc<FilenamePartition>,
    sampler: RandomSampler,
    pipeline: PairPipeline,
    config: GeneratorConfig,
    step: usize,
}

impl BatchGenerator {
    pub fn new(partition: Arc<FilenamePartition>, config: GeneratorConfig) -> Result<Self> {
        Self::named("generator", partition, config)
    }

    /// Like [`new`](Self::new), labelled `name` in log output (`train`,
    /// `validation`, ...).
    pub fn named(
        name: impl Into<String>,
        partition: Arc<FilenamePartition>,
        config: GeneratorConfig,
    ) -> Result<Self> {
        config.validate().context("Invalid generator config")?;
        ensure!(
            !partition.is_empty(),
            "Cannot build a batch generator over an empty partition"
        );

        let base_seed = config.seed.unwrap_or_else(rand::random);
        let sampler = RandomSampler::new(
            partition.len(),
            config.replacement,
            Some(config.batch_size),
            base_seed,
        )
        .context("Failed to create index sampler")?;

        let pipeline: PairPipeline = Box::new(
            LoadPair::new()
                .then(ResizePair::new(
                    config.img_dim.height,
                    config.img_dim.width,
                    config.filter,
                )?)
                .then(RandomAugmentation::new(config.augmentation_config())?)
                .then(PairToSample),
        );

        let generator = Self {
            name: name.into(),
            partition,
            sampler,
            pipeline,
            config,
            step: 0,
        };
        info!(
            generator = %generator.name,
            pairs = generator.partition.len(),
            batch_size = generator.config.batch_size,
            augment = generator.config.augment,
            replacement = generator.config.replacement,
            height = generator.config.img_dim.height,
            width = generator.config.img_dim.width,
            "batch generator ready"
        );
        Ok(generator)
    }

    /// Relabels this generator in later log output.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Pairs in the underlying partition.
    pub fn len(&self) -> usize {
        self.partition.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partition.is_empty()
    }

    pub fn partition(&self) -> &Arc<FilenamePartition> {
        &self.partition
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Number of batches produced so far (including failed ones).
    pub fn step(&self) -> usize {
        self.step
    }

    /// Produces the next batch.
    ///
    /// A missing or undecodable file fails this call only; the generator
    /// stays usable and the following call moves on to the next step.
    pub fn next_batch(&mut self) -> Result<SegmentationBatch> {
        let step = self.step;
        self.step += 1;

        if let Some(seed) = self.config.seed {
            init_step_rng(seed ^ AUGMENT_SEED_SALT, step);
        }
        let indices: Vec<usize> = self.sampler.iter(step).collect();
        debug!(generator = %self.name, step, ?indices, "drawing batch");

        let samples = indices
            .iter()
            .map(|&index| self.load_sample(index))
            .collect::<Result<Vec<_>>>();
        clear_step_rng();

        let samples =
            samples.with_context(|| format!("{} batch at step {} failed", self.name, step))?;
        SegmentationBatch::collate(&samples)
    }

    /// An iterator over the next `n` batches.
    pub fn take_steps(&mut self, n: usize) -> Take<&mut Self> {
        self.by_ref().take(n)
    }

    fn load_sample(&self, index: usize) -> Result<SegmentationSample> {
        let (image, mask) = self
            .partition
            .pair(index)
            .ok_or_else(|| anyhow!("Index {} out of bounds for {} pairs", index, self.len()))?;
        self.pipeline
            .apply((image.to_path_buf(), mask.to_path_buf()))
            .with_context(|| format!("Failed to load pair {} ({})", index, image.display()))
    }
}

impl Iterator for BatchGenerator {
    type Item = Result<SegmentationBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_batch())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Mutex;
    use tracing_subscriber::fmt::MakeWriter;

    /// Collects formatted log lines in memory.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn logs_while(f: impl FnOnce()) -> String {
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        logs.text()
    }

    fn missing_files(n: usize) -> Arc<FilenamePartition> {
        Arc::new(
            FilenamePartition::new(
                (0..n).map(|i| PathBuf::from(format!("missing/{}.png", i))).collect(),
                (0..n).map(|i| PathBuf::from(format!("missing/{}_mask.png", i))).collect(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_rejects_empty_partition_and_zero_batch() {
        let config = GeneratorConfig::default();
        assert!(BatchGenerator::new(missing_files(0), config).is_err());

        let config = GeneratorConfig::builder().batch_size(0).build();
        assert!(BatchGenerator::new(missing_files(3), config).is_err());
    }

    #[test]
    fn test_missing_file_fails_one_step_only() -> Result<()> {
        let config = GeneratorConfig::builder().batch_size(2).seed(1).build();
        let mut generator = BatchGenerator::new(missing_files(3), config)?.with_name("train");
        assert_eq!(generator.name(), "train");

        let err = generator.next_batch().unwrap_err();
        assert!(format!("{:#}", err).contains("missing/"));
        assert!(generator.next_batch().is_err());
        assert_eq!(generator.step(), 2);
        Ok(())
    }

    #[test]
    fn test_construction_is_logged_once() {
        let plain = logs_while(|| {
            BatchGenerator::new(missing_files(2), GeneratorConfig::default()).unwrap();
        });
        assert_eq!(plain.matches("batch generator ready").count(), 1);
        assert!(plain.contains("generator=generator"));

        let named = logs_while(|| {
            BatchGenerator::named("validation", missing_files(2), GeneratorConfig::default())
                .unwrap();
        });
        assert_eq!(named.matches("batch generator ready").count(), 1);
        assert!(named.contains("generator=validation"));
    }

    #[test]
    fn test_iterator_never_ends() -> Result<()> {
        let mut generator = BatchGenerator::new(missing_files(1), GeneratorConfig::default())?;
        assert_eq!(generator.size_hint().1, None);
        assert_eq!(generator.take_steps(5).count(), 5);
        assert!(generator.next().is_some());
        assert_eq!(generator.step(), 6);
        Ok(())
    }
}
