//! Train / validation / test partitioning of an image directory and its
//! mask directory.
//!
//! Both directories are listed and sorted; the i-th image is paired with the
//! i-th mask. The pairs are then split twice:
//!
//! ```text
//! all pairs ──(test 10%)──► test
//!     └─ rest ──(11.111%)──► validation
//!           └─ rest ────────► train        (≈ 80 / 10 / 10)
//! ```
//!
//! Misaligned file names with equal counts are not detected; keeping the two
//! directories' sort orders consistent is up to the caller.

use crate::readers::{ImageDirSource, DEFAULT_IMAGE_EXTENSIONS};
use anyhow::{ensure, Context, Result};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Fraction of all pairs held out for testing.
pub const TEST_FRACTION: f64 = 0.10;
/// Fraction of the non-test pairs held out for validation (≈10% of the total).
pub const VALIDATION_FRACTION: f64 = 0.11111;

/// Index-aligned image and mask paths: `images[i]` belongs to `masks[i]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilenamePartition {
    images: Vec<PathBuf>,
    masks: Vec<PathBuf>,
}

impl FilenamePartition {
    pub fn new(images: Vec<PathBuf>, masks: Vec<PathBuf>) -> Result<Self> {
        ensure!(
            images.len() == masks.len(),
            "Found {} images but {} masks; every image needs exactly one mask",
            images.len(),
            masks.len()
        );
        Ok(Self { images, masks })
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub fn masks(&self) -> &[PathBuf] {
        &self.masks
    }

    /// The `(image, mask)` paths at `index`.
    pub fn pair(&self, index: usize) -> Option<(&Path, &Path)> {
        Some((
            self.images.get(index)?.as_path(),
            self.masks.get(index)?.as_path(),
        ))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.images
            .iter()
            .zip(&self.masks)
            .map(|(i, m)| (i.as_path(), m.as_path()))
    }

    fn select(&self, indices: &[usize]) -> Self {
        Self {
            images: indices.iter().map(|&i| self.images[i].clone()).collect(),
            masks: indices.iter().map(|&i| self.masks[i].clone()).collect(),
        }
    }
}

/// Shuffles `partition` and moves `ceil(test_fraction * n)` pairs to the
/// held-out side. Returns `(train, test)`.
///
/// Both sides must end up non-empty.
pub fn train_test_split<R: Rng + ?Sized>(
    partition: &FilenamePartition,
    test_fraction: f64,
    rng: &mut R,
) -> Result<(FilenamePartition, FilenamePartition)> {
    ensure!(
        test_fraction > 0.0 && test_fraction < 1.0,
        "test_fraction must be in (0.0, 1.0) (got {})",
        test_fraction
    );
    let n = partition.len();
    let n_test = (test_fraction * n as f64).ceil() as usize;
    ensure!(
        n_test > 0 && n_test < n,
        "Splitting {} pairs with test_fraction={} leaves an empty side",
        n,
        test_fraction
    );

    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let (test_idx, train_idx) = order.split_at(n_test);
    Ok((partition.select(train_idx), partition.select(test_idx)))
}

/// The three disjoint partitions, shared read-only with the generators.
#[derive(Debug, Clone)]
pub struct PartitionSet {
    pub train: Arc<FilenamePartition>,
    pub validation: Arc<FilenamePartition>,
    pub test: Arc<FilenamePartition>,
}

impl PartitionSet {
    /// `(train, validation, test)` sizes.
    pub fn summary(&self) -> (usize, usize, usize) {
        (self.train.len(), self.validation.len(), self.test.len())
    }

    pub fn total(&self) -> usize {
        self.train.len() + self.validation.len() + self.test.len()
    }
}

/// Reads an image directory and a mask directory and splits them into
/// train / validation / test.
///
/// # Example
/// ```ignore
/// let partitions = DatasetPartitioner::new("data/train", "data/train_masks")
///     .with_seed(7)
///     .partition()?;
/// assert_eq!(partitions.total(), 100);
/// ```
#[derive(Debug, Clone)]
pub struct DatasetPartitioner {
    images: ImageDirSource,
    masks: ImageDirSource,
    test_fraction: f64,
    validation_fraction: f64,
    seed: Option<u64>,
}

impl DatasetPartitioner {
    pub fn new(images_dir: impl Into<PathBuf>, masks_dir: impl Into<PathBuf>) -> Self {
        Self::from_sources(
            ImageDirSource::new(images_dir, DEFAULT_IMAGE_EXTENSIONS, false),
            ImageDirSource::new(masks_dir, DEFAULT_IMAGE_EXTENSIONS, false),
        )
    }

    pub fn from_sources(images: ImageDirSource, masks: ImageDirSource) -> Self {
        Self {
            images,
            masks,
            test_fraction: TEST_FRACTION,
            validation_fraction: VALIDATION_FRACTION,
            seed: None,
        }
    }

    /// Fixes the shuffle so the same directories always split the same way.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_fractions(mut self, test_fraction: f64, validation_fraction: f64) -> Self {
        self.test_fraction = test_fraction;
        self.validation_fraction = validation_fraction;
        self
    }

    /// Lists both directories into one aligned partition without splitting.
    pub fn load_all(&self) -> Result<FilenamePartition> {
        let images = self.images.list_sorted().context("Failed to list images")?;
        let masks = self.masks.list_sorted().context("Failed to list masks")?;
        let all = FilenamePartition::new(images, masks).with_context(|| {
            format!(
                "{} and {} do not pair up",
                self.images.dir_path().display(),
                self.masks.dir_path().display()
            )
        })?;
        ensure!(
            !all.is_empty(),
            "No images found in {}",
            self.images.dir_path().display()
        );
        Ok(all)
    }

    pub fn partition(&self) -> Result<PartitionSet> {
        let all = self.load_all()?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };

        let (rest, test) = train_test_split(&all, self.test_fraction, &mut rng)
            .context("Failed to hold out the test partition")?;
        let (train, validation) = train_test_split(&rest, self.validation_fraction, &mut rng)
            .context("Failed to hold out the validation partition")?;

        let set = PartitionSet {
            train: Arc::new(train),
            validation: Arc::new(validation),
            test: Arc::new(test),
        };
        let (n_train, n_val, n_test) = set.summary();
        info!(
            total = all.len(),
            train = n_train,
            validation = n_val,
            test = n_test,
            "partitioned dataset"
        );
        Ok(set)
    }
}
