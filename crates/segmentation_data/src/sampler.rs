use anyhow::{ensure, Result};
use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A `Sampler` decides which partition indices make up one draw.
///
/// `iter(step)` is a pure function of the sampler's seed and `step`, so a
/// generator replaying the same step gets the same indices.
pub trait Sampler: Send + Sync {
    type Item: Send + Sync;

    fn iter(&self, step: usize) -> Box<dyn Iterator<Item = Self::Item> + Send + '_>;
}

/// ============================================================================
/// Uniform random draws of `num_samples` indices from `0..dataset_size`.
///
/// # Arguments:
/// - `dataset_size`: Number of pairs in the partition.
/// - `replacement`: If `true`, every draw is independent, so a batch may repeat
///                  an index and coverage is only uniform in expectation.
///                  If `false`, a draw holds distinct indices.
/// - `num_samples`: Indices per draw (defaults to `dataset_size` if `None`).
///                  Without replacement it must not exceed `dataset_size`.
/// - `base_seed`: Base RNG seed.
///
/// # Seed Handling
/// Step `k` uses an RNG seeded with `base_seed + k`: every step draws fresh
/// indices, and a fixed `base_seed` replays the same sequence.
///
/// # Example usage
/// ```ignore
/// // Four indices per batch, repeats allowed
/// let sampler = RandomSampler::new(80, true, Some(4), 42)?;
/// let first: Vec<usize> = sampler.iter(0).collect();
/// ```
#[derive(Debug, Clone)]
pub struct RandomSampler {
    dataset_size: usize,
    replacement: bool,
    num_samples: usize,
    base_seed: u64,
}

impl RandomSampler {
    pub fn new(
        dataset_size: usize,
        replacement: bool,
        num_samples: Option<usize>,
        base_seed: u64,
    ) -> Result<Self> {
        ensure!(dataset_size > 0, "Cannot sample from an empty partition");
        let num_samples = num_samples.unwrap_or(dataset_size);
        ensure!(
            num_samples > 0,
            "num_samples must be a positive integer value, but got num_samples={}",
            num_samples
        );

        if !replacement {
            ensure!(
                num_samples <= dataset_size,
                "num_samples ({}) exceeds dataset size ({}) without replacement",
                num_samples,
                dataset_size
            );
        }

        Ok(Self {
            dataset_size,
            replacement,
            num_samples,
            base_seed,
        })
    }

    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    #[inline]
    fn derive_rng_for_step(&self, step: usize) -> StdRng {
        StdRng::seed_from_u64(self.base_seed.wrapping_add(step as u64))
    }
}

impl Sampler for RandomSampler {
    type Item = usize;

    fn iter(&self, step: usize) -> Box<dyn Iterator<Item = usize> + Send + '_> {
        let mut rng = self.derive_rng_for_step(step);
        if self.replacement {
            Box::new((0..self.num_samples).map(move |_| rng.random_range(0..self.dataset_size)))
        } else {
            let mut indices: Vec<_> = (0..self.dataset_size).collect();
            indices.shuffle(&mut rng);
            indices.truncate(self.num_samples);
            Box::new(indices.into_iter())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const TEST_SEED: u64 = 42;

    #[test]
    fn validates_parameters() {
        assert!(RandomSampler::new(10, true, Some(4), TEST_SEED).is_ok());
        assert!(RandomSampler::new(0, true, Some(4), TEST_SEED).is_err());
        assert!(RandomSampler::new(10, true, Some(0), TEST_SEED).is_err());
        assert!(RandomSampler::new(10, false, Some(11), TEST_SEED).is_err());
    }

    #[test]
    fn with_replacement_may_exceed_dataset_size() {
        let sampler = RandomSampler::new(3, true, Some(50), TEST_SEED).unwrap();
        let draws: Vec<_> = sampler.iter(0).collect();
        assert_eq!(draws.len(), 50);
        assert!(draws.iter().all(|&i| i < 3));
        // 50 draws over 3 indices must repeat.
        assert!(HashSet::<_>::from_iter(draws).len() <= 3);
    }

    #[test]
    fn without_replacement_draws_distinct_indices() {
        let sampler = RandomSampler::new(20, false, Some(20), TEST_SEED).unwrap();
        let draws: Vec<_> = sampler.iter(5).collect();
        assert_eq!(HashSet::<_>::from_iter(draws).len(), 20);
    }

    #[test]
    fn same_step_replays_and_steps_differ() {
        let sampler = RandomSampler::new(1000, true, Some(8), TEST_SEED).unwrap();
        let a: Vec<_> = sampler.iter(3).collect();
        let b: Vec<_> = sampler.iter(3).collect();
        let c: Vec<_> = sampler.iter(4).collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn every_index_is_reachable() {
        let sampler = RandomSampler::new(5, true, Some(4), TEST_SEED).unwrap();
        let seen: HashSet<usize> = (0..100).flat_map(|step| sampler.iter(step)).collect();
        assert_eq!(seen, (0..5).collect());
    }
}
