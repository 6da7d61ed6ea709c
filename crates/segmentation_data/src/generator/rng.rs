//! Thread-local randomness for per-sample transforms.
//!
//! Augmentation stages take `&self`, so they cannot own an RNG. Instead they
//! draw from a thread-local `StdRng` that the generator reseeds at the start of
//! every step when it was given a seed. Without a seed, draws fall back to
//! `rand::rng()`.

use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::rngs::StdRng;
use rand::Rng as _;
use rand::SeedableRng;
use std::cell::RefCell;

thread_local! {
    /// RNG for the batch step currently running on this thread.
    pub static STEP_RNG: RefCell<Option<StdRng>> = const { RefCell::new(None) };
}

/// Seeds this thread's step RNG with `base_seed + step`.
pub fn init_step_rng(base_seed: u64, step: usize) {
    STEP_RNG.with(|rng| {
        let seed = base_seed.wrapping_add(step as u64);
        *rng.borrow_mut() = Some(StdRng::seed_from_u64(seed));
    })
}

/// Drops the seeded RNG so later draws use `rand::rng()`.
pub fn clear_step_rng() {
    STEP_RNG.with(|rng| *rng.borrow_mut() = None)
}

/// Bernoulli draw. `p` must be in `[0, 1]`.
pub fn step_gen_bool(p: f64) -> bool {
    STEP_RNG.with(|rng| match rng.borrow_mut().as_mut() {
        Some(rng) => rng.random_bool(p),
        None => rand::rng().random_bool(p),
    })
}

/// Uniform draw from `range`.
pub fn step_gen_range<T, R>(range: R) -> T
where
    T: SampleUniform,
    R: SampleRange<T>,
{
    STEP_RNG.with(|rng| match rng.borrow_mut().as_mut() {
        Some(rng) => rng.random_range(range),
        None => rand::rng().random_range(range),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw_many() -> Vec<u32> {
        (0..16).map(|_| step_gen_range(0..1000u32)).collect()
    }

    #[test]
    fn test_same_seed_and_step_repeat() {
        init_step_rng(7, 3);
        let first = draw_many();
        init_step_rng(7, 3);
        let second = draw_many();
        clear_step_rng();
        assert_eq!(first, second);
    }

    #[test]
    fn test_steps_get_distinct_streams() {
        init_step_rng(7, 0);
        let step0 = draw_many();
        init_step_rng(7, 1);
        let step1 = draw_many();
        clear_step_rng();
        assert_ne!(step0, step1);
    }

    #[test]
    fn test_certain_probabilities() {
        init_step_rng(1, 0);
        assert!((0..32).all(|_| step_gen_bool(1.0)));
        assert!((0..32).all(|_| !step_gen_bool(0.0)));
        clear_step_rng();
        assert!(!step_gen_bool(0.0));
    }
}
