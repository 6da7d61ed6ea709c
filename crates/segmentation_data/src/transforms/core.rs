use anyhow::{Context, Result};
use std::marker::PhantomData;

/// A single stage of the per-sample loading pipeline.
///
/// A `Transform<I, O>` turns one input of type `I` into an output of type
/// `O`. Stages are composed with `.then(...)`, so a whole
/// "load → resize → augment → tensor" pipeline is one concrete value:
///
/// ```ignore
/// let pipeline = LoadPair::new()
///     .then(ResizePair::new(171, 256, FilterType::Triangle)?)
///     .then(RandomAugmentation::new(AugmentationConfig::default())?)
///     .then(PairToSample);
/// let sample = pipeline.apply((image_path, mask_path))?;
/// ```
///
/// `then()` requires the output of `self` to match the input of `next`.
/// Randomized stages draw from [`crate::generator::rng`], never from their own state,
/// so `apply` takes `&self`.
pub trait Transform<I, O>: Send + Sync {
    /// Applies the transformation to the input
    fn apply(&self, input: I) -> Result<O>;

    #[inline]
    fn then<T, M>(self, next: T) -> Chain<Self, T, O>
    where
        Self: Sized,
        T: Transform<O, M>,
        O: Send,
        M: Send,
    {
        Chain {
            first: self,
            second: next,
            _marker: PhantomData,
        }
    }
}

/// Two transforms run back to back (`A` then `B`).
/// `PhantomData<M>` pins the intermediate type.
#[derive(Debug)]
pub struct Chain<A, B, M> {
    first: A,
    second: B,
    _marker: PhantomData<fn() -> M>,
}

impl<A, B, M> Chain<A, B, M> {
    pub fn new(first: A, second: B) -> Self {
        Self {
            first,
            second,
            _marker: PhantomData,
        }
    }
}

impl<I, M, O, A, B> Transform<I, O> for Chain<A, B, M>
where
    A: Transform<I, M>,
    B: Transform<M, O>,
    M: Send,
{
    fn apply(&self, input: I) -> Result<O> {
        let mid = self.first.apply(input)?;
        self.second.apply(mid).with_context(|| {
            format!(
                "Pipeline stage {} failed after {}",
                std::any::type_name::<B>(),
                std::any::type_name::<A>()
            )
        })
    }
}
