//! Image/mask transforms used by the batch generator.
//!
//! Every stage after loading operates on an [`ImageMaskPair`] so the image and
//! its mask can never drift apart.
//!
//! ```text
//! transforms/vision/
//! ├── io.rs            → LoadImage, LoadPair, ImageMaskPair
//! ├── geometric.rs     → ResizePair
//! ├── augmentation.rs  → RandomAugmentation (flip, rotate, shift, zoom, shear, quantize)
//! ├── quantize.rs      → ColorQuantizer (k-means palette reduction)
//! └── conversion.rs    → ToTensor, MaskToTensor, PairToSample
//! ```
//!
//! ```ignore
//! use crate::transforms::Transform;
//! use crate::transforms::vision::*;
//! use image::imageops::FilterType;
//!
//! let pipeline = LoadPair::new()
//!     .then(ResizePair::new(171, 256, FilterType::Triangle)?)
//!     .then(RandomAugmentation::new(AugmentationConfig::default())?)
//!     .then(PairToSample);
//! ```

pub mod augmentation;
pub mod conversion;
pub mod geometric;
pub mod io;
pub mod quantize;

pub use augmentation::{random_augmentation, AugmentationConfig, RandomAugmentation};
pub use conversion::{MaskToTensor, PairToSample, ToTensor};
pub use geometric::ResizePair;
pub use io::{ImageMaskPair, LoadImage, LoadPair};
pub use quantize::ColorQuantizer;
