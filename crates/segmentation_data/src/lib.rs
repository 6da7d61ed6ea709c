//! Endless, randomly augmented image/mask batches for segmentation training.
//!
//! ```ignore
//! use segmentation_data::{get_generators, FactoryConfig};
//!
//! let config = FactoryConfig::builder().data_root("data").batch_size(4).build();
//! let (mut train, mut val, _test) = get_generators(&config)?.into_tuple();
//! let batch = train.next_batch()?; // images [4, 171, 256, 3], masks [4, 171, 256, 1]
//! ```

pub mod batch;
pub mod factory;
pub mod generator;
pub mod partition;
pub mod readers;
pub mod sample;
pub mod sampler;
pub mod transforms;

pub use batch::SegmentationBatch;
pub use factory::{get_generators, FactoryConfig, GeneratorSet};
pub use generator::{BatchGenerator, GeneratorConfig, ImageDim};
pub use partition::{DatasetPartitioner, FilenamePartition, PartitionSet};
pub use sample::SegmentationSample;
pub use sampler::{RandomSampler, Sampler};
