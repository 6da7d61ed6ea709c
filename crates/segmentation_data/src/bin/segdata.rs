//! Command-line front end: inspect the train/validation/test split and
//! preview generated batches.
//!
//! ```text
//! segdata split   --data-root data --seed 7
//! segdata preview --data-root data --batch-size 4 --steps 3 --no-augment
//! segdata preview --config generators.json --verbose
//! ```

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use segmentation_data::{get_generators, BatchGenerator, FactoryConfig, SegmentationBatch};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "segdata")]
#[command(about = "Image/mask batch generation for segmentation training", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Partition the data directory and print the split sizes
    Split {
        #[command(flatten)]
        data: DataArgs,

        /// Also print the file pairs of every partition
        #[arg(long)]
        list: bool,
    },

    /// Build the generators and print a few batches from each
    Preview {
        #[command(flatten)]
        data: DataArgs,

        /// Batches to draw per generator
        #[arg(long, default_value = "1")]
        steps: usize,
    },
}

/// Generator settings. Flags override values read from `--config`.
#[derive(Args)]
struct DataArgs {
    /// JSON file with a FactoryConfig
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding `train/` and `train_masks/`
    #[arg(short, long)]
    data_root: Option<PathBuf>,

    /// Resize width (height follows the aspect ratio, default 256)
    #[arg(long)]
    img_width: Option<u32>,

    /// Height / width of the resize target
    #[arg(long)]
    aspect_ratio: Option<f64>,

    /// Samples per batch (default 2)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Palette size for color quantization (default 8)
    #[arg(long)]
    num_colors: Option<usize>,

    /// Disable augmentation of training batches
    #[arg(long)]
    no_augment: bool,

    /// Seed for the split and every generator
    #[arg(short, long)]
    seed: Option<u64>,
}

impl DataArgs {
    fn resolve(&self) -> Result<FactoryConfig> {
        let mut config = match &self.config {
            Some(path) => FactoryConfig::from_json_file(path)?,
            None => FactoryConfig::default(),
        };
        if let Some(data_root) = &self.data_root {
            config.data_root = data_root.clone();
        }
        if let Some(img_width) = self.img_width {
            config.img_width = img_width;
        }
        if let Some(aspect_ratio) = self.aspect_ratio {
            config.aspect_ratio = aspect_ratio;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(num_colors) = self.num_colors {
            config.num_colors = num_colors;
        }
        if self.no_augment {
            config.augment = false;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        Ok(config)
    }
}

fn setup_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .context("Failed to initialize logger")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Split { data, list } => split(&data.resolve()?, list),
        Commands::Preview { data, steps } => preview(&data.resolve()?, steps),
    }
}

fn split(config: &FactoryConfig, list: bool) -> Result<()> {
    let partitions = config.partitioner().partition()?;
    let (train, validation, test) = partitions.summary();
    println!(
        "{} pairs: train {}, validation {}, test {}",
        partitions.total(),
        train,
        validation,
        test
    );

    if list {
        for (name, partition) in [
            ("train", &partitions.train),
            ("validation", &partitions.validation),
            ("test", &partitions.test),
        ] {
            println!("[{}]", name);
            for (image, mask) in partition.iter() {
                println!("  {}  {}", image.display(), mask.display());
            }
        }
    }
    Ok(())
}

fn preview(config: &FactoryConfig, steps: usize) -> Result<()> {
    let generators = get_generators(config)?;
    info!(steps, "previewing batches");

    let (mut train, mut validation, mut test) = generators.into_tuple();
    for generator in [&mut train, &mut validation, &mut test] {
        preview_generator(generator, steps)?;
    }
    Ok(())
}

fn preview_generator(generator: &mut BatchGenerator, steps: usize) -> Result<()> {
    for _ in 0..steps {
        let step = generator.step();
        let batch = generator
            .next_batch()
            .with_context(|| format!("{} generator failed at step {}", generator.name(), step))?;
        println!("{:<10} step {:>3}  {}", generator.name(), step, describe(&batch));
    }
    Ok(())
}

fn describe(batch: &SegmentationBatch) -> String {
    format!(
        "images {:?} in [{:.3}, {:.3}]  masks {:?} in [{:.3}, {:.3}]",
        batch.images.size(),
        batch.images.min().double_value(&[]),
        batch.images.max().double_value(&[]),
        batch.masks.size(),
        batch.masks.min().double_value(&[]),
        batch.masks.max().double_value(&[]),
    )
}
