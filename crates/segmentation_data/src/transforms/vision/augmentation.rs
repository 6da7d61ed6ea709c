use super::io::ImageMaskPair;
use super::quantize::ColorQuantizer;
use crate::generator::rng::{step_gen_bool, step_gen_range};
use crate::transforms::Transform;
use anyhow::{anyhow, ensure, Result};
use image::{imageops, Luma, Rgb};
use imageproc::geometric_transformations::{warp, Interpolation, Projection};
use serde::{Deserialize, Serialize};

// ============================================================================
// AugmentationConfig
// ============================================================================

/// Probabilities and ranges for [`RandomAugmentation`].
///
/// Every `*_chance` is the probability that the transform runs for a given
/// sample. Ranges are symmetric around "no change":
/// - `rotate_range`: degrees, angle drawn from `[-r, r]`
/// - `shift_range`: fraction of width/height, offset drawn from `[-s, s]`
/// - `zoom_range`: scale factor drawn from `[1 - z, 1 + z]`
/// - `shear_range`: horizontal shear factor drawn from `[-s, s]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentationConfig {
    pub flip_chance: f64,
    pub rotate_chance: f64,
    pub rotate_range: f32,
    pub shift_chance: f64,
    pub shift_range: f32,
    pub zoom_chance: f64,
    pub zoom_range: f32,
    pub shear_chance: f64,
    pub shear_range: f32,
    /// Enables color quantization of the image (never the mask).
    pub color_quantize: bool,
    pub quantize_chance: f64,
    pub num_colors: usize,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self {
            flip_chance: 0.5,
            rotate_chance: 0.5,
            rotate_range: 15.0,
            shift_chance: 0.5,
            shift_range: 0.1,
            zoom_chance: 0.5,
            zoom_range: 0.1,
            shear_chance: 0.5,
            shear_range: 0.1,
            color_quantize: true,
            quantize_chance: 0.5,
            num_colors: 8,
        }
    }
}

impl AugmentationConfig {
    /// Every chance forced to zero and quantization off: the pass-through
    /// used for validation and test batches.
    pub fn disabled(num_colors: usize) -> Self {
        Self {
            flip_chance: 0.0,
            rotate_chance: 0.0,
            shift_chance: 0.0,
            zoom_chance: 0.0,
            shear_chance: 0.0,
            color_quantize: false,
            num_colors,
            ..Self::default()
        }
    }

    pub fn with_num_colors(mut self, num_colors: usize) -> Self {
        self.num_colors = num_colors;
        self
    }

    /// True when applying this config can never change a sample.
    pub fn is_identity(&self) -> bool {
        self.flip_chance == 0.0
            && self.rotate_chance == 0.0
            && self.shift_chance == 0.0
            && self.zoom_chance == 0.0
            && self.shear_chance == 0.0
            && !(self.color_quantize && self.quantize_chance > 0.0)
    }

    fn validate(&self) -> Result<()> {
        for (name, p) in [
            ("flip_chance", self.flip_chance),
            ("rotate_chance", self.rotate_chance),
            ("shift_chance", self.shift_chance),
            ("zoom_chance", self.zoom_chance),
            ("shear_chance", self.shear_chance),
            ("quantize_chance", self.quantize_chance),
        ] {
            ensure!(
                (0.0..=1.0).contains(&p),
                "{} must be in [0.0, 1.0] range (got {})",
                name,
                p
            );
        }
        for (name, r) in [
            ("rotate_range", self.rotate_range),
            ("shift_range", self.shift_range),
            ("shear_range", self.shear_range),
        ] {
            ensure!(r.is_finite() && r >= 0.0, "{} must be >= 0 (got {})", name, r);
        }
        ensure!(
            (0.0..1.0).contains(&self.zoom_range),
            "zoom_range must be in [0.0, 1.0) (got {})",
            self.zoom_range
        );
        Ok(())
    }
}

// ============================================================================
// RandomAugmentation
// ============================================================================

/// Joint random augmentation of an image and its mask.
///
/// Order: horizontal flip, then one affine warp combining rotation, shift,
/// zoom and shear, then optional color quantization of the image. The warp is
/// built once and applied to both halves so they stay aligned; the mask is
/// sampled with `Nearest` to keep its labels intact. Pixels uncovered by the
/// warp are filled with zero.
///
/// # Example
/// ```ignore
/// let train = RandomAugmentation::new(AugmentationConfig::default())?;
/// let eval = RandomAugmentation::new(AugmentationConfig::disabled(8))?;
/// let augmented = train.apply(pair)?;
/// ```
#[derive(Debug, Clone)]
pub struct RandomAugmentation {
    config: AugmentationConfig,
    quantizer: Option<ColorQuantizer>,
}

impl RandomAugmentation {
    pub fn new(config: AugmentationConfig) -> Result<Self> {
        config.validate()?;
        let quantizer = if config.color_quantize {
            Some(ColorQuantizer::new(config.num_colors)?)
        } else {
            None
        };
        Ok(Self { config, quantizer })
    }

    pub fn config(&self) -> &AugmentationConfig {
        &self.config
    }

    /// Draws the combined affine warp for an image of `width × height`, or
    /// `None` when no geometric transform was selected.
    fn draw_projection(&self, width: u32, height: u32) -> Result<Option<Projection>> {
        let cfg = &self.config;
        let (cx, cy) = (width as f32 / 2.0, height as f32 / 2.0);
        let about_center =
            |m: Projection| Projection::translate(cx, cy) * m * Projection::translate(-cx, -cy);

        let mut steps = Vec::with_capacity(4);
        if step_gen_bool(cfg.rotate_chance) {
            let degrees: f32 = step_gen_range(-cfg.rotate_range..=cfg.rotate_range);
            steps.push(about_center(Projection::rotate(degrees.to_radians())));
        }
        if step_gen_bool(cfg.shift_chance) {
            let dx: f32 = step_gen_range(-cfg.shift_range..=cfg.shift_range);
            let dy: f32 = step_gen_range(-cfg.shift_range..=cfg.shift_range);
            steps.push(Projection::translate(dx * width as f32, dy * height as f32));
        }
        if step_gen_bool(cfg.zoom_chance) {
            let factor: f32 = step_gen_range(1.0 - cfg.zoom_range..=1.0 + cfg.zoom_range);
            steps.push(about_center(Projection::scale(factor, factor)));
        }
        if step_gen_bool(cfg.shear_chance) {
            let shear: f32 = step_gen_range(-cfg.shear_range..=cfg.shear_range);
            let m = Projection::from_matrix([1.0, shear, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
                .ok_or_else(|| anyhow!("Shear factor {} produced a singular matrix", shear))?;
            steps.push(about_center(m));
        }

        Ok(steps.into_iter().reduce(|acc, next| next * acc))
    }
}

impl Transform<ImageMaskPair, ImageMaskPair> for RandomAugmentation {
    fn apply(&self, pair: ImageMaskPair) -> Result<ImageMaskPair> {
        if self.config.is_identity() {
            return Ok(pair);
        }

        let ImageMaskPair {
            mut image,
            mut mask,
        } = pair;
        ensure!(
            image.dimensions() == mask.dimensions(),
            "Image {:?} and mask {:?} must have identical dimensions",
            image.dimensions(),
            mask.dimensions()
        );

        if step_gen_bool(self.config.flip_chance) {
            image = imageops::flip_horizontal(&image);
            mask = imageops::flip_horizontal(&mask);
        }

        let (width, height) = image.dimensions();
        if let Some(projection) = self.draw_projection(width, height)? {
            image = warp(&image, &projection, Interpolation::Bilinear, Rgb([0, 0, 0]));
            mask = warp(&mask, &projection, Interpolation::Nearest, Luma([0]));
        }

        if let Some(quantizer) = &self.quantizer {
            if step_gen_bool(self.config.quantize_chance) {
                image = quantizer.apply(image)?;
            }
        }

        Ok(ImageMaskPair::new(image, mask))
    }
}

/// One-shot augmentation with the default ranges and the given chances.
///
/// With every chance at zero and `color_quantize` off this returns the pair
/// unchanged.
#[allow(clippy::too_many_arguments)]
pub fn random_augmentation(
    pair: ImageMaskPair,
    flip_chance: f64,
    rotate_chance: f64,
    shift_chance: f64,
    zoom_chance: f64,
    shear_chance: f64,
    color_quantize: bool,
    num_colors: usize,
) -> Result<ImageMaskPair> {
    let config = AugmentationConfig {
        flip_chance,
        rotate_chance,
        shift_chance,
        zoom_chance,
        shear_chance,
        color_quantize,
        num_colors,
        ..AugmentationConfig::default()
    };
    RandomAugmentation::new(config)?.apply(pair)
}
