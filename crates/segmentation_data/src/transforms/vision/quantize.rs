use crate::generator::rng::step_gen_range;
use crate::transforms::Transform;
use anyhow::{ensure, Result};
use image::{Rgb, RgbImage};
use std::collections::HashSet;

/// Upper bound on the pixels used to fit the palette. Large photos are
/// subsampled; every pixel is still mapped onto the fitted palette.
const MAX_FIT_PIXELS: usize = 4096;

/// Reduces an RGB image to at most `num_colors` colors with k-means.
///
/// Initial centroids and the fitting subsample are drawn from the step RNG,
/// so quantization is reproducible whenever the generator is seeded.
#[derive(Debug, Clone)]
pub struct ColorQuantizer {
    num_colors: usize,
    iterations: usize,
}

impl ColorQuantizer {
    pub fn new(num_colors: usize) -> Result<Self> {
        ensure!(
            (1..=256).contains(&num_colors),
            "num_colors must be in [1, 256] (got {})",
            num_colors
        );
        Ok(Self {
            num_colors,
            iterations: 8,
        })
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    pub fn num_colors(&self) -> usize {
        self.num_colors
    }

    /// Fits a palette to `img` and returns the palette.
    pub fn fit(&self, img: &RgbImage) -> Vec<[f32; 3]> {
        if let Some(palette) = small_palette(img, self.num_colors) {
            return palette;
        }
        let pixels: Vec<[f32; 3]> = img.pixels().map(to_f32).collect();

        let training: Vec<[f32; 3]> = if pixels.len() > MAX_FIT_PIXELS {
            (0..MAX_FIT_PIXELS)
                .map(|_| pixels[step_gen_range(0..pixels.len())])
                .collect()
        } else {
            pixels
        };

        let k = self.num_colors.min(training.len());
        let mut centroids: Vec<[f32; 3]> = (0..k)
            .map(|_| training[step_gen_range(0..training.len())])
            .collect();

        let mut assignments = vec![0usize; training.len()];
        for _ in 0..self.iterations {
            let mut changed = false;
            for (slot, pixel) in assignments.iter_mut().zip(&training) {
                let nearest = nearest_centroid(&centroids, pixel);
                if *slot != nearest {
                    *slot = nearest;
                    changed = true;
                }
            }

            let mut sums = vec![[0f32; 3]; k];
            let mut counts = vec![0usize; k];
            for (&cluster, pixel) in assignments.iter().zip(&training) {
                for c in 0..3 {
                    sums[cluster][c] += pixel[c];
                }
                counts[cluster] += 1;
            }
            for ((centroid, sum), count) in centroids.iter_mut().zip(&sums).zip(&counts) {
                // An empty cluster keeps its previous centroid.
                if *count > 0 {
                    for c in 0..3 {
                        centroid[c] = sum[c] / *count as f32;
                    }
                }
            }

            if !changed {
                break;
            }
        }
        centroids
    }
}

impl Transform<RgbImage, RgbImage> for ColorQuantizer {
    fn apply(&self, img: RgbImage) -> Result<RgbImage> {
        let palette: Vec<Rgb<u8>> = self
            .fit(&img)
            .iter()
            .map(|c| Rgb([to_u8(c[0]), to_u8(c[1]), to_u8(c[2])]))
            .collect();
        if palette.is_empty() {
            return Ok(img);
        }
        let centroids: Vec<[f32; 3]> = palette.iter().map(to_f32).collect();

        let mut out = img;
        for pixel in out.pixels_mut() {
            *pixel = palette[nearest_centroid(&centroids, &to_f32(pixel))];
        }
        Ok(out)
    }
}

/// Returns the exact set of colors when the image already has at most
/// `limit` of them.
fn small_palette(img: &RgbImage, limit: usize) -> Option<Vec<[f32; 3]>> {
    let mut seen: HashSet<[u8; 3]> = HashSet::with_capacity(limit + 1);
    for pixel in img.pixels() {
        seen.insert(pixel.0);
        if seen.len() > limit {
            return None;
        }
    }
    Some(seen.iter().map(|c| to_f32(&Rgb(*c))).collect())
}

fn to_f32(p: &Rgb<u8>) -> [f32; 3] {
    [p.0[0] as f32, p.0[1] as f32, p.0[2] as f32]
}

fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

fn nearest_centroid(centroids: &[[f32; 3]], pixel: &[f32; 3]) -> usize {
    let mut best = 0;
    let mut best_dist = f32::MAX;
    for (i, c) in centroids.iter().enumerate() {
        let dist = (0..3).map(|ch| (c[ch] - pixel[ch]).powi(2)).sum::<f32>();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::rng::{clear_step_rng, init_step_rng};

    fn noisy_image() -> RgbImage {
        RgbImage::from_fn(40, 30, |x, y| {
            Rgb([
                (x * 6) as u8,
                (y * 8) as u8,
                ((x * 13 + y * 7) % 256) as u8,
            ])
        })
    }

    fn distinct_colors(img: &RgbImage) -> usize {
        img.pixels().map(|p| p.0).collect::<HashSet<_>>().len()
    }

    #[test]
    fn test_quantized_image_respects_palette_size() -> Result<()> {
        init_step_rng(11, 0);
        let img = noisy_image();
        assert!(distinct_colors(&img) > 8);

        let quantized = ColorQuantizer::new(8)?.apply(img)?;
        clear_step_rng();

        assert_eq!(quantized.dimensions(), (40, 30));
        assert!(distinct_colors(&quantized) <= 8);
        Ok(())
    }

    #[test]
    fn test_already_few_colors_are_preserved() -> Result<()> {
        init_step_rng(3, 0);
        let img = RgbImage::from_fn(10, 10, |x, _| {
            if x < 5 {
                Rgb([200, 10, 10])
            } else {
                Rgb([10, 10, 200])
            }
        });
        let quantized = ColorQuantizer::new(4)?.with_iterations(20).apply(img.clone())?;
        clear_step_rng();

        // Every output color must come from the two input colors.
        let input: HashSet<_> = img.pixels().map(|p| p.0).collect();
        assert!(quantized.pixels().all(|p| input.contains(&p.0)));
        Ok(())
    }

    #[test]
    fn test_seeded_quantization_is_reproducible() -> Result<()> {
        let quantizer = ColorQuantizer::new(5)?;
        init_step_rng(99, 4);
        let a = quantizer.apply(noisy_image())?;
        init_step_rng(99, 4);
        let b = quantizer.apply(noisy_image())?;
        clear_step_rng();
        assert_eq!(a.as_raw(), b.as_raw());
        Ok(())
    }

    #[test]
    fn test_rejects_invalid_palette_size() {
        assert!(ColorQuantizer::new(0).is_err());
        assert!(ColorQuantizer::new(257).is_err());
    }
}
