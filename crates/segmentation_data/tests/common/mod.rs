#![allow(dead_code)]

use anyhow::Result;
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};

pub const IMAGES_SUBDIR: &str = "train";
pub const MASKS_SUBDIR: &str = "train_masks";

pub fn image_path(root: &Path, i: usize) -> PathBuf {
    root.join(IMAGES_SUBDIR).join(format!("car_{:03}.png", i))
}

pub fn mask_path(root: &Path, i: usize) -> PathBuf {
    root.join(MASKS_SUBDIR).join(format!("car_{:03}_mask.png", i))
}

/// Blue channel value of every pixel of pair `i`.
pub fn tint(i: usize) -> u8 {
    (i * 37 % 256) as u8
}

/// A gradient photo tinted by `i` and a binary mask covering a box whose
/// position depends on `i`.
pub fn synthetic_pair(i: usize, width: u32, height: u32) -> (RgbImage, GrayImage) {
    let tint = tint(i);
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            tint,
        ])
    });
    let left = (i as u32) % (width / 2).max(1);
    let mask = GrayImage::from_fn(width, height, |x, y| {
        let inside = x >= left && x < left + width / 2 && y >= height / 4 && y < height * 3 / 4;
        Luma([if inside { 255 } else { 0 }])
    });
    (image, mask)
}

/// Writes `n` pairs as `train/car_XXX.png` and `train_masks/car_XXX_mask.png`.
pub fn write_pairs(root: &Path, n: usize, width: u32, height: u32) -> Result<()> {
    fs::create_dir_all(root.join(IMAGES_SUBDIR))?;
    fs::create_dir_all(root.join(MASKS_SUBDIR))?;
    for i in 0..n {
        write_pair(root, i, width, height)?;
    }
    Ok(())
}

pub fn write_pair(root: &Path, i: usize, width: u32, height: u32) -> Result<()> {
    let (image, mask) = synthetic_pair(i, width, height);
    image.save(image_path(root, i))?;
    mask.save(mask_path(root, i))?;
    Ok(())
}
