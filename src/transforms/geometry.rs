use image::{imageops::{self, FilterType}, DynamicImage, GenericImageView, RgbImage};
use rand::{rngs::StdRng, Rng};

use crate::{DataError, Result};

use super::ItemTransform;

fn check_size(size: u32) -> Result<u32> {
    if size == 0 {
        Err(DataError::InvalidArgument("transform size must be positive".into()))
    } else {
        Ok(size)
    }
}

/// Crops a square at a random position and resizes it to `size x size`.
#[derive(Debug, Clone, Copy)]
pub struct Resize {
    size: u32,
}

impl Resize {
    pub fn new(size: u32) -> Result<Self> {
        Ok(Self { size: check_size(size)? })
    }
}

impl ItemTransform for Resize {
    fn encode(&self, img: DynamicImage, rng: &mut StdRng) -> Result<DynamicImage> {
        let (w, h) = img.dimensions();
        let side = w.min(h);
        if side == 0 {
            return Err(DataError::InvalidArgument("cannot resize an empty image".into()));
        }
        let x = rng.gen_range(0..=w - side);
        let y = rng.gen_range(0..=h - side);
        let square = img.crop_imm(x, y, side, side);
        if side == self.size {
            Ok(square)
        } else {
            Ok(square.resize_exact(self.size, self.size, FilterType::Triangle))
        }
    }
}

/// Random `size x size` window. Images smaller than the window are padded
/// with black around the centre first.
#[derive(Debug, Clone, Copy)]
pub struct RandomCrop {
    size: u32,
}

impl RandomCrop {
    pub fn new(size: u32) -> Result<Self> {
        Ok(Self { size: check_size(size)? })
    }
}

fn pad_to(img: DynamicImage, w: u32, h: u32) -> DynamicImage {
    let (iw, ih) = img.dimensions();
    if iw >= w && ih >= h {
        return img;
    }
    let (cw, ch) = (iw.max(w), ih.max(h));
    let mut canvas = RgbImage::new(cw, ch);
    imageops::overlay(&mut canvas, &img.to_rgb8(), ((cw - iw) / 2) as i64, ((ch - ih) / 2) as i64);
    DynamicImage::ImageRgb8(canvas)
}

impl ItemTransform for RandomCrop {
    fn encode(&self, img: DynamicImage, rng: &mut StdRng) -> Result<DynamicImage> {
        let img = pad_to(img, self.size, self.size);
        let (w, h) = img.dimensions();
        let x = rng.gen_range(0..=w - self.size);
        let y = rng.gen_range(0..=h - self.size);
        Ok(img.crop_imm(x, y, self.size, self.size))
    }
}
