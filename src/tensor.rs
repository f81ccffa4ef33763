use std::{fmt::Debug, marker::PhantomData};

use image::{RgbImage, Rgb};

use crate::{DataError, Result};

/// Marker for one of the two image domains. The marker carries no data; it
/// only selects which normalization constants apply to a tensor.
pub trait Domain: Debug + Clone + Copy + Default + Send + Sync + 'static {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainA;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DomainB;

impl Domain for DomainA { const NAME: &'static str = "A"; }
impl Domain for DomainB { const NAME: &'static str = "B"; }

/// Raw pixel tensor in `[C, H, W]` layout.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorImage<D: Domain> {
    data: Vec<u8>,
    shape: [usize; 3],
    _domain: PhantomData<D>,
}

impl<D: Domain> TensorImage<D> {
    pub fn new(data: Vec<u8>, shape: [usize; 3]) -> Result<Self> {
        if data.len() != shape.iter().product::<usize>() {
            return Err(DataError::InvalidArgument(format!(
                "tensor of shape {:?} needs {} values, got {}",
                shape, shape.iter().product::<usize>(), data.len()
            )));
        }
        Ok(Self { data, shape, _domain: PhantomData })
    }

    pub fn from_rgb(img: &RgbImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let plane = w * h;
        let mut data = vec![0u8; 3 * plane];
        for (x, y, p) in img.enumerate_pixels() {
            let i = y as usize * w + x as usize;
            for c in 0..3 {
                data[c * plane + i] = p.0[c];
            }
        }
        Self { data, shape: [3, h, w], _domain: PhantomData }
    }

    #[inline(always)]
    pub fn shape(&self) -> [usize; 3] { self.shape }
    #[inline(always)]
    pub fn data(&self) -> &[u8] { &self.data }

    pub fn to_rgb(&self) -> Option<RgbImage> {
        let [c, h, w] = self.shape;
        if c != 3 { return None; }
        let plane = h * w;
        Some(RgbImage::from_fn(w as u32, h as u32, |x, y| {
            let i = y as usize * w + x as usize;
            Rgb([self.data[i], self.data[plane + i], self.data[2 * plane + i]])
        }))
    }
}

/// Stacked float batch in `[N, C, H, W]` layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch<D: Domain> {
    data: Vec<f32>,
    shape: [usize; 4],
    _domain: PhantomData<D>,
}

impl<D: Domain> ImageBatch<D> {
    pub fn new(data: Vec<f32>, shape: [usize; 4]) -> Result<Self> {
        if data.len() != shape.iter().product::<usize>() {
            return Err(DataError::InvalidArgument(format!(
                "batch of shape {:?} needs {} values, got {}",
                shape, shape.iter().product::<usize>(), data.len()
            )));
        }
        Ok(Self { data, shape, _domain: PhantomData })
    }

    /// Stacks items along a new leading axis. Pixel values are copied as-is
    /// (0..=255); scaling is left to `IntToFloat`.
    pub fn stack(items: &[TensorImage<D>]) -> Result<Self> {
        let first = items
            .first()
            .ok_or_else(|| DataError::InvalidArgument("cannot stack an empty batch".into()))?
            .shape();
        let mut data = Vec::with_capacity(items.len() * first.iter().product::<usize>());
        for item in items {
            if item.shape() != first {
                return Err(DataError::ShapeMismatch { expected: first, found: item.shape() });
            }
            data.extend(item.data().iter().map(|&v| v as f32));
        }
        Ok(Self { data, shape: [items.len(), first[0], first[1], first[2]], _domain: PhantomData })
    }

    #[inline(always)]
    pub fn shape(&self) -> [usize; 4] { self.shape }
    #[inline(always)]
    pub fn len(&self) -> usize { self.shape[0] }
    #[inline(always)]
    pub fn is_empty(&self) -> bool { self.shape[0] == 0 }
    #[inline(always)]
    pub fn channels(&self) -> usize { self.shape[1] }
    #[inline(always)]
    pub fn data(&self) -> &[f32] { &self.data }

    pub fn item(&self, n: usize) -> &[f32] {
        let size = self.shape[1] * self.shape[2] * self.shape[3];
        &self.data[n * size..(n + 1) * size]
    }

    /// Applies `f(channel, value)` to every element.
    pub fn map_channels<F: Fn(usize, f32) -> f32>(mut self, f: F) -> Self {
        let [_, c, h, w] = self.shape;
        let plane = h * w;
        for (i, v) in self.data.iter_mut().enumerate() {
            *v = f((i / plane) % c, *v);
        }
        self
    }

    /// Mirrors every image along its width axis.
    pub fn flip_horizontal(mut self) -> Self {
        let w = self.shape[3];
        if w > 1 {
            for row in self.data.chunks_mut(w) {
                row.reverse();
            }
        }
        self
    }

    /// Converts each item back to an RGB image, rounding and clamping to 0..=255.
    pub fn to_images(&self) -> Vec<RgbImage> {
        let [n, c, h, w] = self.shape;
        if c != 3 { return Vec::new(); }
        let plane = h * w;
        (0..n)
            .map(|k| {
                let item = self.item(k);
                let px = |v: f32| v.round().clamp(0., 255.) as u8;
                RgbImage::from_fn(w as u32, h as u32, |x, y| {
                    let i = y as usize * w + x as usize;
                    Rgb([px(item[i]), px(item[plane + i]), px(item[2 * plane + i])])
                })
            })
            .collect()
    }
}

/// One collated batch: domain-A images and their randomly paired domain-B images.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpairedBatch {
    pub a: ImageBatch<DomainA>,
    pub b: ImageBatch<DomainB>,
}

impl UnpairedBatch {
    #[inline(always)]
    pub fn len(&self) -> usize { self.a.len() }
    #[inline(always)]
    pub fn is_empty(&self) -> bool { self.a.is_empty() }
}
