use std::fmt::Debug;

use image::DynamicImage;
use rand::rngs::StdRng;

use crate::{Result, UnpairedBatch};

mod pair;
mod convert;
mod geometry;
mod normalize;
mod flip;

pub use {
    pair::*,
    convert::*,
    geometry::*,
    normalize::*,
    flip::*
};

/// Per-item transform applied to decoded images before tensor stacking.
pub trait ItemTransform: Debug + Send + Sync {
    fn encode(&self, img: DynamicImage, rng: &mut StdRng) -> Result<DynamicImage>;
}

/// Batch-level transform with an inverse used to display or save batches.
pub trait BatchTransform: Debug + Send + Sync {
    fn encode(&self, batch: UnpairedBatch, rng: &mut StdRng) -> Result<UnpairedBatch>;

    fn decode(&self, batch: UnpairedBatch) -> Result<UnpairedBatch> {
        Ok(batch)
    }
}

/// Ordered chain of item transforms.
#[derive(Debug, Default)]
pub struct ItemPipeline {
    tfms: Vec<Box<dyn ItemTransform>>,
}

impl ItemPipeline {
    pub fn new(tfms: Vec<Box<dyn ItemTransform>>) -> Self {
        Self { tfms }
    }

    pub fn encode(&self, img: DynamicImage, rng: &mut StdRng) -> Result<DynamicImage> {
        self.tfms.iter().try_fold(img, |img, t| t.encode(img, rng))
    }

    pub fn len(&self) -> usize { self.tfms.len() }
    pub fn is_empty(&self) -> bool { self.tfms.is_empty() }
}

/// Ordered chain of batch transforms. Decoding runs the chain backwards.
#[derive(Debug, Default)]
pub struct BatchPipeline {
    tfms: Vec<Box<dyn BatchTransform>>,
}

impl BatchPipeline {
    pub fn new(tfms: Vec<Box<dyn BatchTransform>>) -> Self {
        Self { tfms }
    }

    pub fn encode(&self, batch: UnpairedBatch, rng: &mut StdRng) -> Result<UnpairedBatch> {
        self.tfms.iter().try_fold(batch, |b, t| t.encode(b, rng))
    }

    pub fn decode(&self, batch: UnpairedBatch) -> Result<UnpairedBatch> {
        self.tfms.iter().rev().try_fold(batch, |b, t| t.decode(b))
    }

    pub fn len(&self) -> usize { self.tfms.len() }
    pub fn is_empty(&self) -> bool { self.tfms.is_empty() }
}
