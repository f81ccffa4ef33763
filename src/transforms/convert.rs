use std::marker::PhantomData;

use image::DynamicImage;

use crate::{Domain, TensorImage};

/// Converts a decoded image into a tensor tagged with domain `D`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToTensor<D: Domain> {
    _domain: PhantomData<D>,
}

impl<D: Domain> ToTensor<D> {
    pub fn new() -> Self {
        Self { _domain: PhantomData }
    }

    pub fn encode(&self, img: DynamicImage) -> TensorImage<D> {
        TensorImage::from_rgb(&img.into_rgb8())
    }
}
