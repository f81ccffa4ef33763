use std::path::Path;

use image::imageops::FilterType;
use ndarray::{concatenate, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::info;

use crate::{utilities::{get_image_files, load_image}, DataError, Domain, DomainB, ImageBatch, Result, TensorImage};

mod features;
mod frechet;

pub use {
    features::*,
    frechet::*
};

/// Images are decoded and featurised this many at a time.
const FEATURE_CHUNK: usize = 32;

/// Feature statistics of a stream of batches. Batches are expected on the
/// `[0, 1]` scale, i.e. decoded and passed through `IntToFloat`.
pub fn batch_feature_stats<'a, E, D, I>(extractor: &E, batches: I) -> Result<FeatureStats>
where
    E: FeatureExtractor,
    D: Domain,
    I: IntoIterator<Item = &'a ImageBatch<D>>,
{
    let features = batches
        .into_iter()
        .map(|b| extractor.extract(b))
        .collect::<Result<Vec<_>>>()?;
    stack_features(&features)
}

/// Feature statistics of every image below `dir`, each resized to
/// `size x size` first.
pub fn dir_feature_stats<E: FeatureExtractor>(extractor: &E, dir: &Path, size: u32) -> Result<FeatureStats> {
    let files = get_image_files(dir)?;
    if files.len() < 2 {
        return Err(DataError::Metric(format!("{} holds {} images, need at least 2", dir.display(), files.len())));
    }
    let features = files
        .par_chunks(FEATURE_CHUNK)
        .map(|chunk| {
            let items = chunk
                .iter()
                .map(|p| {
                    let img = load_image(p)?.resize_exact(size, size, FilterType::Triangle);
                    // extractors ignore the tag; any domain will do
                    Ok(TensorImage::<DomainB>::from_rgb(&img.into_rgb8()))
                })
                .collect::<Result<Vec<_>>>()?;
            let batch = ImageBatch::stack(&items)?.map_channels(|_, v| v / 255.);
            extractor.extract(&batch)
        })
        .collect::<Result<Vec<_>>>()?;
    info!(dir = %dir.display(), images = files.len(), "extracted features");
    stack_features(&features)
}

fn stack_features(features: &[ndarray::Array2<f64>]) -> Result<FeatureStats> {
    let views: Vec<ArrayView2<f64>> = features.iter().map(|f| f.view()).collect();
    let all = concatenate(Axis(0), &views).map_err(|e| DataError::Metric(e.to_string()))?;
    FeatureStats::from_features(&all)
}

/// Fréchet distance between the feature distributions of the images in
/// `real` and in `fake`.
pub fn fid<E: FeatureExtractor>(extractor: &E, real: &Path, fake: &Path, size: u32) -> Result<f64> {
    let real_stats = dir_feature_stats(extractor, real, size)?;
    let fake_stats = dir_feature_stats(extractor, fake, size)?;
    let fd = frechet_distance(&real_stats, &fake_stats)?;
    info!(fid = fd, "frechet distance");
    Ok(fd)
}

/// Fréchet distance between the feature distributions of two batch streams,
/// e.g. held-out real batches and generator outputs. Batches must be on the
/// `[0, 1]` scale.
pub fn fid_batches<'a, 'b, E, R, F, DR, DF>(extractor: &E, real: R, fake: F) -> Result<f64>
where
    E: FeatureExtractor,
    DR: Domain,
    DF: Domain,
    R: IntoIterator<Item = &'a ImageBatch<DR>>,
    F: IntoIterator<Item = &'b ImageBatch<DF>>,
{
    let real_stats = batch_feature_stats(extractor, real)?;
    let fake_stats = batch_feature_stats(extractor, fake)?;
    let fd = frechet_distance(&real_stats, &fake_stats)?;
    info!(fid = fd, "frechet distance");
    Ok(fd)
}
