use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::{DataError, Domain, ImageBatch, Result, UnpairedBatch};

pub fn save_rgb(path: &Path, image: &RgbImage) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .map_err(|e| DataError::image(path, e))
}

fn save_column<D: Domain>(dir: &Path, prefix: &str, batch: &ImageBatch<D>) -> Result<Vec<PathBuf>> {
    let images = batch.to_images();
    if images.len() != batch.len() {
        return Err(DataError::InvalidArgument(format!(
            "only 3-channel batches can be saved, got {} channels",
            batch.channels()
        )));
    }
    images
        .iter()
        .enumerate()
        .map(|(i, img)| {
            let path = dir.join(format!("{}_{:0>4}.png", prefix, i));
            save_rgb(&path, img)?;
            Ok(path)
        })
        .collect()
}

/// Writes a decoded batch (pixel values `0..=255`) as `a_0000.png`,
/// `b_0000.png`, ... into `dir`. Returns the written paths, column A first.
pub fn save_batch(batch: &UnpairedBatch, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = save_column(dir, "a", &batch.a)?;
    paths.extend(save_column(dir, "b", &batch.b)?);
    Ok(paths)
}
