use std::path::Path;

use image::DynamicImage;

use crate::{DataError, Result};

pub fn load_image(path: &Path) -> Result<DynamicImage> {
    image::io::Reader::open(path)
        .map_err(|e| DataError::io(path, e))?
        .with_guessed_format()
        .map_err(|e| DataError::io(path, e))?
        .decode()
        .map_err(|e| DataError::image(path, e))
}
