use ndarray::Array2;

use crate::{DataError, Domain, ImageBatch, Result};

/// Maps every image of a batch to one feature vector (one row per image).
pub trait FeatureExtractor: Send + Sync {
    fn extract<D: Domain>(&self, batch: &ImageBatch<D>) -> Result<Array2<f64>>;
}

/// Average-pools each channel onto a `grid x grid` lattice. A weight-free
/// stand-in for a pretrained backbone; features are `C * grid * grid` long.
#[derive(Debug, Clone, Copy)]
pub struct PooledPixels {
    grid: usize,
}

impl PooledPixels {
    pub fn new(grid: usize) -> Result<Self> {
        if grid == 0 {
            return Err(DataError::InvalidArgument("pooling grid must be positive".into()));
        }
        Ok(Self { grid })
    }
}

impl Default for PooledPixels {
    fn default() -> Self {
        Self { grid: 4 }
    }
}

impl FeatureExtractor for PooledPixels {
    fn extract<D: Domain>(&self, batch: &ImageBatch<D>) -> Result<Array2<f64>> {
        let [n, c, h, w] = batch.shape();
        let g = self.grid;
        if h < g || w < g {
            return Err(DataError::Metric(format!("images of {}x{} are smaller than the {}x{} pooling grid", w, h, g, g)));
        }
        let mut out = Array2::<f64>::zeros((n, c * g * g));
        for k in 0..n {
            let item = batch.item(k);
            for ch in 0..c {
                let plane = &item[ch * h * w..(ch + 1) * h * w];
                for gy in 0..g {
                    let (y0, y1) = (gy * h / g, (gy + 1) * h / g);
                    for gx in 0..g {
                        let (x0, x1) = (gx * w / g, (gx + 1) * w / g);
                        let mut sum = 0f64;
                        for y in y0..y1 {
                            sum += plane[y * w + x0..y * w + x1].iter().map(|v| *v as f64).sum::<f64>();
                        }
                        out[[k, (ch * g + gy) * g + gx]] = sum / ((y1 - y0) * (x1 - x0)) as f64;
                    }
                }
            }
        }
        Ok(out)
    }
}
