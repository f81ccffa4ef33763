use rayon::{prelude::*, ThreadPool};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{dataset::{Dataset, UnpairedDataset}, seeded_rng, DataError, Domain, ImageBatch, Result, TensorImage};

/// Added to every standard deviation so constant channels stay invertible.
pub const STD_EPS: f32 = 1e-7;

/// Per-channel normalization statistics. A single value broadcasts to every
/// channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl Stats {
    pub fn new(mean: Vec<f32>, std: Vec<f32>) -> Result<Self> {
        if mean.is_empty() || mean.len() != std.len() {
            return Err(DataError::InvalidArgument(format!(
                "mean and std must be non-empty and of equal length ({} vs {})",
                mean.len(), std.len()
            )));
        }
        if std.iter().any(|s| *s == 0. || !s.is_finite()) {
            return Err(DataError::InvalidArgument(format!("std must be finite and non-zero: {:?}", std)));
        }
        Ok(Self { mean, std })
    }

    pub fn scalar(mean: f32, std: f32) -> Result<Self> {
        Self::new(vec![mean], vec![std])
    }

    /// Checks that these statistics can be applied to `channels` channels.
    pub fn check_channels(&self, channels: usize) -> Result<()> {
        if self.mean.len() == 1 || self.mean.len() == channels {
            Ok(())
        } else {
            Err(DataError::InvalidArgument(format!(
                "statistics have {} channels, tensor has {}",
                self.mean.len(), channels
            )))
        }
    }

    #[inline(always)]
    pub fn mean_at(&self, c: usize) -> f32 {
        if self.mean.len() == 1 { self.mean[0] } else { self.mean[c] }
    }

    #[inline(always)]
    pub fn std_at(&self, c: usize) -> f32 {
        if self.std.len() == 1 { self.std[0] } else { self.std[c] }
    }

    /// Mean and unbiased standard deviation per channel over `(N, H, W)`.
    pub fn from_batch<D: Domain>(batch: &ImageBatch<D>) -> Result<Self> {
        let [n, c, h, w] = batch.shape();
        let count = n * h * w;
        if count < 2 {
            return Err(DataError::InvalidArgument(
                "need at least two values per channel to estimate a standard deviation".into(),
            ));
        }
        let plane = h * w;
        let mut sum = vec![0f64; c];
        for k in 0..n {
            for (ch, values) in batch.item(k).chunks(plane).enumerate() {
                sum[ch] += values.iter().map(|v| *v as f64).sum::<f64>();
            }
        }
        let mean: Vec<f64> = sum.iter().map(|s| s / count as f64).collect();
        let mut sq = vec![0f64; c];
        for k in 0..n {
            for (ch, values) in batch.item(k).chunks(plane).enumerate() {
                sq[ch] += values.iter().map(|v| (*v as f64 - mean[ch]).powi(2)).sum::<f64>();
            }
        }
        let std = sq.iter().map(|s| (s / (count - 1) as f64).sqrt() as f32 + STD_EPS).collect();
        Self::new(mean.into_iter().map(|m| m as f32).collect(), std)
    }
}

/// Statistics of both dataset columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainStats {
    pub a: Stats,
    pub b: Stats,
}

/// Materialises every item of `dataset` once and measures both columns on
/// the `[0, 1]` scale that `IntToFloat` produces. Items load on `pool`, or
/// serially on the calling thread when there is none.
///
/// Domain B is measured on the randomly paired images actually drawn for
/// this pass, so it reflects the pairing distribution rather than every
/// file in the B directory.
pub fn compute_stats(dataset: &UnpairedDataset, seed: u64, pool: Option<&ThreadPool>) -> Result<DomainStats> {
    info!(items = dataset.len(), parallel = pool.is_some(), "computing normalization statistics");
    let get = |i: usize| dataset.get(i, &mut seeded_rng(seed, i as u64));
    let items = match pool {
        Some(pool) => pool.install(|| (0..dataset.len()).into_par_iter().map(get).collect::<Result<Vec<_>>>()),
        None => (0..dataset.len()).map(get).collect::<Result<Vec<_>>>(),
    }?;
    let (a, b): (Vec<_>, Vec<_>) = items.into_iter().unzip();
    Ok(DomainStats { a: column_stats(&a)?, b: column_stats(&b)? })
}

fn column_stats<D: Domain>(items: &[TensorImage<D>]) -> Result<Stats> {
    let batch = ImageBatch::stack(items)?.map_channels(|_, v| v / 255.);
    let stats = Stats::from_batch(&batch)?;
    info!(domain = D::NAME, mean = ?stats.mean, std = ?stats.std, "statistics computed");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::{Arc, Mutex}, thread::{self, ThreadId}};

    use image::{DynamicImage, Rgb, RgbImage};
    use rand::rngs::StdRng;

    use super::*;
    use crate::{transforms::{ItemPipeline, ItemTransform}, worker_pool, DomainA, TensorImage};

    /// Passes images through, noting which threads loaded them.
    #[derive(Debug, Default)]
    struct ThreadLog(Arc<Mutex<HashSet<ThreadId>>>);

    impl ItemTransform for ThreadLog {
        fn encode(&self, img: DynamicImage, _rng: &mut StdRng) -> Result<DynamicImage> {
            self.0.lock().unwrap().insert(thread::current().id());
            Ok(img)
        }
    }

    fn logged_dataset(n: usize) -> (tempfile::TempDir, UnpairedDataset, Arc<Mutex<HashSet<ThreadId>>>) {
        let dir = tempfile::tempdir().unwrap();
        let files: Vec<_> = (0..n)
            .map(|i| {
                let path = dir.path().join(format!("{:03}.png", i));
                RgbImage::from_pixel(2, 2, Rgb([i as u8, 0, 0])).save(&path).unwrap();
                path
            })
            .collect();
        let log = ThreadLog::default();
        let threads = log.0.clone();
        let ds = UnpairedDataset::new(files.clone(), files, ItemPipeline::new(vec![Box::new(log)])).unwrap();
        (dir, ds, threads)
    }

    #[test]
    fn rejects_bad_stats() {
        assert!(Stats::new(vec![0.5], vec![0.]).is_err());
        assert!(Stats::new(vec![0.5, 0.5], vec![0.5]).is_err());
        assert!(Stats::new(vec![], vec![]).is_err());
    }

    #[test]
    fn scalar_broadcasts() {
        let s = Stats::scalar(0.5, 0.25).unwrap();
        assert_eq!(s.mean_at(2), 0.5);
        assert_eq!(s.std_at(1), 0.25);
        assert!(s.check_channels(3).is_ok());
        assert!(Stats::new(vec![0.; 3], vec![1.; 3]).unwrap().check_channels(1).is_err());
    }

    #[test]
    fn batch_stats_are_per_channel_and_unbiased() {
        // channel 0: 0,2,4,6  channel 1: all 10  channel 2: 1,1,3,3
        let data = vec![0, 2, 4, 6, 10, 10, 10, 10, 1, 1, 3, 3];
        let t = TensorImage::<DomainA>::new(data, [3, 2, 2]).unwrap();
        let batch = ImageBatch::stack(&[t]).unwrap();
        let stats = Stats::from_batch(&batch).unwrap();

        assert_eq!(stats.mean, vec![3., 10., 2.]);
        let expected_std0 = (20f32 / 3.).sqrt();
        assert!((stats.std[0] - expected_std0).abs() < 1e-5);
        assert!((stats.std[1] - STD_EPS).abs() < 1e-9);
        assert!((stats.std[2] - (4f32 / 3.).sqrt()).abs() < 1e-5);
    }

    #[test]
    fn without_pool_stats_load_on_calling_thread() {
        let (_dir, ds, threads) = logged_dataset(32);
        compute_stats(&ds, 3, None).unwrap();
        let threads = threads.lock().unwrap();
        assert_eq!(*threads, HashSet::from([thread::current().id()]));
    }

    #[test]
    fn pooled_stats_match_serial_stats() {
        let (_dir, ds, threads) = logged_dataset(32);
        let serial = compute_stats(&ds, 3, None).unwrap();
        threads.lock().unwrap().clear();

        let pool = worker_pool(2).unwrap().unwrap();
        let pooled = compute_stats(&ds, 3, Some(&*pool)).unwrap();
        assert_eq!(serial, pooled);
        let threads = threads.lock().unwrap();
        assert!(!threads.contains(&thread::current().id()));
        assert!(threads.len() <= 2);
    }
}
