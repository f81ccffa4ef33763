use std::sync::{atomic::{AtomicU64, Ordering}, Arc};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rayon::{prelude::*, ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::{
    dataset::{Dataset, UnpairedDataset},
    transforms::BatchPipeline,
    DataError, DomainStats, ImageBatch, Result, UnpairedBatch,
};

/// Deterministic generator for one `(seed, stream)` pair. Streams let each
/// item of a batch draw independently of the thread that loads it.
pub fn seeded_rng(seed: u64, stream: u64) -> StdRng {
    StdRng::seed_from_u64(seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderOptions {
    pub bs: usize,
    pub shuffle: bool,
    pub drop_last: bool,
    pub num_workers: usize,
    pub seed: Option<u64>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self { bs: 4, shuffle: true, drop_last: true, num_workers: 2, seed: None }
    }
}

/// Rayon pool with `num_workers` threads, or `None` for `0`, meaning work
/// stays on the calling thread.
pub fn worker_pool(num_workers: usize) -> Result<Option<Arc<ThreadPool>>> {
    match num_workers {
        0 => Ok(None),
        n => ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("loader-{}", i))
            .build()
            .map(|pool| Some(Arc::new(pool)))
            .map_err(|e| DataError::InvalidArgument(format!("cannot start {} workers: {}", n, e))),
    }
}

/// Batching, shuffling iterator source over an [`UnpairedDataset`].
pub struct DataLoader {
    dataset: Arc<UnpairedDataset>,
    batch_tfms: BatchPipeline,
    options: LoaderOptions,
    seed: u64,
    epoch: AtomicU64,
    pool: Option<Arc<ThreadPool>>,
}

impl std::fmt::Debug for DataLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataLoader")
            .field("items", &self.dataset.len())
            .field("batch_tfms", &self.batch_tfms)
            .field("options", &self.options)
            .finish()
    }
}

impl DataLoader {
    pub fn new(dataset: Arc<UnpairedDataset>, batch_tfms: BatchPipeline, options: LoaderOptions) -> Result<Self> {
        let pool = worker_pool(options.num_workers)?;
        Self::with_pool(dataset, batch_tfms, options, pool)
    }

    /// Uses an already built pool instead of starting one from
    /// `options.num_workers`; `None` loads on the calling thread.
    pub fn with_pool(
        dataset: Arc<UnpairedDataset>,
        batch_tfms: BatchPipeline,
        options: LoaderOptions,
        pool: Option<Arc<ThreadPool>>,
    ) -> Result<Self> {
        if options.bs == 0 {
            return Err(DataError::InvalidArgument("batch size must be positive".into()));
        }
        let seed = options.seed.unwrap_or_else(|| rand::thread_rng().gen());
        Ok(Self { dataset, batch_tfms, options, seed, epoch: AtomicU64::new(0), pool })
    }

    pub fn dataset(&self) -> &UnpairedDataset { &self.dataset }
    pub fn options(&self) -> &LoaderOptions { &self.options }
    pub fn batch_tfms(&self) -> &BatchPipeline { &self.batch_tfms }

    /// Number of batches per epoch.
    pub fn len(&self) -> usize {
        let n = self.dataset.len();
        if self.options.drop_last { n / self.options.bs } else { (n + self.options.bs - 1) / self.options.bs }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts a new epoch. Each call reshuffles (when enabled) and redraws
    /// the domain-B pairing.
    pub fn iter(&self) -> Batches<'_> {
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
        let mut rng = seeded_rng(self.seed, u64::MAX - epoch);
        let mut order: Vec<usize> = (0..self.dataset.len()).collect();
        if self.options.shuffle {
            order.shuffle(&mut rng);
        }
        debug!(epoch, batches = self.len(), "starting epoch");
        Batches { loader: self, order, pos: 0, rng }
    }

    pub fn one_batch(&self) -> Result<UnpairedBatch> {
        self.iter()
            .next()
            .unwrap_or_else(|| Err(DataError::InvalidArgument("loader yields no batch; is the batch size larger than the dataset?".into())))
    }

    /// Undoes the batch transforms, giving back `0..=255` pixel values.
    pub fn decode_batch(&self, batch: UnpairedBatch) -> Result<UnpairedBatch> {
        self.batch_tfms.decode(batch)
    }

    fn load(&self, indices: &[usize], rng: &mut StdRng) -> Result<UnpairedBatch> {
        let seeds: Vec<u64> = indices.iter().map(|_| rng.gen()).collect();
        let dataset = &self.dataset;
        let fetch = || {
            indices
                .par_iter()
                .zip(seeds.par_iter())
                .map(|(&i, &s)| dataset.get(i, &mut StdRng::seed_from_u64(s)))
                .collect::<Result<Vec<_>>>()
        };
        let items = match &self.pool {
            Some(pool) => pool.install(fetch),
            None => indices
                .iter()
                .zip(&seeds)
                .map(|(&i, &s)| dataset.get(i, &mut StdRng::seed_from_u64(s)))
                .collect::<Result<Vec<_>>>(),
        }?;
        let (a, b): (Vec<_>, Vec<_>) = items.into_iter().unzip();
        let batch = UnpairedBatch { a: ImageBatch::stack(&a)?, b: ImageBatch::stack(&b)? };
        self.batch_tfms.encode(batch, rng)
    }
}

pub struct Batches<'a> {
    loader: &'a DataLoader,
    order: Vec<usize>,
    pos: usize,
    rng: StdRng,
}

impl<'a> Iterator for Batches<'a> {
    type Item = Result<UnpairedBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        let bs = self.loader.options.bs;
        let end = (self.pos + bs).min(self.order.len());
        if self.pos >= end || (self.loader.options.drop_last && end - self.pos < bs) {
            return None;
        }
        let indices = self.order[self.pos..end].to_vec();
        self.pos = end;
        Some(self.loader.load(&indices, &mut self.rng))
    }
}

/// Everything a training loop needs from the data side.
#[derive(Debug)]
pub struct DataLoaders {
    pub train: DataLoader,
    /// Set when statistics were measured on the dataset.
    pub stats: Option<DomainStats>,
}

impl DataLoaders {
    pub fn one_batch(&self) -> Result<UnpairedBatch> {
        self.train.one_batch()
    }

    pub fn decode_batch(&self, batch: UnpairedBatch) -> Result<UnpairedBatch> {
        self.train.decode_batch(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::{BatchTransform, IntToFloat, ItemPipeline};
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    fn dataset(n_a: usize, n_b: usize) -> (tempfile::TempDir, Arc<UnpairedDataset>) {
        let dir = tempfile::tempdir().unwrap();
        let write = |prefix: &str, n: usize| -> Vec<PathBuf> {
            (0..n)
                .map(|i| {
                    let path = dir.path().join(format!("{}{:02}.png", prefix, i));
                    RgbImage::from_pixel(3, 3, Rgb([i as u8, 0, 0])).save(&path).unwrap();
                    path
                })
                .collect()
        };
        let a = write("a", n_a);
        let b = write("b", n_b);
        let ds = UnpairedDataset::new(a, b, ItemPipeline::default()).unwrap();
        (dir, Arc::new(ds))
    }

    fn options(bs: usize, drop_last: bool, num_workers: usize) -> LoaderOptions {
        LoaderOptions { bs, shuffle: true, drop_last, num_workers, seed: Some(7) }
    }

    #[test]
    fn drop_last_skips_partial_batch() {
        let (_dir, ds) = dataset(10, 2);
        let dl = DataLoader::new(ds, BatchPipeline::default(), options(4, true, 0)).unwrap();
        assert_eq!(dl.len(), 2);
        let sizes: Vec<_> = dl.iter().map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![4, 4]);
    }

    #[test]
    fn keeps_partial_batch_without_drop_last() {
        let (_dir, ds) = dataset(10, 2);
        let dl = DataLoader::new(ds, BatchPipeline::default(), options(4, false, 2)).unwrap();
        assert_eq!(dl.len(), 3);
        let sizes: Vec<_> = dl.iter().map(|b| b.unwrap().len()).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn epoch_visits_every_item_once() {
        let (_dir, ds) = dataset(6, 1);
        let dl = DataLoader::new(ds, BatchPipeline::default(), options(3, true, 2)).unwrap();
        let mut reds: Vec<u32> = dl
            .iter()
            .flat_map(|b| {
                let b = b.unwrap();
                (0..b.len()).map(move |k| b.a.item(k)[0] as u32).collect::<Vec<_>>()
            })
            .collect();
        reds.sort();
        assert_eq!(reds, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn same_seed_same_batches_regardless_of_workers() {
        let (_dir, ds) = dataset(8, 5);
        let serial = DataLoader::new(ds.clone(), BatchPipeline::default(), options(4, true, 0)).unwrap();
        let parallel = DataLoader::new(ds, BatchPipeline::default(), options(4, true, 3)).unwrap();
        let s: Vec<_> = serial.iter().map(|b| b.unwrap()).collect();
        let p: Vec<_> = parallel.iter().map(|b| b.unwrap()).collect();
        assert_eq!(s, p);
    }

    #[test]
    fn decode_batch_undoes_transforms() {
        let (_dir, ds) = dataset(4, 2);
        let tfms: Vec<Box<dyn BatchTransform>> = vec![Box::new(IntToFloat)];
        let dl = DataLoader::new(ds, BatchPipeline::new(tfms), options(2, true, 0)).unwrap();
        let batch = dl.one_batch().unwrap();
        assert!(batch.a.data().iter().all(|v| *v <= 1.));
        let decoded = dl.decode_batch(batch).unwrap();
        assert!(decoded.a.data().iter().all(|v| (v - v.round()).abs() < 1e-3));
        assert!(decoded.a.data().iter().any(|v| *v >= 1.));
    }

    #[test]
    fn oversized_batch_yields_nothing() {
        let (_dir, ds) = dataset(2, 2);
        let dl = DataLoader::new(ds, BatchPipeline::default(), options(4, true, 0)).unwrap();
        assert!(dl.is_empty());
        assert!(dl.one_batch().is_err());
    }

    #[test]
    fn zero_workers_means_no_pool() {
        assert!(worker_pool(0).unwrap().is_none());
        assert_eq!(worker_pool(3).unwrap().unwrap().current_num_threads(), 3);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let (_dir, ds) = dataset(2, 2);
        assert!(DataLoader::new(ds, BatchPipeline::default(), options(0, true, 0)).is_err());
    }
}
