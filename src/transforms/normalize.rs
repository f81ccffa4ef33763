use rand::rngs::StdRng;

use crate::{Domain, DomainA, DomainB, ImageBatch, Result, Stats, UnpairedBatch};

use super::BatchTransform;

/// Scales raw `0..=255` pixel values to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntToFloat;

impl BatchTransform for IntToFloat {
    fn encode(&self, batch: UnpairedBatch, _rng: &mut StdRng) -> Result<UnpairedBatch> {
        Ok(UnpairedBatch {
            a: batch.a.map_channels(|_, v| v / 255.),
            b: batch.b.map_channels(|_, v| v / 255.),
        })
    }

    fn decode(&self, batch: UnpairedBatch) -> Result<UnpairedBatch> {
        Ok(UnpairedBatch {
            a: batch.a.map_channels(|_, v| v * 255.),
            b: batch.b.map_channels(|_, v| v * 255.),
        })
    }
}

/// Normalization keyed by the domain tag of the batch.
pub trait DomainNormalize<D: Domain> {
    fn stats(&self) -> &Stats;

    fn encode_domain(&self, x: ImageBatch<D>) -> Result<ImageBatch<D>> {
        let stats = DomainNormalize::<D>::stats(self);
        stats.check_channels(x.channels())?;
        Ok(x.map_channels(|c, v| (v - stats.mean_at(c)) / stats.std_at(c)))
    }

    fn decode_domain(&self, x: ImageBatch<D>) -> Result<ImageBatch<D>> {
        let stats = DomainNormalize::<D>::stats(self);
        stats.check_channels(x.channels())?;
        Ok(x.map_channels(|c, v| v * stats.std_at(c) + stats.mean_at(c)))
    }
}

/// Same statistics for both domains.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalize {
    stats: Stats,
}

impl Normalize {
    pub fn new(stats: Stats) -> Self {
        Self { stats }
    }

    pub fn from_stats(mean: f32, std: f32) -> Result<Self> {
        Ok(Self { stats: Stats::scalar(mean, std)? })
    }
}

impl<D: Domain> DomainNormalize<D> for Normalize {
    fn stats(&self) -> &Stats { &self.stats }
}

/// Separate statistics for domain A (`mean`, `std`) and domain B
/// (`mean_`, `std_`); the batch column's tag selects which set applies.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomNormalize {
    a: Stats,
    b: Stats,
}

impl CustomNormalize {
    pub fn new(a: Stats, b: Stats) -> Self {
        Self { a, b }
    }

    pub fn from_stats(mean: f32, std: f32) -> Result<Self> {
        let stats = Stats::scalar(mean, std)?;
        Ok(Self { a: stats.clone(), b: stats })
    }
}

impl DomainNormalize<DomainA> for CustomNormalize {
    fn stats(&self) -> &Stats { &self.a }
}

impl DomainNormalize<DomainB> for CustomNormalize {
    fn stats(&self) -> &Stats { &self.b }
}

macro_rules! normalize_batches {
    ($t:ty) => {
        impl BatchTransform for $t {
            fn encode(&self, batch: UnpairedBatch, _rng: &mut StdRng) -> Result<UnpairedBatch> {
                Ok(UnpairedBatch { a: self.encode_domain(batch.a)?, b: self.encode_domain(batch.b)? })
            }

            fn decode(&self, batch: UnpairedBatch) -> Result<UnpairedBatch> {
                Ok(UnpairedBatch { a: self.decode_domain(batch.a)?, b: self.decode_domain(batch.b)? })
            }
        }
    };
}

normalize_batches!(Normalize);
normalize_batches!(CustomNormalize);
