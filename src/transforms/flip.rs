use rand::{rngs::StdRng, Rng};

use crate::{DataError, Result, UnpairedBatch};

use super::BatchTransform;

/// Flips the whole batch horizontally with probability `p`. Both columns
/// share one draw. Decoding leaves the batch as it is.
#[derive(Debug, Clone, Copy)]
pub struct FlipItem {
    p: f64,
}

impl FlipItem {
    pub fn new(p: f64) -> Result<Self> {
        if !(0. ..=1.).contains(&p) {
            return Err(DataError::InvalidArgument(format!("flip probability {} is outside [0, 1]", p)));
        }
        Ok(Self { p })
    }
}

impl BatchTransform for FlipItem {
    fn encode(&self, batch: UnpairedBatch, rng: &mut StdRng) -> Result<UnpairedBatch> {
        if rng.gen_bool(self.p) {
            Ok(UnpairedBatch { a: batch.a.flip_horizontal(), b: batch.b.flip_horizontal() })
        } else {
            Ok(batch)
        }
    }
}
