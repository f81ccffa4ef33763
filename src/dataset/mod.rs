use rand::rngs::StdRng;

use crate::Result;

mod unpaired;
pub use unpaired::*;

/// Indexable collection whose items may depend on a random draw.
pub trait Dataset: Send + Sync {
    type Item: Send;

    fn len(&self) -> usize;
    fn get(&self, index: usize, rng: &mut StdRng) -> Result<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
