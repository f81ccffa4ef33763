use std::path::{Path, PathBuf};

use rand::{rngs::StdRng, Rng};

use crate::{DataError, Result};

/// Returns a random image from domain B, so that every domain-A item is
/// paired with a uniformly drawn domain-B item on each access.
#[derive(Debug, Clone)]
pub struct RandPair {
    items_b: Vec<PathBuf>,
}

impl RandPair {
    pub fn new(items_b: Vec<PathBuf>) -> Result<Self> {
        if items_b.is_empty() {
            return Err(DataError::EmptyDomain { path: PathBuf::from("<domain B>") });
        }
        Ok(Self { items_b })
    }

    /// The domain-A index is ignored; draws are independent and with replacement.
    pub fn encode(&self, _index: usize, rng: &mut StdRng) -> &Path {
        &self.items_b[rng.gen_range(0..self.items_b.len())]
    }

    pub fn items(&self) -> &[PathBuf] { &self.items_b }
}
