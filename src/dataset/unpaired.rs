use std::path::{Path, PathBuf};

use rand::rngs::StdRng;

use crate::{
    transforms::{ItemPipeline, RandPair, ToTensor},
    utilities::load_image,
    DataError, DomainA, DomainB, Result, TensorImage,
};

use super::Dataset;

/// Two-column dataset: item `i` is domain-A file `i` together with a domain-B
/// file drawn at random on every access.
#[derive(Debug)]
pub struct UnpairedDataset {
    files_a: Vec<PathBuf>,
    pair: RandPair,
    item_tfms: ItemPipeline,
    to_tensor_a: ToTensor<DomainA>,
    to_tensor_b: ToTensor<DomainB>,
}

impl UnpairedDataset {
    pub fn new(files_a: Vec<PathBuf>, files_b: Vec<PathBuf>, item_tfms: ItemPipeline) -> Result<Self> {
        if files_a.is_empty() {
            return Err(DataError::EmptyDomain { path: PathBuf::from("<domain A>") });
        }
        Ok(Self {
            files_a,
            pair: RandPair::new(files_b)?,
            item_tfms,
            to_tensor_a: ToTensor::new(),
            to_tensor_b: ToTensor::new(),
        })
    }

    pub fn files_a(&self) -> &[PathBuf] { &self.files_a }
    pub fn files_b(&self) -> &[PathBuf] { self.pair.items() }

    /// Paths that item `index` resolves to for this draw.
    pub fn paths(&self, index: usize, rng: &mut StdRng) -> Option<(&Path, &Path)> {
        let a = self.files_a.get(index)?;
        Some((a.as_path(), self.pair.encode(index, rng)))
    }

    fn load_a(&self, path: &Path, rng: &mut StdRng) -> Result<TensorImage<DomainA>> {
        let img = load_image(path)?;
        Ok(self.to_tensor_a.encode(self.item_tfms.encode(img, rng)?))
    }

    fn load_b(&self, path: &Path, rng: &mut StdRng) -> Result<TensorImage<DomainB>> {
        let img = load_image(path)?;
        Ok(self.to_tensor_b.encode(self.item_tfms.encode(img, rng)?))
    }
}

impl Dataset for UnpairedDataset {
    type Item = (TensorImage<DomainA>, TensorImage<DomainB>);

    fn len(&self) -> usize {
        self.files_a.len()
    }

    fn get(&self, index: usize, rng: &mut StdRng) -> Result<Self::Item> {
        let (a, b) = self.paths(index, rng).ok_or_else(|| {
            DataError::InvalidArgument(format!("index {} out of range for {} items", index, self.files_a.len()))
        })?;
        Ok((self.load_a(a, rng)?, self.load_b(b, rng)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::{ItemTransform, RandomCrop};
    use image::{Rgb, RgbImage};
    use rand::SeedableRng;

    fn write_domain(dir: &Path, prefix: &str, n: usize, value: u8) -> Vec<PathBuf> {
        (0..n)
            .map(|i| {
                let path = dir.join(format!("{}{}.png", prefix, i));
                RgbImage::from_pixel(6, 5, Rgb([value, i as u8, 0])).save(&path).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn items_pair_a_index_with_random_b() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_domain(dir.path(), "a", 3, 10);
        let b = write_domain(dir.path(), "b", 2, 200);
        let tfms: Vec<Box<dyn ItemTransform>> = vec![Box::new(RandomCrop::new(4).unwrap())];
        let ds = UnpairedDataset::new(a, b, ItemPipeline::new(tfms)).unwrap();
        assert_eq!(ds.len(), 3);

        let mut rng = StdRng::seed_from_u64(9);
        let (ta, tb) = ds.get(2, &mut rng).unwrap();
        assert_eq!(ta.shape(), [3, 4, 4]);
        assert_eq!(tb.shape(), [3, 4, 4]);
        // red channel identifies the domain, green the file index
        assert!(ta.data()[..16].iter().all(|v| *v == 10));
        assert!(ta.data()[16..32].iter().all(|v| *v == 2));
        assert!(tb.data()[..16].iter().all(|v| *v == 200));
        assert!(tb.data()[16] < 2);
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_domain(dir.path(), "a", 1, 0);
        let ds = UnpairedDataset::new(a.clone(), a, ItemPipeline::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(ds.get(1, &mut rng).is_err());
    }

    #[test]
    fn empty_domains_are_rejected() {
        let b = vec![PathBuf::from("b.png")];
        assert!(matches!(UnpairedDataset::new(vec![], b.clone(), ItemPipeline::default()), Err(DataError::EmptyDomain { .. })));
        assert!(matches!(UnpairedDataset::new(b, vec![], ItemPipeline::default()), Err(DataError::EmptyDomain { .. })));
    }
}
