use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    transforms::{BatchTransform, CustomNormalize, FlipItem, ItemTransform, Normalize, RandomCrop, Resize},
    DataError, Result, Stats,
};

fn default_load_size() -> u32 { 512 }
fn default_crop_size() -> u32 { 256 }
fn default_bs() -> usize { 4 }
fn default_num_workers() -> usize { 2 }
fn default_flip_p() -> f64 { 0.5 }

/// Parameters of [`crate::get_dls`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DlsConfig {
    pub path_a: PathBuf,
    pub path_b: PathBuf,
    #[serde(default)]
    pub num_a: Option<usize>,
    #[serde(default)]
    pub num_b: Option<usize>,
    #[serde(default = "default_load_size")]
    pub load_size: u32,
    #[serde(default = "default_crop_size")]
    pub crop_size: u32,
    /// Replaces the default `[resize(load_size), random_crop(crop_size)]`.
    #[serde(default)]
    pub item_tfms: Option<Vec<ItemTfmSpec>>,
    /// Replaces the default normalize + flip. `IntToFloat` always runs first.
    #[serde(default)]
    pub batch_tfms: Option<Vec<BatchTfmSpec>>,
    #[serde(default = "default_bs")]
    pub bs: usize,
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    #[serde(default)]
    pub normalize: bool,
    #[serde(default = "default_flip_p")]
    pub flip_p: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl DlsConfig {
    pub fn new<A: Into<PathBuf>, B: Into<PathBuf>>(path_a: A, path_b: B) -> Self {
        Self {
            path_a: path_a.into(),
            path_b: path_b.into(),
            num_a: None,
            num_b: None,
            load_size: default_load_size(),
            crop_size: default_crop_size(),
            item_tfms: None,
            batch_tfms: None,
            bs: default_bs(),
            num_workers: default_num_workers(),
            normalize: false,
            flip_p: default_flip_p(),
            seed: None,
        }
    }

    /// Reads a YAML (`.yaml`/`.yml`) or JSON (`.json`) file. Relative domain
    /// paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();
        let config_err = |msg: String| DataError::Config { path: path.to_path_buf(), msg };
        let mut cfg: DlsConfig = match ext.as_str() {
            "json" => serde_json::from_str(&text).map_err(|e| config_err(e.to_string()))?,
            "yaml" | "yml" => serde_yaml::from_str(&text).map_err(|e| config_err(e.to_string()))?,
            other => return Err(config_err(format!("unsupported config extension {:?}", other))),
        };
        if let Some(dir) = path.parent() {
            cfg.path_a = dir.join(&cfg.path_a);
            cfg.path_b = dir.join(&cfg.path_b);
        }
        Ok(cfg)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemTfmSpec {
    Resize { size: u32 },
    RandomCrop { size: u32 },
}

impl ItemTfmSpec {
    pub fn build(&self) -> Result<Box<dyn ItemTransform>> {
        let tfm: Box<dyn ItemTransform> = match *self {
            ItemTfmSpec::Resize { size } => Box::new(Resize::new(size)?),
            ItemTfmSpec::RandomCrop { size } => Box::new(RandomCrop::new(size)?),
        };
        Ok(tfm)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchTfmSpec {
    Normalize { mean: Vec<f32>, std: Vec<f32> },
    CustomNormalize { a: Stats, b: Stats },
    Flip { p: f64 },
}

impl BatchTfmSpec {
    pub fn build(&self) -> Result<Box<dyn BatchTransform>> {
        let tfm: Box<dyn BatchTransform> = match self {
            BatchTfmSpec::Normalize { mean, std } => Box::new(Normalize::new(Stats::new(mean.clone(), std.clone())?)),
            BatchTfmSpec::CustomNormalize { a, b } => Box::new(CustomNormalize::new(
                Stats::new(a.mean.clone(), a.std.clone())?,
                Stats::new(b.mean.clone(), b.std.clone())?,
            )),
            BatchTfmSpec::Flip { p } => Box::new(FlipItem::new(*p)?),
        };
        Ok(tfm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dls.yaml");
        std::fs::write(&path, "path_a: horses\npath_b: zebras\nnum_a: 3\n").unwrap();

        let cfg = DlsConfig::load(&path).unwrap();
        assert_eq!(cfg.path_a, dir.path().join("horses"));
        assert_eq!(cfg.num_a, Some(3));
        assert_eq!(cfg.num_b, None);
        assert_eq!((cfg.load_size, cfg.crop_size, cfg.bs, cfg.num_workers), (512, 256, 4, 2));
        assert!(!cfg.normalize);
    }

    #[test]
    fn json_transform_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dls.json");
        std::fs::write(
            &path,
            r#"{"path_a": "/a", "path_b": "/b",
                "item_tfms": [{"type": "resize", "size": 64}, {"type": "random_crop", "size": 32}],
                "batch_tfms": [{"type": "normalize", "mean": [0.5], "std": [0.5]},
                               {"type": "custom_normalize",
                                "a": {"mean": [0.4, 0.5, 0.6], "std": [0.2, 0.2, 0.2]},
                                "b": {"mean": [0.1], "std": [0.3]}},
                               {"type": "flip", "p": 0.25}]}"#,
        )
        .unwrap();

        let cfg = DlsConfig::load(&path).unwrap();
        assert_eq!(cfg.path_a, PathBuf::from("/a"));
        let items = cfg.item_tfms.unwrap();
        assert_eq!(items[1], ItemTfmSpec::RandomCrop { size: 32 });
        assert!(items.iter().all(|t| t.build().is_ok()));
        let batches = cfg.batch_tfms.unwrap();
        assert_eq!(
            batches[1],
            BatchTfmSpec::CustomNormalize {
                a: Stats { mean: vec![0.4, 0.5, 0.6], std: vec![0.2; 3] },
                b: Stats { mean: vec![0.1], std: vec![0.3] },
            }
        );
        assert!(batches.iter().all(|t| t.build().is_ok()));
    }

    #[test]
    fn invalid_spec_fails_to_build() {
        assert!(ItemTfmSpec::Resize { size: 0 }.build().is_err());
        assert!(BatchTfmSpec::Flip { p: 2. }.build().is_err());
    }

    #[test]
    fn unknown_extension_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dls.toml");
        std::fs::write(&path, "").unwrap();
        assert!(matches!(DlsConfig::load(&path), Err(DataError::Config { .. })));
    }
}
