use std::{path::{Path, PathBuf}, sync::Arc};

use rand::Rng;
use tracing::info;

use crate::{
    compute_stats,
    config::DlsConfig,
    dataset::{Dataset, UnpairedDataset},
    transforms::{
        BatchPipeline, BatchTransform, CustomNormalize, FlipItem, IntToFloat, ItemPipeline, ItemTransform,
        Normalize, RandomCrop, Resize,
    },
    utilities::{get_image_files, truncate_files},
    worker_pool, DataError, DataLoader, DataLoaders, LoaderOptions, Result,
};

fn domain_files(dir: &Path, cap: Option<usize>) -> Result<Vec<PathBuf>> {
    let all = get_image_files(dir)?;
    let found = all.len();
    let files = truncate_files(all, cap);
    if files.is_empty() {
        return Err(DataError::EmptyDomain { path: dir.to_path_buf() });
    }
    info!(dir = %dir.display(), found, kept = files.len(), "domain files");
    Ok(files)
}

/// Builds the data loaders described by `cfg`, turning its transform specs
/// (if any) into transforms.
pub fn get_dls(cfg: &DlsConfig) -> Result<DataLoaders> {
    let item_tfms = cfg
        .item_tfms
        .as_ref()
        .map(|specs| specs.iter().map(|s| s.build()).collect::<Result<Vec<_>>>())
        .transpose()?;
    let batch_tfms = cfg
        .batch_tfms
        .as_ref()
        .map(|specs| specs.iter().map(|s| s.build()).collect::<Result<Vec<_>>>())
        .transpose()?;
    get_dls_with(cfg, item_tfms, batch_tfms)
}

/// Like [`get_dls`] but with transform lists given directly; `None` selects
/// the defaults and the transform specs inside `cfg` are ignored.
///
/// Default item transforms are `Resize(load_size)` then
/// `RandomCrop(crop_size)`. Default batch transforms are a normalization
/// (dataset statistics when `cfg.normalize`, else 0.5/0.5) then
/// `FlipItem(flip_p)`. `IntToFloat` always runs first.
pub fn get_dls_with(
    cfg: &DlsConfig,
    item_tfms: Option<Vec<Box<dyn ItemTransform>>>,
    batch_tfms: Option<Vec<Box<dyn BatchTransform>>>,
) -> Result<DataLoaders> {
    let files_a = domain_files(&cfg.path_a, cfg.num_a)?;
    let files_b = domain_files(&cfg.path_b, cfg.num_b)?;

    let item_tfms: Vec<Box<dyn ItemTransform>> = match item_tfms {
        Some(tfms) => tfms,
        None => vec![Box::new(Resize::new(cfg.load_size)?), Box::new(RandomCrop::new(cfg.crop_size)?)],
    };
    let dataset = Arc::new(UnpairedDataset::new(files_a, files_b, ItemPipeline::new(item_tfms))?);

    let seed = cfg.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let pool = worker_pool(cfg.num_workers)?;
    let mut stats = None;
    let batch_tfms: Vec<Box<dyn BatchTransform>> = match batch_tfms {
        Some(tfms) => tfms,
        None => {
            let normalize: Box<dyn BatchTransform> = if cfg.normalize {
                let measured = compute_stats(&dataset, seed, pool.as_deref())?;
                let tfm = CustomNormalize::new(measured.a.clone(), measured.b.clone());
                stats = Some(measured);
                Box::new(tfm)
            } else {
                Box::new(Normalize::from_stats(0.5, 0.5)?)
            };
            vec![normalize, Box::new(FlipItem::new(cfg.flip_p)?)]
        }
    };
    let mut pipeline: Vec<Box<dyn BatchTransform>> = vec![Box::new(IntToFloat)];
    pipeline.extend(batch_tfms);

    let options = LoaderOptions {
        bs: cfg.bs,
        shuffle: true,
        drop_last: true,
        num_workers: cfg.num_workers,
        seed: Some(seed),
    };
    let train = DataLoader::with_pool(dataset, BatchPipeline::new(pipeline), options, pool)?;
    info!(items = train.dataset().len(), batches = train.len(), bs = cfg.bs, "data loaders ready");
    Ok(DataLoaders { train, stats })
}
