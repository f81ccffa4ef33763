//! Data loading and evaluation utilities for unpaired image-to-image
//! translation: two unlabeled image domains are paired at random, batched,
//! normalized per domain, and compared with a Fréchet distance.

mod error;
mod tensor;
mod stats;
mod loader;
mod factory;
mod dumper;

pub mod config;
pub mod dataset;
pub mod logging;
pub mod metrics;
pub mod transforms;
pub mod utilities;

pub use {
    error::*,
    tensor::*,
    stats::*,
    loader::*,
    factory::*,
    dumper::*,
    config::DlsConfig,
    dataset::UnpairedDataset
};
