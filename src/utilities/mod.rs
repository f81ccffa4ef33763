mod files;
mod loader;

pub use {
    files::*,
    loader::*
};
