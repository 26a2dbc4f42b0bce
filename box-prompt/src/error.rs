//! Typed usage errors.
//!
//! Everything else travels as [anyhow::Error]. These are the mistakes a caller
//! makes in the arguments or the configuration, kept as a concrete type so that
//! they can be told apart with `downcast_ref`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error(
        "the number of images ({num_images}) exceeds the grid size {rows}x{cols} ({}), \
         please increase the grid size or reduce the number of images",
        .rows * .cols
    )]
    GridOverflow {
        num_images: usize,
        rows: usize,
        cols: usize,
    },
    #[error("grid size must be non-zero, but get {rows}x{cols}")]
    EmptyGrid { rows: usize, cols: usize },
    #[error("unknown colormap '{0}'")]
    UnknownColormap(String),
    #[error("unknown dataset '{name}', available datasets are {available:?}")]
    UnknownDataset {
        name: String,
        available: Vec<String>,
    },
    #[error("unsupported image shape {0:?}, expect HxW, HxWx1 or HxWx3")]
    UnsupportedImageShape(Vec<usize>),
    #[error("the experiment name is not set")]
    MissingExpName,
    #[error("neither lora_ckpt nor testing_ckpt is set")]
    MissingCheckpoint,
}
