mod common;

pub mod annotate;
pub mod checkpoint;
pub mod config;
pub mod dataset;
pub mod device;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod plot;

pub use pipeline::{start, start_with_registry};
pub use plot::plot_images_grid;
