//! # cifar_classifier
//!
//! Train and evaluate a small convolutional classifier on CIFAR-10 with
//! the Burn framework, recording runs to an experiment-tracking sink.
//!
//! ## Modules
//!
//! - `model`: the CNN and its configuration
//! - `dataset`: CIFAR-10 download, parsing and batching
//! - `training`: SGD training loop and checkpointing
//! - `inference`: test-split evaluation and prediction tables
//! - `tracking`: run parameter and metric sinks
//! - `diagnostics`: backend availability report
//! - `backend`: CPU/GPU backend selection
//! - `utils`: errors, logging and running metrics

pub mod backend;
pub mod dataset;
pub mod diagnostics;
pub mod inference;
pub mod model;
pub mod tracking;
pub mod training;
pub mod utils;

pub use inference::{infer, run_inference, InferenceConfig, InferenceReport};
pub use model::{Net, NetConfig};
pub use training::{train, train_with_dataset, TrainingConfig};
pub use utils::error::{CifarError, Result};

/// Number of CIFAR-10 classes
pub const NUM_CLASSES: usize = 10;

/// Side length of a CIFAR-10 image
pub const IMAGE_SIZE: usize = 32;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
