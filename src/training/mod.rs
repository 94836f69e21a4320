//! Training module
//!
//! - `config`: hyperparameters (`TrainingConfig`)
//! - `checkpoint`: weight persistence and shape validation
//! - `trainer`: the SGD training loop

pub mod checkpoint;
pub mod config;
pub mod trainer;

pub use checkpoint::{load_checkpoint, save_checkpoint, CHECKPOINT_FILE};
pub use config::{TrainingConfig, CONFIG_FILE};
pub use trainer::{train, train_with_dataset, TrainingSummary, TRAINING_LOSS_METRIC};
