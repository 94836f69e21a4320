//! Inference module
//!
//! - `runner`: load a checkpoint and score it on the test split
//! - `predictions`: the `label,prediction` table written per run

pub mod predictions;
pub mod runner;

pub use predictions::{read_predictions, write_predictions, PredictionRecord, PREDICTIONS_FILE};
pub use runner::{
    infer, infer_with_dataset, run_inference, InferenceConfig, InferenceReport,
    TEST_ACCURACY_METRIC,
};
