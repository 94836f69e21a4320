//! Test-split evaluation
//!
//! Runs on a plain (non-autodiff) backend, so no gradients are tracked.

use std::path::Path;

use burn::{
    config::Config,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    tensor::backend::Backend,
};
use colored::Colorize;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use super::predictions::{write_predictions, PredictionRecord, PREDICTIONS_FILE};
use crate::dataset::{Cifar10Batcher, Cifar10Dataset};
use crate::model::{Net, NetConfig};
use crate::tracking::ExperimentTracker;
use crate::training::{load_checkpoint, TrainingConfig, CHECKPOINT_FILE, CONFIG_FILE};
use crate::utils::error::CifarError;
use crate::utils::AccuracyCounter;

/// Metric key for test-split accuracy
pub const TEST_ACCURACY_METRIC: &str = "test_accuracy";

/// Evaluation settings
#[derive(Config, Debug)]
pub struct InferenceConfig {
    pub model: NetConfig,

    #[config(default = 2)]
    pub batch_size: usize,
}

impl InferenceConfig {
    /// Use the network config saved next to the checkpoint, if there is one
    ///
    /// A missing `config.json` means the default network; an unreadable one
    /// is an error.
    pub fn from_artifacts(train_artifacts_dir: &Path) -> crate::utils::error::Result<Self> {
        let path = train_artifacts_dir.join(CONFIG_FILE);
        let model = match TrainingConfig::load_from(&path) {
            Ok(training) => training.model,
            Err(CifarError::PathNotFound(_)) => {
                debug!("No {} found, assuming the default network", path.display());
                NetConfig::default()
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(model))
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self::new(NetConfig::default())
    }
}

/// Outcome of evaluating a model on the test split
#[derive(Debug, Clone, Serialize)]
pub struct InferenceReport {
    pub correct: usize,
    pub total: usize,
    /// `correct / total`, 0 for an empty split
    pub accuracy: f64,
    /// One row per sample, in split order
    pub predictions: Vec<PredictionRecord>,
}

/// Predict every sample of `dataset` in order and score the result
pub fn run_inference<B: Backend>(
    model: &Net<B>,
    dataset: Cifar10Dataset,
    config: &InferenceConfig,
    device: &B::Device,
) -> crate::utils::error::Result<InferenceReport> {
    let total_items = dataset.len();
    debug!("Evaluating {} {} samples", total_items, dataset.split());

    // Single worker: batch order must equal split order
    let loader = DataLoaderBuilder::new(Cifar10Batcher::<B>::new(device.clone()))
        .batch_size(config.batch_size.max(1))
        .build(dataset);

    let mut counter = AccuracyCounter::new();
    let mut predictions = Vec::with_capacity(total_items);

    for batch in loader.iter() {
        let predicted = to_indices(model.predict(batch.images).into_data())?;
        let labels = to_indices(batch.targets.into_data())?;

        counter.update_from_pairs(&labels, &predicted);
        predictions.extend(
            labels
                .into_iter()
                .zip(predicted)
                .map(|(label, prediction)| PredictionRecord { label, prediction }),
        );
    }

    Ok(InferenceReport {
        correct: counter.correct,
        total: counter.total,
        accuracy: counter.accuracy(),
        predictions,
    })
}

fn to_indices(data: burn::tensor::TensorData) -> crate::utils::error::Result<Vec<usize>> {
    let values = data
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| CifarError::Dataset(format!("Unexpected tensor data: {:?}", e)))?;
    Ok(values.into_iter().map(|v| v.max(0) as usize).collect())
}

/// Evaluate the checkpoint in `train_artifacts_dir` on the test split under
/// `data_dir`, writing `preds.csv` into `preds_dir`
pub fn infer<B: Backend>(
    train_artifacts_dir: &Path,
    preds_dir: &Path,
    data_dir: &Path,
    tracker: &mut dyn ExperimentTracker,
    device: &B::Device,
) -> crate::utils::error::Result<InferenceReport> {
    println!("{}", "Loading Dataset...".cyan());
    let dataset = Cifar10Dataset::test(data_dir)?;
    infer_with_dataset::<B>(train_artifacts_dir, preds_dir, dataset, tracker, device)
}

/// Same as [`infer`] over an already loaded test split
pub fn infer_with_dataset<B: Backend>(
    train_artifacts_dir: &Path,
    preds_dir: &Path,
    dataset: Cifar10Dataset,
    tracker: &mut dyn ExperimentTracker,
    device: &B::Device,
) -> crate::utils::error::Result<InferenceReport> {
    let config = InferenceConfig::from_artifacts(train_artifacts_dir)?;

    let mut params = Map::new();
    params.insert(
        "train_artifacts_dir".to_string(),
        Value::String(train_artifacts_dir.display().to_string()),
    );
    params.insert(
        "preds_dir".to_string(),
        Value::String(preds_dir.display().to_string()),
    );
    params.insert("batch_size".to_string(), json!(config.batch_size));
    tracker.log_params(&params)?;

    let checkpoint = train_artifacts_dir.join(CHECKPOINT_FILE);
    println!("{}", "Loading Model...".cyan());
    let model = load_checkpoint::<B>(&checkpoint, &config.model, device)?;
    info!("Loaded weights from {}", checkpoint.display());

    let report = run_inference(&model, dataset, &config, device)?;

    println!(
        "Accuracy of the network on the {} test images: {:.1} %",
        report.total,
        (100.0 * report.accuracy).floor()
    );
    tracker.log_metric(TEST_ACCURACY_METRIC, report.accuracy, None)?;

    let preds_path = preds_dir.join(PREDICTIONS_FILE);
    write_predictions(&preds_path, &report.predictions)?;
    info!("Wrote {} predictions to {}", report.predictions.len(), preds_path.display());

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Cifar10Item, Split};
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    fn tiny_test_split(n: usize) -> Cifar10Dataset {
        let items = (0..n)
            .map(|i| Cifar10Item::new(vec![(i * 53 % 256) as u8; 3 * 32 * 32], (i * 7) % 10))
            .collect();
        Cifar10Dataset::from_items(Split::Test, items)
    }

    #[test]
    fn test_rows_follow_split_order() {
        let device = Default::default();
        let model = NetConfig::default().init::<TestBackend>(&device);
        let dataset = tiny_test_split(5);
        let labels = dataset.labels();

        let report =
            run_inference(&model, dataset, &InferenceConfig::default(), &device).unwrap();

        let row_labels: Vec<usize> = report.predictions.iter().map(|p| p.label).collect();
        assert_eq!(row_labels, labels);
        assert_eq!(report.total, 5);
    }

    #[test]
    fn test_accuracy_matches_table() {
        let device = Default::default();
        let model = NetConfig::default().init::<TestBackend>(&device);

        let report =
            run_inference(&model, tiny_test_split(7), &InferenceConfig::default(), &device)
                .unwrap();

        let correct = report.predictions.iter().filter(|p| p.is_correct()).count();
        assert_eq!(correct, report.correct);
        assert_eq!(report.accuracy, correct as f64 / 7.0);
        assert!((0.0..=1.0).contains(&report.accuracy));
    }

    #[test]
    fn test_empty_split() {
        let device = Default::default();
        let model = NetConfig::default().init::<TestBackend>(&device);

        let report = run_inference(
            &model,
            Cifar10Dataset::from_items(Split::Test, Vec::new()),
            &InferenceConfig::default(),
            &device,
        )
        .unwrap();

        assert_eq!(report.total, 0);
        assert_eq!(report.accuracy, 0.0);
        assert!(report.predictions.is_empty());
    }

    #[test]
    fn test_config_from_artifacts_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = InferenceConfig::from_artifacts(dir.path()).unwrap();

        assert_eq!(config.batch_size, 2);
        assert_eq!(config.model.num_classes, 10);
    }

    #[test]
    fn test_config_from_artifacts_reads_saved_model() {
        let dir = tempfile::tempdir().unwrap();
        TrainingConfig::new(NetConfig::new().with_num_classes(4))
            .save(dir.path().join(CONFIG_FILE))
            .unwrap();

        let config = InferenceConfig::from_artifacts(dir.path()).unwrap();
        assert_eq!(config.model.num_classes, 4);
    }

    #[test]
    fn test_corrupt_saved_config_stops_inference() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{ not json").unwrap();
        let device = Default::default();
        crate::training::save_checkpoint(
            &NetConfig::default().init::<TestBackend>(&device),
            &dir.path().join(CHECKPOINT_FILE),
        )
        .unwrap();

        let result = infer_with_dataset::<TestBackend>(
            dir.path(),
            dir.path(),
            tiny_test_split(3),
            &mut crate::tracking::InMemoryTracker::new(),
            &device,
        );

        assert!(matches!(result, Err(CifarError::Config(_))));
        assert!(!dir.path().join(PREDICTIONS_FILE).exists());
    }
}
