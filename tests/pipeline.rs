//! End-to-end train/infer runs over small synthetic CIFAR-format datasets

use std::fs;
use std::path::Path;

use burn::backend::Autodiff;
use burn_ndarray::NdArray;

use cifar_classifier::dataset::cifar10::{write_split, BATCHES_DIR, IMAGE_BYTES};
use cifar_classifier::dataset::{Cifar10Item, Split};
use cifar_classifier::inference::{infer, read_predictions, PREDICTIONS_FILE, TEST_ACCURACY_METRIC};
use cifar_classifier::model::{Net, NetConfig};
use cifar_classifier::tracking::{ExperimentTracker, FileTracker, InMemoryTracker};
use cifar_classifier::training::{
    load_checkpoint, save_checkpoint, train, TrainingConfig, CHECKPOINT_FILE, TRAINING_LOSS_METRIC,
};
use cifar_classifier::CifarError;

type TrainBackend = Autodiff<NdArray>;
type InferBackend = NdArray;

fn synthetic_items(n: usize, offset: usize) -> Vec<Cifar10Item> {
    (0..n)
        .map(|i| {
            let label = (i + offset) % 10;
            let image = (0..IMAGE_BYTES)
                .map(|p| ((p * (label + 1) + i * 11) % 256) as u8)
                .collect();
            Cifar10Item::new(image, label)
        })
        .collect()
}

/// Lay out a data directory the loaders accept without downloading
fn write_dataset(data_dir: &Path, train_len: usize, test_len: usize) {
    let batches_dir = data_dir.join(BATCHES_DIR);
    write_split(&batches_dir, Split::Train, &synthetic_items(train_len, 0)).unwrap();
    write_split(&batches_dir, Split::Test, &synthetic_items(test_len, 3)).unwrap();
}

fn quick_config(epochs: usize) -> TrainingConfig {
    TrainingConfig::default()
        .with_num_epochs(epochs)
        .with_batch_size(4)
        .with_num_workers(0)
        .with_log_interval(2)
}

#[test]
fn zero_epoch_training_writes_loadable_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let artifacts = dir.path().join("outputs");
    write_dataset(&data_dir, 10, 4);

    let mut tracker = InMemoryTracker::new();
    let summary = train::<TrainBackend>(
        &quick_config(0),
        &data_dir,
        &artifacts,
        &mut tracker,
        &Default::default(),
    )
    .unwrap();

    assert_eq!(summary.checkpoint_path, artifacts.join(CHECKPOINT_FILE));
    assert!(tracker.metric(TRAINING_LOSS_METRIC).is_empty());

    let config = NetConfig::default();
    let model = load_checkpoint::<InferBackend>(&summary.checkpoint_path, &config, &Default::default())
        .unwrap();
    assert_eq!(model.param_shapes(), config.expected_shapes());
}

#[test]
fn repeated_inference_gives_identical_tables() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let artifacts = dir.path().join("outputs");
    write_dataset(&data_dir, 12, 9);

    train::<TrainBackend>(
        &quick_config(1),
        &data_dir,
        &artifacts,
        &mut InMemoryTracker::new(),
        &Default::default(),
    )
    .unwrap();

    let first_dir = dir.path().join("preds_a");
    let second_dir = dir.path().join("preds_b");
    let first = infer::<InferBackend>(
        &artifacts,
        &first_dir,
        &data_dir,
        &mut InMemoryTracker::new(),
        &Default::default(),
    )
    .unwrap();
    let second = infer::<InferBackend>(
        &artifacts,
        &second_dir,
        &data_dir,
        &mut InMemoryTracker::new(),
        &Default::default(),
    )
    .unwrap();

    assert_eq!(first.predictions, second.predictions);
    assert_eq!(
        fs::read_to_string(first_dir.join(PREDICTIONS_FILE)).unwrap(),
        fs::read_to_string(second_dir.join(PREDICTIONS_FILE)).unwrap()
    );
}

#[test]
fn prediction_table_agrees_with_reported_accuracy() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let artifacts = dir.path().join("outputs");
    write_dataset(&data_dir, 8, 11);

    train::<TrainBackend>(
        &quick_config(1),
        &data_dir,
        &artifacts,
        &mut InMemoryTracker::new(),
        &Default::default(),
    )
    .unwrap();

    let mut tracker = InMemoryTracker::new();
    let report = infer::<InferBackend>(
        &artifacts,
        &artifacts,
        &data_dir,
        &mut tracker,
        &Default::default(),
    )
    .unwrap();

    let rows = read_predictions(&artifacts.join(PREDICTIONS_FILE)).unwrap();
    assert_eq!(rows.len(), 11);
    assert_eq!(report.total, 11);

    let expected_labels: Vec<usize> = synthetic_items(11, 3).iter().map(|i| i.label).collect();
    let row_labels: Vec<usize> = rows.iter().map(|r| r.label).collect();
    assert_eq!(row_labels, expected_labels);

    let correct = rows.iter().filter(|r| r.label == r.prediction).count();
    assert_eq!(report.accuracy, correct as f64 / rows.len() as f64);
    assert!((0.0..=1.0).contains(&report.accuracy));

    let logged = tracker.metric(TEST_ACCURACY_METRIC);
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].value, report.accuracy);
}

#[test]
fn mismatched_checkpoint_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let artifacts = dir.path().join("outputs");
    write_dataset(&data_dir, 4, 4);

    let wrong: Net<InferBackend> = NetConfig::new()
        .with_num_classes(7)
        .init(&Default::default());
    save_checkpoint(&wrong, &artifacts.join(CHECKPOINT_FILE)).unwrap();

    let result = infer::<InferBackend>(
        &artifacts,
        &artifacts,
        &data_dir,
        &mut InMemoryTracker::new(),
        &Default::default(),
    );

    assert!(matches!(result, Err(CifarError::ShapeMismatch { .. })));
    assert!(!artifacts.join(PREDICTIONS_FILE).exists());
}

#[test]
fn missing_checkpoint_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    write_dataset(&data_dir, 4, 4);

    let result = infer::<InferBackend>(
        &dir.path().join("nothing_here"),
        dir.path(),
        &data_dir,
        &mut InMemoryTracker::new(),
        &Default::default(),
    );

    assert!(matches!(result, Err(CifarError::PathNotFound(_))));
}

#[test]
fn file_tracker_records_training_run() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    let artifacts = dir.path().join("outputs");
    write_dataset(&data_dir, 16, 4);

    let mut tracker = FileTracker::create(dir.path().join("mlruns"), "default").unwrap();
    train::<TrainBackend>(
        &quick_config(1),
        &data_dir,
        &artifacts,
        &mut tracker,
        &Default::default(),
    )
    .unwrap();

    let run_dir = dir.path().join("mlruns").join("default").join(tracker.run_id());
    let params: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(run_dir.join("params.json")).unwrap()).unwrap();
    assert_eq!(params["batch_size"], serde_json::json!(4));

    let mut reader = csv::Reader::from_path(run_dir.join("metrics.csv")).unwrap();
    let steps: Vec<String> = reader
        .records()
        .map(|r| r.unwrap())
        .filter(|r| &r[0] == TRAINING_LOSS_METRIC)
        .map(|r| r[2].to_string())
        .collect();
    // 16 samples / batch 4 = 4 batches, window of 2
    assert_eq!(steps, vec!["1", "3"]);
}
