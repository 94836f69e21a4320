//! Training loop
//!
//! A hand-written loop over Burn's data loader rather than the
//! `LearnerBuilder`: one SGD step per batch and a running-loss line every
//! `log_interval` batches.

use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::{
    config::Config,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    nn::loss::CrossEntropyLossConfig,
    optim::{momentum::MomentumConfig, GradientsParams, Optimizer, SgdConfig},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::checkpoint::{save_checkpoint, CHECKPOINT_FILE};
use super::config::{TrainingConfig, CONFIG_FILE};
use crate::dataset::{Cifar10Batcher, Cifar10Dataset};
use crate::model::Net;
use crate::tracking::{params_from, ExperimentTracker};
use crate::utils::error::Result;
use crate::utils::{format_duration, LossWindow};

/// Metric key for windowed training loss
pub const TRAINING_LOSS_METRIC: &str = "Training Loss";

/// What a finished training run left behind
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub checkpoint_path: PathBuf,
    pub config_path: PathBuf,
    pub num_epochs: usize,
    pub batches_per_epoch: usize,
    /// Average of the last completed loss window, if any closed
    pub last_window_loss: Option<f64>,
    pub elapsed_secs: f64,
}

/// Train on the CIFAR-10 training split under `data_dir`
///
/// The split is downloaded on first use.
pub fn train<B: AutodiffBackend>(
    config: &TrainingConfig,
    data_dir: &Path,
    artifacts_dir: &Path,
    tracker: &mut dyn ExperimentTracker,
    device: &B::Device,
) -> Result<TrainingSummary> {
    println!("{}", "Loading Dataset...".cyan());
    let dataset = Cifar10Dataset::train(data_dir)?;
    train_with_dataset::<B>(config, dataset, artifacts_dir, tracker, device)
}

/// Train on an already loaded dataset and write the artifacts
///
/// Writes `config.json` and `cifar_net.pth` into `artifacts_dir`. With
/// `num_epochs == 0` the freshly initialized weights are saved.
pub fn train_with_dataset<B: AutodiffBackend>(
    config: &TrainingConfig,
    dataset: Cifar10Dataset,
    artifacts_dir: &Path,
    tracker: &mut dyn ExperimentTracker,
    device: &B::Device,
) -> Result<TrainingSummary> {
    println!("{}", "Initializing Training...".green().bold());
    println!("  Device: {:?}", device);

    std::fs::create_dir_all(artifacts_dir)?;
    let config_path = artifacts_dir.join(CONFIG_FILE);
    config.save(&config_path)?;
    let mut params = params_from(config)?;
    params.insert(
        "train_artifacts_dir".to_string(),
        Value::String(artifacts_dir.display().to_string()),
    );
    tracker.log_params(&params)?;

    B::seed(config.seed);

    let batch_size = config.batch_size.max(1);
    let batches_per_epoch = dataset.len().div_ceil(batch_size);
    info!(
        "Training on {} {} samples ({} batches per epoch)",
        dataset.len(),
        dataset.split(),
        batches_per_epoch
    );

    let mut builder = DataLoaderBuilder::new(Cifar10Batcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .shuffle(config.seed);
    if config.num_workers > 0 {
        builder = builder.num_workers(config.num_workers);
    }
    let loader = builder.build(dataset);

    let mut model: Net<B> = config.model.init(device);
    let mut optimizer = SgdConfig::new()
        .with_momentum(Some(
            MomentumConfig::new()
                .with_momentum(config.momentum)
                .with_dampening(0.0)
                .with_nesterov(false),
        ))
        .init::<B, Net<B>>();
    let loss_fn = CrossEntropyLossConfig::new().init(device);

    let mut window = LossWindow::new(config.log_interval);
    debug!("Reporting running loss every {} batches", window.interval());
    let mut last_window_loss = None;
    let start = Instant::now();

    for epoch in 0..config.num_epochs {
        println!(
            "{}",
            format!("Epoch {}/{}", epoch + 1, config.num_epochs)
                .yellow()
                .bold()
        );
        window.reset();

        for (i, batch) in loader.iter().enumerate() {
            let logits = model.forward(batch.images);
            let loss = loss_fn.forward(logits, batch.targets);
            let loss_value: f64 = loss.clone().into_scalar().elem();

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(config.learning_rate, model, grads);

            if let Some(avg) = window.push(loss_value) {
                println!("[{}, {:5}] loss: {:.3}", epoch + 1, i + 1, avg);
                tracker.log_metric(
                    TRAINING_LOSS_METRIC,
                    avg,
                    Some(i + epoch * batches_per_epoch),
                )?;
                last_window_loss = Some(avg);
            }
        }

        debug!("Epoch {} done after {:.1}s", epoch + 1, start.elapsed().as_secs_f64());
    }

    let elapsed_secs = start.elapsed().as_secs_f64();
    println!("{}", "Finished Training".green().bold());
    info!("Training took {}", format_duration(elapsed_secs));

    let checkpoint_path = artifacts_dir.join(CHECKPOINT_FILE);
    save_checkpoint(&model, &checkpoint_path)?;
    println!("Model saved to {}", checkpoint_path.display());

    Ok(TrainingSummary {
        checkpoint_path,
        config_path,
        num_epochs: config.num_epochs,
        batches_per_epoch,
        last_window_loss,
        elapsed_secs,
    })
}
