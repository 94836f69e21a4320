//! CIFAR-10 classifier CLI
//!
//! Entry points for training, evaluating and inspecting the small CIFAR-10
//! network built with the Burn framework.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use tracing::info;

use cifar_classifier::backend::{BackendKind, CpuBackend, CpuTrainingBackend};
#[cfg(feature = "cuda")]
use cifar_classifier::backend::{GpuBackend, GpuTrainingBackend};
use cifar_classifier::dataset::{class_name, cifar10, Cifar10Dataset};
use cifar_classifier::diagnostics::BackendReport;
use cifar_classifier::inference::infer;
use cifar_classifier::tracking::{
    format_params, params_from, ExperimentTracker, FileTracker, NoopTracker,
};
use cifar_classifier::training::{train, TrainingConfig};
use cifar_classifier::utils::logging::{init_logging, LogConfig};
use cifar_classifier::VERSION;

/// CIFAR-10 image classification with Burn
#[derive(Parser, Debug)]
#[command(name = "cifar_classifier")]
#[command(version)]
#[command(about = "Train and evaluate a small CNN on CIFAR-10", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Root directory for experiment tracking runs
    #[arg(
        long = "tracking_dir",
        env = "CIFAR_TRACKING_DIR",
        default_value = "mlruns",
        global = true
    )]
    tracking_dir: PathBuf,

    /// Experiment name runs are grouped under
    #[arg(long, default_value = "default", global = true)]
    experiment: String,

    /// Do not record parameters or metrics
    #[arg(long = "no_tracking", global = true)]
    no_tracking: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the network and save its weights
    Train(TrainArgs),

    /// Evaluate saved weights on the test split
    Infer(InferArgs),

    /// Report available compute backends
    Diagnose {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download and unpack CIFAR-10 without training
    Download {
        /// Directory the dataset is cached in
        #[arg(long = "data_dir", default_value = "data")]
        data_dir: PathBuf,
    },
}

#[derive(Args, Debug, Serialize)]
struct TrainArgs {
    /// Directory the weights and config are written to
    #[arg(long = "train_artifacts_dir", default_value = "outputs")]
    train_artifacts_dir: PathBuf,

    /// Training batch size
    #[arg(long = "batch_size", default_value = "4")]
    batch_size: usize,

    /// Number of passes over the training split
    #[arg(long, default_value = "2")]
    epochs: usize,

    /// Data loader worker threads
    #[arg(long = "num_workers", default_value = "2")]
    num_workers: usize,

    /// Seed for initialization and shuffling
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Directory the dataset is cached in
    #[arg(long = "data_dir", default_value = "data")]
    data_dir: PathBuf,

    /// Load a saved training config instead of the flags above
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Serialize)]
struct InferArgs {
    /// Directory holding cifar_net.pth
    #[arg(long = "train_artifacts_dir", default_value = "outputs")]
    train_artifacts_dir: PathBuf,

    /// Directory preds.csv is written to
    #[arg(long = "preds_dir", default_value = "outputs")]
    preds_dir: PathBuf,

    /// Directory the dataset is cached in
    #[arg(long = "data_dir", default_value = "data")]
    data_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else if cli.quiet {
        LogConfig::quiet()
    } else {
        LogConfig::default()
    };
    if let Err(e) = init_logging(&log_config) {
        eprintln!("{} {}", "Warning:".yellow(), e);
    }

    print_banner();

    match &cli.command {
        Commands::Train(args) => cmd_train(&cli, args),
        Commands::Infer(args) => cmd_infer(&cli, args),
        Commands::Diagnose { json } => cmd_diagnose(*json),
        Commands::Download { data_dir } => cmd_download(data_dir),
    }
}

fn print_banner() {
    println!(
        "{}",
        format!("CIFAR-10 Classifier v{} (Burn + Rust)", VERSION)
            .green()
            .bold()
    );
}

fn create_tracker(cli: &Cli) -> Result<Box<dyn ExperimentTracker>> {
    if cli.no_tracking {
        return Ok(Box::new(NoopTracker));
    }

    let tracker = FileTracker::create(&cli.tracking_dir, &cli.experiment)?;
    info!(
        "Tracking run {} under {}",
        tracker.run_id(),
        tracker.run_dir().display()
    );
    Ok(Box::new(tracker))
}

fn print_args<T: Serialize>(args: &T) -> Result<()> {
    println!("{}", format_params(&params_from(args)?));
    Ok(())
}

fn cmd_train(cli: &Cli, args: &TrainArgs) -> Result<()> {
    print_args(args)?;

    let config = match &args.config {
        Some(path) => TrainingConfig::load_from(path)?,
        None => TrainingConfig::default()
            .with_batch_size(args.batch_size)
            .with_num_epochs(args.epochs)
            .with_num_workers(args.num_workers)
            .with_seed(args.seed),
    };

    let mut tracker = create_tracker(cli)?;
    let backend = BackendKind::select();
    println!("{}", backend);

    match backend {
        #[cfg(feature = "cuda")]
        BackendKind::Cuda => {
            train::<GpuTrainingBackend>(
                &config,
                &args.data_dir,
                &args.train_artifacts_dir,
                tracker.as_mut(),
                &Default::default(),
            )?;
        }
        BackendKind::NdArray => {
            train::<CpuTrainingBackend>(
                &config,
                &args.data_dir,
                &args.train_artifacts_dir,
                tracker.as_mut(),
                &Default::default(),
            )?;
        }
    }

    Ok(())
}

fn cmd_infer(cli: &Cli, args: &InferArgs) -> Result<()> {
    print_args(args)?;

    let mut tracker = create_tracker(cli)?;
    let backend = BackendKind::select();
    println!("{}", backend);

    let report = match backend {
        #[cfg(feature = "cuda")]
        BackendKind::Cuda => infer::<GpuBackend>(
            &args.train_artifacts_dir,
            &args.preds_dir,
            &args.data_dir,
            tracker.as_mut(),
            &Default::default(),
        )?,
        BackendKind::NdArray => infer::<CpuBackend>(
            &args.train_artifacts_dir,
            &args.preds_dir,
            &args.data_dir,
            tracker.as_mut(),
            &Default::default(),
        )?,
    };

    info!("{} / {} correct", report.correct, report.total);
    Ok(())
}

fn cmd_diagnose(json: bool) -> Result<()> {
    let report = BackendReport::detect();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}

fn cmd_download(data_dir: &Path) -> Result<()> {
    let batches_dir = cifar10::ensure_downloaded(data_dir)?;
    println!("  Dataset ready in {}", batches_dir.display());

    let train = Cifar10Dataset::train(data_dir)?;
    println!();
    println!("{}", "Training split class distribution:".cyan().bold());
    for (label, count) in train.class_distribution().iter().enumerate() {
        println!(
            "  {:<12} {:>6}",
            class_name(label).unwrap_or("unknown"),
            count
        );
    }
    Ok(())
}
