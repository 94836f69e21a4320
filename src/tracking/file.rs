//! File-backed tracking sink
//!
//! Layout:
//!
//! ```text
//! <root>/<experiment>/<run_id>/params.json
//! <root>/<experiment>/<run_id>/metrics.csv   key,value,step,timestamp
//! ```

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::ExperimentTracker;
use crate::utils::error::Result;

pub const PARAMS_FILE: &str = "params.json";
pub const METRICS_FILE: &str = "metrics.csv";

#[derive(Serialize)]
struct MetricRow<'a> {
    key: &'a str,
    value: f64,
    step: Option<usize>,
    timestamp: String,
}

/// Writes each run to its own directory
pub struct FileTracker {
    run_id: String,
    run_dir: PathBuf,
    params: Map<String, Value>,
    metrics: csv::Writer<File>,
}

impl FileTracker {
    /// Start a new run under `root/experiment`
    pub fn create(root: impl AsRef<Path>, experiment: &str) -> Result<Self> {
        let experiment_dir = root.as_ref().join(experiment);
        let base_id = Local::now().format("%Y%m%d_%H%M%S").to_string();

        // Runs started within the same second get a numeric suffix
        let mut run_id = base_id.clone();
        let mut suffix = 1;
        while experiment_dir.join(&run_id).exists() {
            run_id = format!("{}-{}", base_id, suffix);
            suffix += 1;
        }

        let run_dir = experiment_dir.join(&run_id);
        fs::create_dir_all(&run_dir)?;
        let metrics = csv::Writer::from_path(run_dir.join(METRICS_FILE))?;

        debug!("Tracking run {} in {}", run_id, run_dir.display());

        Ok(Self {
            run_id,
            run_dir,
            params: Map::new(),
            metrics,
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }
}

impl ExperimentTracker for FileTracker {
    fn run_id(&self) -> &str {
        &self.run_id
    }

    fn log_params(&mut self, params: &Map<String, Value>) -> Result<()> {
        self.params
            .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        let json = serde_json::to_string_pretty(&self.params)?;
        fs::write(self.run_dir.join(PARAMS_FILE), json)?;
        Ok(())
    }

    fn log_metric(&mut self, key: &str, value: f64, step: Option<usize>) -> Result<()> {
        self.metrics.serialize(MetricRow {
            key,
            value,
            step,
            timestamp: Local::now().to_rfc3339(),
        })?;
        self.metrics.flush()?;
        Ok(())
    }
}
