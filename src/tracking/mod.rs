//! Experiment tracking
//!
//! Runs report their parameters once and scalar metrics as they are
//! produced. The sink is a trait so the drivers do not care whether samples
//! land on disk, in memory or nowhere.

pub mod file;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::utils::error::{CifarError, Result};

pub use file::FileTracker;

/// Receiver for run parameters and scalar metrics
pub trait ExperimentTracker {
    /// Identifier of the current run
    fn run_id(&self) -> &str;

    /// Record run parameters; later calls add to or replace earlier keys
    fn log_params(&mut self, params: &Map<String, Value>) -> Result<()>;

    /// Record one metric sample
    fn log_metric(&mut self, key: &str, value: f64, step: Option<usize>) -> Result<()>;
}

/// One tracked metric sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub key: String,
    pub value: f64,
    pub step: Option<usize>,
}

/// Turn any serializable argument struct into a flat parameter map
pub fn params_from<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(CifarError::Tracking(format!(
            "parameters must serialize to an object, got {}",
            other
        ))),
    }
}

/// Render parameters as sorted `key: value` lines
pub fn format_params(params: &Map<String, Value>) -> String {
    let mut entries: Vec<_> = params.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    entries
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{}: {}", key, s),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Sink that discards everything (`--no_tracking`)
#[derive(Debug, Default)]
pub struct NoopTracker;

impl ExperimentTracker for NoopTracker {
    fn run_id(&self) -> &str {
        "untracked"
    }

    fn log_params(&mut self, _params: &Map<String, Value>) -> Result<()> {
        Ok(())
    }

    fn log_metric(&mut self, _key: &str, _value: f64, _step: Option<usize>) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps everything in memory
#[derive(Debug, Default)]
pub struct InMemoryTracker {
    pub params: Map<String, Value>,
    pub metrics: Vec<MetricRecord>,
}

impl InMemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// All samples recorded under `key`, in logging order
    pub fn metric(&self, key: &str) -> Vec<&MetricRecord> {
        self.metrics.iter().filter(|m| m.key == key).collect()
    }
}

impl ExperimentTracker for InMemoryTracker {
    fn run_id(&self) -> &str {
        "in-memory"
    }

    fn log_params(&mut self, params: &Map<String, Value>) -> Result<()> {
        self.params
            .extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    fn log_metric(&mut self, key: &str, value: f64, step: Option<usize>) -> Result<()> {
        self.metrics.push(MetricRecord {
            key: key.to_string(),
            value,
            step,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Args {
        batch_size: usize,
        train_artifacts_dir: String,
    }

    #[test]
    fn test_params_from_struct() {
        let params = params_from(&Args {
            batch_size: 4,
            train_artifacts_dir: "outputs".to_string(),
        })
        .unwrap();

        assert_eq!(params["batch_size"], json!(4));
        assert_eq!(params["train_artifacts_dir"], json!("outputs"));
    }

    #[test]
    fn test_params_from_rejects_non_object() {
        assert!(params_from(&42).is_err());
    }

    #[test]
    fn test_format_params_sorted() {
        let mut params = Map::new();
        params.insert("zeta".to_string(), json!(1));
        params.insert("alpha".to_string(), json!("outputs"));

        assert_eq!(format_params(&params), "alpha: outputs\nzeta: 1");
    }

    #[test]
    fn test_in_memory_tracker() {
        let mut tracker = InMemoryTracker::new();
        tracker.log_metric("Training Loss", 2.3, Some(1999)).unwrap();
        tracker.log_metric("test_accuracy", 0.5, None).unwrap();
        tracker.log_metric("Training Loss", 2.1, Some(3999)).unwrap();

        let losses = tracker.metric("Training Loss");
        assert_eq!(losses.len(), 2);
        assert_eq!(losses[1].step, Some(3999));
        assert_eq!(tracker.metric("test_accuracy")[0].value, 0.5);
    }

    #[test]
    fn test_noop_tracker_accepts_everything() {
        let mut tracker = NoopTracker;
        assert!(tracker.log_params(&Map::new()).is_ok());
        assert!(tracker.log_metric("x", 1.0, None).is_ok());
        assert_eq!(tracker.run_id(), "untracked");
    }
}
