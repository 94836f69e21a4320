//! Prediction table (`preds.csv`)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::utils::error::Result;

/// File name of the prediction table inside the predictions directory
pub const PREDICTIONS_FILE: &str = "preds.csv";

/// One row: ground truth and predicted class for a test sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub label: usize,
    pub prediction: usize,
}

impl PredictionRecord {
    pub fn is_correct(&self) -> bool {
        self.label == self.prediction
    }
}

/// Write rows in order under a `label,prediction` header
pub fn write_predictions(path: &Path, records: &[PredictionRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    if records.is_empty() {
        writer.write_record(["label", "prediction"])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_predictions(path: &Path) -> Result<Vec<PredictionRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader
        .deserialize()
        .collect::<std::result::Result<Vec<PredictionRecord>, _>>()?;
    Ok(records)
}
