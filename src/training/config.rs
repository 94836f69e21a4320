use std::path::Path;

use burn::config::Config;

use crate::model::NetConfig;
use crate::utils::error::CifarError;

/// File name the training configuration is saved under
pub const CONFIG_FILE: &str = "config.json";

/// Hyperparameters for a training run
#[derive(Config, Debug)]
pub struct TrainingConfig {
    pub model: NetConfig,

    #[config(default = 2)]
    pub num_epochs: usize,

    #[config(default = 4)]
    pub batch_size: usize,

    #[config(default = 1.0e-3)]
    pub learning_rate: f64,

    #[config(default = 0.9)]
    pub momentum: f64,

    /// Batches per running-loss window
    #[config(default = 2000)]
    pub log_interval: usize,

    #[config(default = 2)]
    pub num_workers: usize,

    #[config(default = 42)]
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(NetConfig::default())
    }
}

impl TrainingConfig {
    /// Read a config previously written by a training run
    pub fn load_from(path: &Path) -> crate::utils::error::Result<Self> {
        if !path.exists() {
            return Err(CifarError::PathNotFound(path.to_path_buf()));
        }
        Self::load(path).map_err(|e| {
            CifarError::Config(format!("Failed to parse {}: {:?}", path.display(), e))
        })
    }
}
