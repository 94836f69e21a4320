//! Checkpoint persistence
//!
//! The whole parameter mapping is written as one named-MessagePack record.
//! Bytes go through `fs` directly so the file keeps its exact name; Burn's
//! file recorders would swap in their own extension.

use std::fs;
use std::path::Path;

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder};
use burn::tensor::backend::Backend;
use tracing::debug;

use crate::model::{Net, NetConfig, NetRecord, ParamShape};
use crate::utils::error::{CifarError, Result};

/// File name of the trained weights inside the artifacts directory
pub const CHECKPOINT_FILE: &str = "cifar_net.pth";

fn recorder() -> NamedMpkBytesRecorder<FullPrecisionSettings> {
    NamedMpkBytesRecorder::<FullPrecisionSettings>::new()
}

/// Serialize every parameter of `model` to `path`
pub fn save_checkpoint<B: Backend>(model: &Net<B>, path: &Path) -> Result<()> {
    let bytes = Recorder::<B>::record(&recorder(), model.clone().into_record(), ())
        .map_err(|e| CifarError::Checkpoint(format!("Failed to record model: {:?}", e)))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &bytes)?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Rebuild a network from `config` and load the weights at `path`
///
/// Fails with [`CifarError::ShapeMismatch`] when any stored tensor does not
/// have the shape `config` implies.
pub fn load_checkpoint<B: Backend>(
    path: &Path,
    config: &NetConfig,
    device: &B::Device,
) -> Result<Net<B>> {
    if !path.exists() {
        return Err(CifarError::PathNotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path)?;
    let record: NetRecord<B> = Recorder::<B>::load(&recorder(), bytes, device)
        .map_err(|e| CifarError::Checkpoint(format!("Failed to load {}: {:?}", path.display(), e)))?;

    verify_shapes(&Net::<B>::record_shapes(&record), &config.expected_shapes())?;

    Ok(config.init::<B>(device).load_record(record))
}

/// Compare stored parameter shapes against the expected listing
pub fn verify_shapes(found: &[ParamShape], expected: &[ParamShape]) -> Result<()> {
    for want in expected {
        let got = found.iter().find(|p| p.name == want.name);
        match got {
            Some(got) if got.dims == want.dims => {}
            Some(got) => {
                return Err(CifarError::ShapeMismatch {
                    name: want.name.clone(),
                    expected: want.dims.clone(),
                    found: got.dims.clone(),
                })
            }
            None => {
                return Err(CifarError::ShapeMismatch {
                    name: want.name.clone(),
                    expected: want.dims.clone(),
                    found: Vec::new(),
                })
            }
        }
    }
    Ok(())
}
