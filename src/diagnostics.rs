//! Hardware and backend availability report
//!
//! Stateless checks: nothing here touches the model or the dataset.

use colored::Colorize;
use serde::Serialize;

use crate::backend::{self, BackendKind};

/// What compute is available to this binary
#[derive(Debug, Clone, Serialize)]
pub struct BackendReport {
    pub cuda_compiled: bool,
    pub cuda_device_count: usize,
    pub cuda_device_names: Vec<String>,
    pub cuda_version: Option<String>,
    pub ndarray_available: bool,
    pub cpu_count: usize,
    pub selected_backend: String,
}

impl BackendReport {
    /// Inspect the current machine
    pub fn detect() -> Self {
        let cuda_device_names = cuda_device_names();

        Self {
            cuda_compiled: backend::cuda_compiled(),
            cuda_device_count: cuda_device_names.len(),
            cuda_device_names,
            cuda_version: cuda_version(),
            ndarray_available: true,
            cpu_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            selected_backend: BackendKind::select().name().to_string(),
        }
    }

    /// One `name: value` line per check
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("cuda compiled: {}", self.cuda_compiled),
            format!("cuda device count: {}", self.cuda_device_count),
            format!(
                "cuda devices: {}",
                if self.cuda_device_names.is_empty() {
                    "none".to_string()
                } else {
                    self.cuda_device_names.join(", ")
                }
            ),
            format!(
                "cuda version: {}",
                self.cuda_version.as_deref().unwrap_or("unknown")
            ),
            format!("ndarray available: {}", self.ndarray_available),
            format!("cpu count: {}", self.cpu_count),
            format!("selected backend: {}", self.selected_backend),
        ]
    }

    pub fn print(&self) {
        println!("{}", "Backend diagnostics".cyan().bold());
        for line in self.lines() {
            println!("  {}", line);
        }
    }
}

/// Split `nvidia-smi --query-gpu=name --format=csv,noheader` output into names
pub fn parse_gpu_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pull the version out of `nvcc --version` output
pub fn parse_nvcc_version(stdout: &str) -> Option<String> {
    let line = stdout.lines().find(|l| l.contains("release"))?;
    let version = line.split("release").nth(1)?.split(',').next()?.trim();
    (!version.is_empty()).then(|| version.to_string())
}

/// Names of visible NVIDIA devices; empty if the driver tool is missing
pub fn cuda_device_names() -> Vec<String> {
    match std::process::Command::new("nvidia-smi")
        .args(["--query-gpu=name", "--format=csv,noheader"])
        .output()
    {
        Ok(output) if output.status.success() => {
            parse_gpu_list(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            tracing::debug!("nvidia-smi exited with {}", output.status);
            Vec::new()
        }
        Err(e) => {
            tracing::debug!("nvidia-smi not available: {}", e);
            Vec::new()
        }
    }
}

pub fn cuda_device_count() -> usize {
    cuda_device_names().len()
}

fn cuda_version() -> Option<String> {
    let output = std::process::Command::new("nvcc")
        .args(["--version"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_nvcc_version(&String::from_utf8_lossy(&output.stdout))
}
