//! Backend abstraction - Multi-backend support
//!
//! NdArray (CPU) is always compiled in. CUDA (GPU) is available behind the
//! `cuda` feature and is preferred at runtime when a device is visible.

use burn::backend::Autodiff;

/// CPU backend, always available
pub type CpuBackend = burn_ndarray::NdArray;

/// Autodiff wrapper over the CPU backend for training
pub type CpuTrainingBackend = Autodiff<CpuBackend>;

#[cfg(feature = "cuda")]
pub type GpuBackend = burn_cuda::Cuda;

#[cfg(feature = "cuda")]
pub type GpuTrainingBackend = Autodiff<GpuBackend>;

/// Compute backend chosen for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    #[cfg(feature = "cuda")]
    Cuda,
    NdArray,
}

impl BackendKind {
    /// Prefer CUDA when compiled in and a device is visible, else CPU
    pub fn select() -> Self {
        #[cfg(feature = "cuda")]
        {
            if crate::diagnostics::cuda_device_count() > 0 {
                return BackendKind::Cuda;
            }
            tracing::warn!("CUDA support compiled in but no device found, using CPU");
        }

        BackendKind::NdArray
    }

    /// Human-readable backend name
    pub fn name(&self) -> &'static str {
        match self {
            #[cfg(feature = "cuda")]
            BackendKind::Cuda => "CUDA (GPU)",
            BackendKind::NdArray => "NdArray (CPU)",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether the binary was built with GPU support
pub fn cuda_compiled() -> bool {
    cfg!(feature = "cuda")
}
