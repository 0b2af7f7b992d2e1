//! Runtime GPU backend selection.

use std::sync::Arc;

use tracing::{info, warn};

use vpp_common::config::{BackendPreference, VppConfig};
use vpp_common::error::GpuError;
use vpp_common::gpu_traits::VppBackend;

use crate::host::HostBackend;

pub fn describe_preference(pref: BackendPreference) -> &'static str {
    match pref {
        BackendPreference::Auto => "Auto (CUDA preferred, host emulation fallback)",
        BackendPreference::Cuda => "Force CUDA (NVIDIA only)",
        BackendPreference::Host => "Force host emulation",
    }
}

/// Create the backend requested by `config`.
///
/// `Auto` falls back to host emulation when CUDA is not compiled in or no
/// device can be opened. `Cuda` reports the failure instead.
pub fn create_backend(config: &VppConfig) -> Result<Arc<dyn VppBackend>, GpuError> {
    info!(
        preference = describe_preference(config.backend),
        "Selecting GPU backend"
    );
    match config.backend {
        BackendPreference::Host => Ok(Arc::new(HostBackend::new())),
        BackendPreference::Cuda => create_cuda(config.device_ordinal),
        BackendPreference::Auto => match create_cuda(config.device_ordinal) {
            Ok(backend) => Ok(backend),
            Err(e) => {
                warn!(error = %e, "CUDA unavailable, using host emulation");
                Ok(Arc::new(HostBackend::new()))
            }
        },
    }
}

#[cfg(feature = "cuda")]
fn create_cuda(ordinal: usize) -> Result<Arc<dyn VppBackend>, GpuError> {
    let backend = crate::cuda::CudaBackend::new(ordinal).map_err(GpuError::from)?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "cuda"))]
fn create_cuda(_ordinal: usize) -> Result<Arc<dyn VppBackend>, GpuError> {
    Err(GpuError::NoBackend)
}
