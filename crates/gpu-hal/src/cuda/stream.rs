//! One cudarc stream per consumer.

use std::sync::Arc;

use cudarc::driver::safe::{CudaContext, CudaStream};

use super::error::CudaError;

/// Owns a non-blocking stream; cudarc destroys it when the last `Arc` drops.
#[derive(Debug)]
pub struct ManagedStream {
    inner: Arc<CudaStream>,
}

impl ManagedStream {
    pub fn new(ctx: &Arc<CudaContext>) -> Result<Self, CudaError> {
        let inner = ctx.new_stream().map_err(|e| CudaError::Stream {
            reason: format!("create on device {}: {e}", ctx.ordinal()),
        })?;
        Ok(Self { inner })
    }

    /// Wait for queued work. Faults from kernels that already ran
    /// asynchronously are reported here.
    pub fn synchronize(&self) -> Result<(), CudaError> {
        self.inner.synchronize().map_err(|e| CudaError::Stream {
            reason: format!("synchronize stream {:#x}: {e}", self.handle()),
        })
    }

    pub fn inner(&self) -> &Arc<CudaStream> {
        &self.inner
    }

    /// Raw `CUstream` value, used as the opaque `GpuStream` handle.
    pub fn handle(&self) -> u64 {
        self.inner.cu_stream() as u64
    }
}
