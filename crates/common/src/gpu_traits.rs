//! GPU backend abstraction traits.
//!
//! The processor programs against [`VppBackend`], never against a concrete
//! backend. Implementations live in `vpp-gpu-hal` (CUDA and host emulation).

use crate::error::GpuError;
use crate::kernel::{KernelArgs, KernelId};

/// Core GPU backend abstraction.
pub trait VppBackend: Send + Sync {
    // -- Device info --

    /// Human-readable GPU device name.
    fn device_name(&self) -> &str;

    /// Query launch limits of the device.
    fn capabilities(&self) -> Result<DeviceCapabilities, GpuError>;

    // -- Streams --

    /// Create a new execution stream.
    fn create_stream(&self) -> Result<GpuStream, GpuError>;

    /// Wait for all operations on stream to complete.
    ///
    /// A failure of asynchronously executed work is reported here.
    fn synchronize(&self, stream: &GpuStream) -> Result<(), GpuError>;

    /// Release a stream. Pending work is not waited for; synchronize first.
    fn destroy_stream(&self, stream: GpuStream) -> Result<(), GpuError>;

    // -- Kernel dispatch --

    /// Enqueue a compute kernel. Returns once the launch is submitted.
    fn dispatch_kernel(
        &self,
        kernel: &KernelId,
        grid: [u32; 3],
        block: [u32; 3],
        args: &KernelArgs,
        stream: &GpuStream,
    ) -> Result<(), GpuError>;

    // -- Memory transfers --

    /// Blocking copy of `dst.len()` bytes from device address `src` to host memory.
    ///
    /// Not ordered against any stream: the caller makes sure the producing
    /// work has completed.
    fn copy_to_host(&self, src: u64, dst: &mut [u8]) -> Result<(), GpuError>;
}

/// Launch limits reported by the device, queried once at initialization.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceCapabilities {
    pub max_threads_per_block: u32,
    pub multiprocessor_count: u32,
    pub compute_capability: Option<(u32, u32)>, // CUDA only
}

/// Opaque GPU stream handle.
#[derive(Debug, PartialEq, Eq)]
pub struct GpuStream {
    /// Backend-specific handle.
    pub handle: u64,
    pub backend_id: u32,
}
