//! CUDA implementation of `VppBackend` on top of cudarc.
//!
//! Device setup and attribute queries live in [`context`], PTX loading and
//! launches in [`kernel`], stream wrappers in [`stream`]. Opaque `GpuStream`
//! handles map to [`stream::ManagedStream`]s through a registry here.

pub mod context;
pub mod error;
pub mod kernel;
pub mod stream;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use self::context::CudaDevice;
use self::error::CudaError;
use self::kernel::KernelManager;
use self::stream::ManagedStream;

use vpp_common::error::GpuError;
use vpp_common::gpu_traits::{DeviceCapabilities, GpuStream, VppBackend};
use vpp_common::kernel::{KernelArgs, KernelId};

pub use self::context::CudaDeviceInfo;
pub use self::error::CudaError as Error;

/// Backend identifier stored in CUDA-owned `GpuStream` handles.
const CUDA_BACKEND_ID: u32 = 1;

/// The CUDA GPU backend.
///
/// `CudaBackend` is `Send + Sync`. cudarc binds the context to whichever
/// thread issues a call; each consumer gets its own non-blocking stream so
/// launches from different threads do not serialize.
#[derive(Debug)]
pub struct CudaBackend {
    device: CudaDevice,
    kernels: KernelManager,
    streams: RwLock<HashMap<u64, Arc<ManagedStream>>>,
}

impl CudaBackend {
    /// Initialize the CUDA backend on the given device ordinal.
    pub fn new(ordinal: usize) -> Result<Self, CudaError> {
        let device = CudaDevice::open(ordinal)?;
        let kernels = KernelManager::new(Arc::clone(device.context()));
        let ready = kernels.preload_all();
        info!(device = device.name(), kernels = ready, "CUDA backend ready");

        Ok(Self {
            device,
            kernels,
            streams: RwLock::new(HashMap::new()),
        })
    }

    pub fn device_info(&self) -> &CudaDeviceInfo {
        self.device.info()
    }

    pub fn kernels(&self) -> &KernelManager {
        &self.kernels
    }

    fn resolve(&self, stream: &GpuStream) -> Result<Arc<ManagedStream>, GpuError> {
        if stream.backend_id != CUDA_BACKEND_ID {
            return Err(GpuError::UnknownStream(stream.handle));
        }
        self.streams
            .read()
            .get(&stream.handle)
            .cloned()
            .ok_or(GpuError::UnknownStream(stream.handle))
    }
}

impl VppBackend for CudaBackend {
    fn device_name(&self) -> &str {
        self.device.name()
    }

    fn capabilities(&self) -> Result<DeviceCapabilities, GpuError> {
        self.device.capabilities().map_err(GpuError::from)
    }

    fn create_stream(&self) -> Result<GpuStream, GpuError> {
        let managed = ManagedStream::new(self.device.context()).map_err(GpuError::from)?;
        let handle = managed.handle();
        self.streams.write().insert(handle, Arc::new(managed));
        debug!(handle, "Created CUDA stream");
        Ok(GpuStream {
            handle,
            backend_id: CUDA_BACKEND_ID,
        })
    }

    fn synchronize(&self, stream: &GpuStream) -> Result<(), GpuError> {
        self.resolve(stream)?.synchronize().map_err(GpuError::from)
    }

    fn destroy_stream(&self, stream: GpuStream) -> Result<(), GpuError> {
        // Dropping the last Arc destroys the CUstream.
        self.streams
            .write()
            .remove(&stream.handle)
            .ok_or(GpuError::UnknownStream(stream.handle))?;
        debug!(handle = stream.handle, "Destroyed CUDA stream");
        Ok(())
    }

    fn dispatch_kernel(
        &self,
        kernel_id: &KernelId,
        grid: [u32; 3],
        block: [u32; 3],
        args: &KernelArgs,
        stream: &GpuStream,
    ) -> Result<(), GpuError> {
        let managed = self.resolve(stream)?;
        let cu_stream = managed.inner().cu_stream();

        // SAFETY: `cu_stream` belongs to a live registered stream (held by
        // `managed`). Argument layout comes from the params structs in
        // `crate::params`, and device pointers come from caller frames whose
        // contract keeps them valid until the stream drains.
        unsafe {
            self.kernels
                .launch(kernel_id, grid, block, args, cu_stream)
                .map_err(GpuError::from)?;
        }

        debug!(
            kernel = kernel_id.entry_point(),
            grid = ?grid,
            block = ?block,
            args = args.len(),
            "Dispatched CUDA kernel"
        );
        Ok(())
    }

    fn copy_to_host(&self, src: u64, dst: &mut [u8]) -> Result<(), GpuError> {
        self.device
            .context()
            .bind_to_thread()
            .map_err(|e| GpuError::TransferFailed(format!("Failed to bind context: {e}")))?;

        // SAFETY:
        // 1. `src` is a device address from a caller frame covering `dst.len()` bytes.
        // 2. `dst` is a valid, writable host slice.
        // 3. cuMemcpyDtoH is synchronous with respect to the host.
        unsafe {
            let result = cudarc::driver::sys::cuMemcpyDtoH_v2(
                dst.as_mut_ptr() as *mut std::ffi::c_void,
                src,
                dst.len(),
            );
            result
                .result()
                .map_err(|e| GpuError::TransferFailed(format!("cuMemcpyDtoH failed: {e:?}")))?;
        }
        Ok(())
    }
}
