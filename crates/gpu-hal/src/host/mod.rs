//! CPU emulation of the device, used when no GPU backend is available and in tests.
//!
//! Runs the VPP kernels on the CPU with device semantics preserved:
//! per-stream ordered asynchronous execution, launch-limit validation and
//! deferred reporting of execution failures. "Device pointers" are host
//! addresses of caller-owned memory.
//!
//! Used when no CUDA device is available and by the test suites.

pub mod kernels;
pub mod stream;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use vpp_common::color::{chroma_extent, PixelFormat};
use vpp_common::error::GpuError;
use vpp_common::gpu_traits::{DeviceCapabilities, GpuStream, VppBackend};
use vpp_common::kernel::{KernelArgs, KernelId};

use self::kernels::Nv12Planes;
use self::stream::{HostStream, Job};
use crate::params::{is_resize_kernel, ConvertParams, ResizeParams};

/// Backend identifier stored in host-owned `GpuStream` handles.
const HOST_BACKEND_ID: u32 = 2;

/// Default launch limit, matching current CUDA hardware.
pub const DEFAULT_MAX_THREADS_PER_BLOCK: u32 = 1024;

/// CPU implementation of [`VppBackend`].
#[derive(Debug)]
pub struct HostBackend {
    name: String,
    capabilities: DeviceCapabilities,
    streams: RwLock<HashMap<u64, Arc<HostStream>>>,
    next_handle: AtomicU64,
    launches: AtomicU64,
    streams_created: AtomicU64,
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBackend {
    pub fn new() -> Self {
        Self::with_max_threads(DEFAULT_MAX_THREADS_PER_BLOCK)
    }

    /// Emulate a device with a specific threads-per-block limit.
    pub fn with_max_threads(max_threads_per_block: u32) -> Self {
        let capabilities = DeviceCapabilities {
            max_threads_per_block,
            multiprocessor_count: std::thread::available_parallelism()
                .map(|n| n.get() as u32)
                .unwrap_or(1),
            compute_capability: None,
        };
        info!(
            max_threads_per_block,
            "Host emulation backend initialized"
        );
        Self {
            name: "Host emulation".to_string(),
            capabilities,
            streams: RwLock::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            launches: AtomicU64::new(0),
            streams_created: AtomicU64::new(0),
        }
    }

    /// Number of kernels accepted by `dispatch_kernel` so far.
    pub fn launch_count(&self) -> u64 {
        self.launches.load(Ordering::SeqCst)
    }

    /// Number of streams created so far (destroyed ones included).
    pub fn streams_created(&self) -> u64 {
        self.streams_created.load(Ordering::SeqCst)
    }

    /// Number of streams currently alive.
    pub fn live_stream_count(&self) -> usize {
        self.streams.read().len()
    }

    /// Enqueue a host callback on `stream`, ordered with its kernels
    /// (the host counterpart of `cuLaunchHostFunc`).
    ///
    /// An `Err` returned by `f` is reported like a failed kernel: on the
    /// next dispatch to or synchronize of this stream.
    pub fn launch_host_fn<F>(&self, stream: &GpuStream, f: F) -> Result<(), GpuError>
    where
        F: FnOnce() -> Result<(), GpuError> + Send + 'static,
    {
        self.resolve(stream)?.submit(Box::new(f))
    }

    fn resolve(&self, stream: &GpuStream) -> Result<Arc<HostStream>, GpuError> {
        if stream.backend_id != HOST_BACKEND_ID {
            return Err(GpuError::UnknownStream(stream.handle));
        }
        self.streams
            .read()
            .get(&stream.handle)
            .cloned()
            .ok_or(GpuError::UnknownStream(stream.handle))
    }

    fn check_launch(&self, kernel: &KernelId, grid: [u32; 3], block: [u32; 3]) -> Result<(), GpuError> {
        let threads = block.iter().map(|&b| b as u64).product::<u64>();
        let limit = self.capabilities.max_threads_per_block as u64;
        if threads == 0 || grid.contains(&0) {
            return Err(GpuError::KernelFailed {
                kernel: kernel.entry_point().to_string(),
                reason: format!("Empty launch: grid {grid:?}, block {block:?}"),
            });
        }
        if threads > limit {
            return Err(GpuError::KernelFailed {
                kernel: kernel.entry_point().to_string(),
                reason: format!("Block of {threads} threads exceeds device limit of {limit}"),
            });
        }
        Ok(())
    }

    /// Turn a validated launch into a job for the stream worker.
    fn build_job(
        kernel: KernelId,
        grid: [u32; 3],
        block: [u32; 3],
        args: &KernelArgs,
    ) -> Result<Job, GpuError> {
        let invalid = |reason: String| GpuError::KernelFailed {
            kernel: kernel.entry_point().to_string(),
            reason,
        };

        if is_resize_kernel(&kernel) {
            let params = ResizeParams::from_kernel_args(args)
                .ok_or_else(|| invalid("Argument list does not match resize signature".into()))?;
            let src = SrcLayout::new(
                params.src_width,
                params.src_height,
                params.src_y_pitch,
                params.src_uv_pitch,
            )
            .ok_or_else(|| invalid(format!("Invalid source geometry {params:?}")))?;
            let dst = SrcLayout::new(
                params.dst_width,
                params.dst_height,
                params.dst_y_pitch,
                params.dst_uv_pitch,
            )
            .ok_or_else(|| invalid(format!("Invalid destination geometry {params:?}")))?;
            check_ptrs(&[params.src_y, params.src_uv, params.dst_y, params.dst_uv])
                .map_err(invalid)?;

            Ok(Box::new(move || {
                // SAFETY: the caller of `Frame::from_raw_parts` guaranteed that
                // these addresses cover the computed lengths, stay alive until
                // the stream drains and that source and destination are disjoint.
                let (y, uv, dy, duv) = unsafe {
                    (
                        std::slice::from_raw_parts(params.src_y as *const u8, src.y_len),
                        std::slice::from_raw_parts(params.src_uv as *const u8, src.uv_len),
                        std::slice::from_raw_parts_mut(params.dst_y as *mut u8, dst.y_len),
                        std::slice::from_raw_parts_mut(params.dst_uv as *mut u8, dst.uv_len),
                    )
                };
                kernels::run_resize(kernel, &params, grid, block, src.planes(y, uv), dy, duv);
                Ok(())
            }))
        } else {
            let params = ConvertParams::from_kernel_args(args)
                .ok_or_else(|| invalid("Argument list does not match conversion signature".into()))?;
            let src = SrcLayout::new(
                params.src_width,
                params.src_height,
                params.y_pitch,
                params.uv_pitch,
            )
            .ok_or_else(|| invalid(format!("Invalid source geometry {params:?}")))?;
            let out_format = match kernel {
                KernelId::Nv12ToY800 => PixelFormat::Y800,
                KernelId::Nv12ToBgr24 => PixelFormat::Bgr24,
                _ => PixelFormat::Rgb24,
            };
            let dst_len = packed_len(out_format, params.dst_width, params.dst_height, params.dst_pitch)
                .ok_or_else(|| invalid(format!("Invalid destination geometry {params:?}")))?;
            check_ptrs(&[params.y_plane, params.uv_plane, params.dst]).map_err(invalid)?;

            Ok(Box::new(move || {
                // SAFETY: see the resize case above.
                let (y, uv, dst) = unsafe {
                    (
                        std::slice::from_raw_parts(params.y_plane as *const u8, src.y_len),
                        std::slice::from_raw_parts(params.uv_plane as *const u8, src.uv_len),
                        std::slice::from_raw_parts_mut(params.dst as *mut u8, dst_len),
                    )
                };
                kernels::run_convert(kernel, &params, grid, block, src.planes(y, uv), dst);
                Ok(())
            }))
        }
    }
}

/// Validated NV12 geometry with the byte extent of each plane.
#[derive(Copy, Clone, Debug)]
struct SrcLayout {
    width: u32,
    height: u32,
    y_pitch: usize,
    uv_pitch: usize,
    y_len: usize,
    uv_len: usize,
}

impl SrcLayout {
    fn new(width: i32, height: i32, y_pitch: i32, uv_pitch: i32) -> Option<Self> {
        if width <= 0 || height <= 0 || y_pitch <= 0 || uv_pitch <= 0 {
            return None;
        }
        let (w, h) = (width as u32, height as u32);
        let (y_pitch, uv_pitch) = (y_pitch as usize, uv_pitch as usize);
        if y_pitch < w as usize || uv_pitch < chroma_extent(w) as usize * 2 {
            return None;
        }
        Some(Self {
            width: w,
            height: h,
            y_pitch,
            uv_pitch,
            y_len: PixelFormat::Nv12.min_plane_len(0, w, h, y_pitch)?,
            uv_len: PixelFormat::Nv12.min_plane_len(1, w, h, uv_pitch)?,
        })
    }

    fn planes<'a>(&self, y: &'a [u8], uv: &'a [u8]) -> Nv12Planes<'a> {
        Nv12Planes {
            y,
            uv,
            width: self.width,
            height: self.height,
            y_pitch: self.y_pitch,
            uv_pitch: self.uv_pitch,
        }
    }
}

fn packed_len(format: PixelFormat, width: i32, height: i32, pitch: i32) -> Option<usize> {
    if width <= 0 || height <= 0 || pitch <= 0 {
        return None;
    }
    let (w, h, pitch) = (width as u32, height as u32, pitch as usize);
    if pitch < format.row_bytes(0, w)? {
        return None;
    }
    format.min_plane_len(0, w, h, pitch)
}

fn check_ptrs(ptrs: &[u64]) -> Result<(), String> {
    match ptrs.iter().position(|&p| p == 0) {
        Some(index) => Err(format!("Argument {index} is a null device pointer")),
        None => Ok(()),
    }
}

impl VppBackend for HostBackend {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Result<DeviceCapabilities, GpuError> {
        Ok(self.capabilities)
    }

    fn create_stream(&self) -> Result<GpuStream, GpuError> {
        let handle = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let stream = HostStream::new(handle)?;
        self.streams.write().insert(handle, Arc::new(stream));
        self.streams_created.fetch_add(1, Ordering::SeqCst);
        Ok(GpuStream {
            handle,
            backend_id: HOST_BACKEND_ID,
        })
    }

    fn synchronize(&self, stream: &GpuStream) -> Result<(), GpuError> {
        self.resolve(stream)?.synchronize()
    }

    fn destroy_stream(&self, stream: GpuStream) -> Result<(), GpuError> {
        let removed = self
            .streams
            .write()
            .remove(&stream.handle)
            .ok_or(GpuError::UnknownStream(stream.handle))?;
        removed.shutdown();
        debug!(stream = stream.handle, "Destroyed host stream");
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
        let target = self.resolve(stream)?;
        self.check_launch(kernel_id, grid, block)?;
        let job = Self::build_job(*kernel_id, grid, block, args)?;
        target.submit(job)?;
        self.launches.fetch_add(1, Ordering::SeqCst);

        debug!(
            kernel = kernel_id.entry_point(),
            grid = ?grid,
            block = ?block,
            args = args.len(),
            stream = stream.handle,
            "Dispatched host kernel"
        );
        Ok(())
    }

    fn copy_to_host(&self, src: u64, dst: &mut [u8]) -> Result<(), GpuError> {
        if src == 0 {
            return Err(GpuError::TransferFailed("Null source address".to_string()));
        }
        // SAFETY: `src` comes from a caller-constructed `Frame` plane whose
        // contract covers `dst.len()` readable bytes.
        unsafe {
            std::ptr::copy_nonoverlapping(src as *const u8, dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }
}
