//! PTX module cache and kernel launch.
//!
//! Each `.cu` file becomes one PTX image embedded by `build.rs`, keyed by
//! `KernelId::module_stem()`. A module is loaded the first time one of its
//! kernels is needed. Resolved `CUfunction`s are cached per `KernelId` and
//! stay valid for the manager's lifetime because modules only unload on drop.
//!
//! Loading and launching use the raw driver API: cudarc's safe wrappers
//! cannot take a positional `KernelArgs` list.

use std::collections::HashMap;
use std::ffi::{c_void, CString};
use std::mem::MaybeUninit;
use std::sync::Arc;

use cudarc::driver::safe::CudaContext;
use cudarc::driver::sys;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use vpp_common::kernel::{KernelArg, KernelArgs, KernelId};

use super::error::CudaError;

/// A loaded `CUmodule`, unloaded on drop.
#[derive(Debug)]
struct LoadedModule {
    handle: sys::CUmodule,
    ctx: Arc<CudaContext>,
}

impl Drop for LoadedModule {
    fn drop(&mut self) {
        let _ = self.ctx.bind_to_thread();
        // SAFETY: `handle` came from cuModuleLoadData in the context we hold.
        let _ = unsafe { sys::cuModuleUnload(self.handle) };
    }
}

// SAFETY: module handles are driver handles usable from any thread with the
// owning context bound, and every use binds it first.
unsafe impl Send for LoadedModule {}
unsafe impl Sync for LoadedModule {}

#[derive(Debug, Clone, Copy)]
struct Function(sys::CUfunction);

// SAFETY: valid while its module is loaded, which outlives the cache.
unsafe impl Send for Function {}
unsafe impl Sync for Function {}

/// Loads the VPP modules on demand and launches their kernels.
#[derive(Debug)]
pub struct KernelManager {
    ctx: Arc<CudaContext>,
    modules: RwLock<HashMap<&'static str, Arc<LoadedModule>>>,
    functions: RwLock<HashMap<KernelId, Function>>,
}

impl KernelManager {
    pub fn new(ctx: Arc<CudaContext>) -> Self {
        Self {
            ctx,
            modules: RwLock::new(HashMap::new()),
            functions: RwLock::new(HashMap::new()),
        }
    }

    /// Load a PTX image under `stem`. If a module is already registered
    /// under that stem it wins, so handles resolved from it remain valid.
    pub fn load_module(&self, stem: &'static str, ptx: &[u8]) -> Result<(), CudaError> {
        let load_error = |reason: String| CudaError::ModuleLoadFailed {
            name: stem.to_string(),
            reason,
        };

        let text = ptx.strip_suffix(&[0]).unwrap_or(ptx);
        let image = CString::new(text)
            .map_err(|_| load_error("PTX image contains an interior NUL byte".into()))?;

        self.ctx
            .bind_to_thread()
            .map_err(|e| load_error(format!("context bind failed: {e}")))?;

        let mut slot = MaybeUninit::uninit();
        // SAFETY: `image` is NUL-terminated PTX and the context is bound.
        // The driver initializes `slot` whenever it reports success.
        let handle = unsafe {
            sys::cuModuleLoadData(slot.as_mut_ptr(), image.as_ptr() as *const c_void)
                .result()
                .map_err(|e| load_error(format!("cuModuleLoadData: {e}")))?;
            slot.assume_init()
        };

        let module = Arc::new(LoadedModule {
            handle,
            ctx: Arc::clone(&self.ctx),
        });
        self.modules.write().entry(stem).or_insert(module);
        info!(module = stem, bytes = ptx.len(), "Loaded PTX module");
        Ok(())
    }

    /// Resolve every VPP kernel, loading modules as needed. Failures are
    /// logged. Returns how many kernels are ready to launch.
    pub fn preload_all(&self) -> usize {
        let ready = KernelId::ALL
            .iter()
            .filter(|kernel| match self.function(kernel) {
                Ok(_) => true,
                Err(e) => {
                    warn!(kernel = kernel.entry_point(), error = %e, "Kernel unavailable");
                    false
                }
            })
            .count();
        info!(ready, total = KernelId::ALL.len(), "Preloaded VPP kernels");
        ready
    }

    pub fn loaded_modules(&self) -> usize {
        self.modules.read().len()
    }

    pub fn is_resolved(&self, kernel: &KernelId) -> bool {
        self.functions.read().contains_key(kernel)
    }

    fn module_for(&self, kernel: &KernelId) -> Result<Arc<LoadedModule>, CudaError> {
        let stem = kernel.module_stem();
        if let Some(module) = self.modules.read().get(stem) {
            return Ok(Arc::clone(module));
        }

        let missing = |reason: &str| CudaError::ModuleLoadFailed {
            name: kernel.cuda_module_name(),
            reason: reason.to_string(),
        };
        let ptx = crate::kernels::get_ptx(stem)
            .ok_or_else(|| missing("PTX was not embedded at build time"))?;
        self.load_module(stem, ptx)?;
        self.modules
            .read()
            .get(stem)
            .cloned()
            .ok_or_else(|| missing("module missing after load"))
    }

    fn function(&self, kernel: &KernelId) -> Result<sys::CUfunction, CudaError> {
        if let Some(function) = self.functions.read().get(kernel) {
            return Ok(function.0);
        }

        let module = self.module_for(kernel)?;
        let entry = kernel.entry_point();
        let not_found = || CudaError::KernelNotFound {
            module: kernel.cuda_module_name(),
            func: entry.to_string(),
        };
        let name = CString::new(entry).map_err(|_| not_found())?;
        self.ctx.bind_to_thread().map_err(|_| not_found())?;

        let mut slot = MaybeUninit::uninit();
        // SAFETY: `module.handle` is loaded, `name` is NUL-terminated and
        // the context is bound.
        let function = unsafe {
            sys::cuModuleGetFunction(slot.as_mut_ptr(), module.handle, name.as_ptr())
                .result()
                .map_err(|_| not_found())?;
            slot.assume_init()
        };

        self.functions.write().insert(*kernel, Function(function));
        debug!(kernel = entry, "Resolved CUDA kernel");
        Ok(function)
    }

    /// Enqueue `kernel` on `stream`.
    ///
    /// # Safety
    ///
    /// `stream` must be a live stream of this context and `args` must match
    /// the kernel signature. Every device pointer in `args` must stay valid
    /// until the stream has executed the launch.
    pub unsafe fn launch(
        &self,
        kernel: &KernelId,
        grid: [u32; 3],
        block: [u32; 3],
        args: &KernelArgs,
        stream: sys::CUstream,
    ) -> Result<(), CudaError> {
        let function = self.function(kernel)?;
        let launch_error = |reason: String| CudaError::KernelLaunchFailed {
            kernel: kernel.entry_point().to_string(),
            reason,
        };

        let mut values = LaunchArgs::new(args);
        let mut params = values.param_ptrs();

        self.ctx
            .bind_to_thread()
            .map_err(|e| launch_error(format!("context bind failed: {e}")))?;

        // SAFETY: `function` comes from a loaded module and `params` points
        // into `values`, which outlives the call. The caller vouches for
        // `stream` and the argument contents.
        unsafe {
            sys::cuLaunchKernel(
                function,
                grid[0],
                grid[1],
                grid[2],
                block[0],
                block[1],
                block[2],
                0,
                stream,
                params.as_mut_ptr(),
                std::ptr::null_mut(),
            )
            .result()
            .map_err(|e| launch_error(e.to_string()))
        }
    }
}

/// Owned argument values in parameter order.
///
/// `cuLaunchKernel` wants one pointer per parameter, each to a value of the
/// parameter's exact type, all valid for the duration of the call.
#[derive(Debug)]
struct LaunchArgs {
    values: Vec<KernelArg>,
}

impl LaunchArgs {
    fn new(args: &KernelArgs) -> Self {
        Self {
            values: args.entries().to_vec(),
        }
    }

    fn param_ptrs(&mut self) -> Vec<*mut c_void> {
        self.values
            .iter_mut()
            .map(|value| match value {
                KernelArg::DevicePtr(ptr) => ptr as *mut u64 as *mut c_void,
                KernelArg::U32(v) => v as *mut u32 as *mut c_void,
                KernelArg::I32(v) => v as *mut i32 as *mut c_void,
            })
            .collect()
    }
}
