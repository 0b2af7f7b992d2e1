//! Device selection and launch-limit queries.

use std::sync::Arc;

use cudarc::driver::safe::CudaContext;
use cudarc::driver::sys::{self, CUdevice_attribute_enum as Attr};
use tracing::info;

use vpp_common::gpu_traits::DeviceCapabilities;

use super::error::CudaError;

/// What we learned about the device when the context was opened.
#[derive(Clone, Debug)]
pub struct CudaDeviceInfo {
    pub ordinal: usize,
    pub name: String,
    pub compute_capability: (u32, u32),
    /// Raw driver version, `major * 1000 + minor * 10`.
    pub driver_version: i32,
}

impl CudaDeviceInfo {
    /// Driver version as `major.minor`.
    pub fn driver_version_string(&self) -> String {
        let (major, minor) = (self.driver_version / 1000, self.driver_version % 1000 / 10);
        format!("{major}.{minor}")
    }
}

/// A primary context on one device.
#[derive(Debug)]
pub struct CudaDevice {
    ctx: Arc<CudaContext>,
    info: CudaDeviceInfo,
}

impl CudaDevice {
    pub fn open(ordinal: usize) -> Result<Self, CudaError> {
        let init_error = |reason: String| CudaError::DeviceInit { ordinal, reason };

        let count = CudaContext::device_count()
            .map_err(|e| init_error(format!("device count: {e}")))?;
        match count {
            0 => return Err(CudaError::NoDevices),
            n if ordinal >= n as usize => {
                return Err(CudaError::InvalidOrdinal { ordinal, count: n })
            }
            _ => {}
        }

        let ctx = CudaContext::new(ordinal).map_err(|e| init_error(e.to_string()))?;
        let name = ctx
            .name()
            .map_err(|e| init_error(format!("device name: {e}")))?;
        let major = attribute(&ctx, Attr::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MAJOR, "cc major")?;
        let minor = attribute(&ctx, Attr::CU_DEVICE_ATTRIBUTE_COMPUTE_CAPABILITY_MINOR, "cc minor")?;

        let mut driver_version = 0i32;
        // SAFETY: cuInit already ran inside CudaContext::new; the pointer is
        // to a live local.
        unsafe { sys::cuDriverGetVersion(&mut driver_version) }.result()?;

        let info = CudaDeviceInfo {
            ordinal,
            name,
            compute_capability: (major as u32, minor as u32),
            driver_version,
        };
        info!(
            device = %info.name,
            ordinal,
            cc = %format!("{major}.{minor}"),
            driver = %info.driver_version_string(),
            "Opened CUDA device"
        );
        Ok(Self { ctx, info })
    }

    pub fn context(&self) -> &Arc<CudaContext> {
        &self.ctx
    }

    pub fn info(&self) -> &CudaDeviceInfo {
        &self.info
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    /// Launch limits, queried fresh on every call.
    pub fn capabilities(&self) -> Result<DeviceCapabilities, CudaError> {
        let max_threads = attribute(
            &self.ctx,
            Attr::CU_DEVICE_ATTRIBUTE_MAX_THREADS_PER_BLOCK,
            "max threads per block",
        )?;
        if max_threads <= 0 {
            return Err(CudaError::AttributeQuery {
                attribute: "max threads per block",
                reason: format!("device reported {max_threads}"),
            });
        }
        let sms = attribute(
            &self.ctx,
            Attr::CU_DEVICE_ATTRIBUTE_MULTIPROCESSOR_COUNT,
            "multiprocessor count",
        )?;
        Ok(DeviceCapabilities {
            max_threads_per_block: max_threads as u32,
            multiprocessor_count: sms.max(0) as u32,
            compute_capability: Some(self.info.compute_capability),
        })
    }
}

fn attribute(ctx: &CudaContext, attr: Attr, label: &'static str) -> Result<i32, CudaError> {
    ctx.attribute(attr).map_err(|e| CudaError::AttributeQuery {
        attribute: label,
        reason: e.to_string(),
    })
}
