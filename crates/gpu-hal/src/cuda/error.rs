use thiserror::Error;

use vpp_common::GpuError;

#[derive(Error, Debug)]
pub enum CudaError {
    #[error("CUDA driver: {0}")]
    Driver(#[from] cudarc::driver::DriverError),

    #[error("cannot open CUDA device {ordinal}: {reason}")]
    DeviceInit { ordinal: usize, reason: String },

    #[error("no CUDA device present")]
    NoDevices,

    #[error("CUDA device {ordinal} does not exist ({count} present)")]
    InvalidOrdinal { ordinal: usize, count: i32 },

    #[error("querying {attribute}: {reason}")]
    AttributeQuery { attribute: &'static str, reason: String },

    #[error("PTX module {name}: {reason}")]
    ModuleLoadFailed { name: String, reason: String },

    /// The module loaded but lacks the entry point.
    #[error("{module} has no kernel '{func}'")]
    KernelNotFound { module: String, func: String },

    #[error("CUDA stream: {reason}")]
    Stream { reason: String },

    #[error("launching {kernel}: {reason}")]
    KernelLaunchFailed { kernel: String, reason: String },
}

impl From<CudaError> for GpuError {
    fn from(err: CudaError) -> Self {
        match err {
            CudaError::NoDevices => GpuError::NoBackend,
            CudaError::DeviceInit { .. } | CudaError::InvalidOrdinal { .. } => {
                GpuError::DeviceInit(err.to_string())
            }
            CudaError::Driver(e) => GpuError::DeviceInit(e.to_string()),
            CudaError::AttributeQuery { attribute, reason } => {
                GpuError::CapabilityQuery(format!("{attribute}: {reason}"))
            }
            CudaError::Stream { reason } => GpuError::Stream(reason),
            CudaError::ModuleLoadFailed { name, reason } => GpuError::KernelFailed {
                kernel: name,
                reason,
            },
            CudaError::KernelNotFound { module, func } => GpuError::KernelFailed {
                kernel: func,
                reason: format!("missing from {module}"),
            },
            CudaError::KernelLaunchFailed { kernel, reason } => {
                GpuError::KernelFailed { kernel, reason }
            }
        }
    }
}
