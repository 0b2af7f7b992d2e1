//! Central error types (thiserror-based).

use thiserror::Error;

use crate::color::PixelFormat;

/// Errors returned by the video processor's public operations.
#[derive(Error, Debug)]
pub enum VppError {
    /// Operation attempted while the processor is uninitialized or closed.
    #[error("Video processor is not open")]
    NotOpen,

    /// Device capability query failed during initialization.
    #[error("Device capability query failed: {0}")]
    DeviceQueryFailure(#[source] GpuError),

    /// Output frame layout does not match the conversion target.
    #[error("Output frame does not match target: {reason}")]
    DimensionMismatch { reason: String },

    /// No kernel exists for the requested format pair.
    #[error("Unsupported conversion: {from:?} -> {to:?}")]
    UnsupportedConversion { from: PixelFormat, to: PixelFormat },

    /// The device rejected or failed submitted work.
    #[error("Kernel launch failed '{kernel}': {reason}")]
    KernelLaunchFailure { kernel: String, reason: String },

    /// A frame descriptor is malformed (null plane, bad input layout).
    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },

    /// Diagnostic sink could not be created or written.
    #[error("Dump IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// GPU backend errors.
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("No GPU backend available")]
    NoBackend,

    #[error("GPU device initialization failed: {0}")]
    DeviceInit(String),

    #[error("Device capability query failed: {0}")]
    CapabilityQuery(String),

    #[error("Stream operation failed: {0}")]
    Stream(String),

    #[error("Unknown stream handle {0}")]
    UnknownStream(u64),

    #[error("Kernel dispatch failed: {kernel}: {reason}")]
    KernelFailed { kernel: String, reason: String },

    #[error("GPU-to-host transfer failed: {0}")]
    TransferFailed(String),
}

impl GpuError {
    /// Convert a submission-time failure into the public error kind.
    pub fn into_launch_failure(self, kernel: &str) -> VppError {
        match self {
            GpuError::KernelFailed { kernel, reason } => {
                VppError::KernelLaunchFailure { kernel, reason }
            }
            other => VppError::KernelLaunchFailure {
                kernel: kernel.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Convenience Result type for processor operations.
pub type VppResult<T> = Result<T, VppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = VppError::UnsupportedConversion {
            from: PixelFormat::Rgb24,
            to: PixelFormat::Y800,
        };
        assert!(err.to_string().contains("Rgb24"));

        let err = VppError::DimensionMismatch {
            reason: "width 640 != 1280".into(),
        };
        assert!(err.to_string().contains("640"));
    }

    #[test]
    fn launch_failure_keeps_kernel_name() {
        let err = GpuError::KernelFailed {
            kernel: "nv12_to_rgb24".into(),
            reason: "too many threads".into(),
        }
        .into_launch_failure("ignored");
        match err {
            VppError::KernelLaunchFailure { kernel, .. } => assert_eq!(kernel, "nv12_to_rgb24"),
            other => panic!("unexpected {other:?}"),
        }

        let err = GpuError::UnknownStream(9).into_launch_failure("resize_nv12_nearest");
        assert!(err.to_string().contains("resize_nv12_nearest"));
    }
}
