//! Types, traits and errors shared by the VPP crates.
//!
//! This crate is the foundation the backend and processor crates depend on.
//! It defines the core abstractions:
//!
//! - **Types**: `ConsumerId`, `Resolution`, `ConversionTarget`, `ResizeMethod`
//! - **Color**: `PixelFormat` and its per-plane layout rules
//! - **Frame**: `Frame`, `Plane` (caller-owned device memory views)
//! - **GPU Traits**: `VppBackend`, `GpuStream`, `DeviceCapabilities`
//! - **Kernels**: `KernelId`, `KernelArgs` (dispatch interface)
//! - **Errors**: `VppError`, `GpuError` (thiserror-based)
//! - **Config**: `VppConfig`, `BackendPreference`

pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod gpu_traits;
pub mod kernel;
pub mod types;

// Re-export commonly used items at crate root
pub use color::PixelFormat;
pub use config::{BackendPreference, VppConfig};
pub use error::{GpuError, VppError, VppResult};
pub use frame::{Frame, Plane};
pub use gpu_traits::{DeviceCapabilities, GpuStream, VppBackend};
pub use kernel::{KernelArg, KernelArgs, KernelId};
pub use types::{ConsumerId, ConversionTarget, ResizeMethod, Resolution};
