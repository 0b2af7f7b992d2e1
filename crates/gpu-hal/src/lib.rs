//! GPU hardware abstraction for the VPP kernels.
//!
//! Provides the CUDA backend (feature `cuda`) and a CPU host-emulation
//! backend behind the `VppBackend` trait defined in `vpp-common`, plus the
//! kernel parameter blocks both of them share.

#[cfg(feature = "cuda")]
pub mod cuda;

pub mod host;
pub mod kernels;
pub mod params;
pub mod select;

pub use host::HostBackend;
pub use params::{compute_launch_config_2d, ConvertParams, ResizeParams};
pub use select::create_backend;
