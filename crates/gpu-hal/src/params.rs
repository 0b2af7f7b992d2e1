//! Kernel parameter blocks and launch geometry.
//!
//! Each struct maps one-to-one onto a kernel signature in `kernels/cuda/`.
//! Both backends consume the same [`KernelArgs`] layout: the CUDA backend
//! marshals it for `cuLaunchKernel`, the host backend decodes it again with
//! `from_kernel_args`.

use vpp_common::kernel::{KernelArgs, KernelId};
use vpp_common::types::ResizeMethod;

/// Parameters for the fused `nv12_to_rgb24` / `nv12_to_bgr24` / `nv12_to_y800` kernels.
///
/// ```c
/// extern "C" __global__ void nv12_to_rgb24(
///     const uint8_t* y_plane,
///     const uint8_t* uv_plane,
///     uint8_t*       dst,
///     int src_width,
///     int src_height,
///     int y_pitch,
///     int uv_pitch,
///     int dst_width,
///     int dst_height,
///     int dst_pitch,
///     unsigned int method)
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertParams {
    pub y_plane: u64,
    pub uv_plane: u64,
    pub dst: u64,
    pub src_width: i32,
    pub src_height: i32,
    pub y_pitch: i32,
    pub uv_pitch: i32,
    pub dst_width: i32,
    pub dst_height: i32,
    pub dst_pitch: i32,
    /// Sampling used when source and destination sizes differ.
    pub method: ResizeMethod,
}

impl ConvertParams {
    pub const ARG_COUNT: usize = 11;

    /// Build `KernelArgs` matching the conversion kernel signature.
    pub fn to_kernel_args(&self) -> KernelArgs {
        KernelArgs::new()
            .push_ptr(self.y_plane)
            .push_ptr(self.uv_plane)
            .push_ptr(self.dst)
            .push_i32(self.src_width)
            .push_i32(self.src_height)
            .push_i32(self.y_pitch)
            .push_i32(self.uv_pitch)
            .push_i32(self.dst_width)
            .push_i32(self.dst_height)
            .push_i32(self.dst_pitch)
            .push_u32(self.method.as_kernel_arg())
    }

    /// Decode an argument list produced by [`to_kernel_args`](Self::to_kernel_args).
    pub fn from_kernel_args(args: &KernelArgs) -> Option<Self> {
        if args.len() != Self::ARG_COUNT {
            return None;
        }
        Some(Self {
            y_plane: args.ptr_at(0)?,
            uv_plane: args.ptr_at(1)?,
            dst: args.ptr_at(2)?,
            src_width: args.i32_at(3)?,
            src_height: args.i32_at(4)?,
            y_pitch: args.i32_at(5)?,
            uv_pitch: args.i32_at(6)?,
            dst_width: args.i32_at(7)?,
            dst_height: args.i32_at(8)?,
            dst_pitch: args.i32_at(9)?,
            method: ResizeMethod::from_kernel_arg(args.u32_at(10)?)?,
        })
    }

    /// One thread per destination pixel.
    pub fn launch_dims(&self, max_threads_per_block: u32) -> ([u32; 3], [u32; 3]) {
        let (grid, block) = compute_launch_config_2d(
            self.dst_width.max(0) as u32,
            self.dst_height.max(0) as u32,
            max_threads_per_block,
        );
        ([grid.0, grid.1, grid.2], [block.0, block.1, block.2])
    }
}

/// Parameters for `resize_nv12_nearest` / `resize_nv12_bilinear`.
///
/// ```c
/// extern "C" __global__ void resize_nv12_nearest(
///     const uint8_t* src_y,
///     const uint8_t* src_uv,
///     uint8_t*       dst_y,
///     uint8_t*       dst_uv,
///     int src_width,
///     int src_height,
///     int src_y_pitch,
///     int src_uv_pitch,
///     int dst_width,
///     int dst_height,
///     int dst_y_pitch,
///     int dst_uv_pitch)
/// ```
///
/// A thread at luma position `(x, y)` also writes chroma pair `(x, y)` when
/// that position lies inside the destination chroma grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResizeParams {
    pub src_y: u64,
    pub src_uv: u64,
    pub dst_y: u64,
    pub dst_uv: u64,
    pub src_width: i32,
    pub src_height: i32,
    pub src_y_pitch: i32,
    pub src_uv_pitch: i32,
    pub dst_width: i32,
    pub dst_height: i32,
    pub dst_y_pitch: i32,
    pub dst_uv_pitch: i32,
}

impl ResizeParams {
    pub const ARG_COUNT: usize = 12;

    pub fn to_kernel_args(&self) -> KernelArgs {
        KernelArgs::new()
            .push_ptr(self.src_y)
            .push_ptr(self.src_uv)
            .push_ptr(self.dst_y)
            .push_ptr(self.dst_uv)
            .push_i32(self.src_width)
            .push_i32(self.src_height)
            .push_i32(self.src_y_pitch)
            .push_i32(self.src_uv_pitch)
            .push_i32(self.dst_width)
            .push_i32(self.dst_height)
            .push_i32(self.dst_y_pitch)
            .push_i32(self.dst_uv_pitch)
    }

    pub fn from_kernel_args(args: &KernelArgs) -> Option<Self> {
        if args.len() != Self::ARG_COUNT {
            return None;
        }
        Some(Self {
            src_y: args.ptr_at(0)?,
            src_uv: args.ptr_at(1)?,
            dst_y: args.ptr_at(2)?,
            dst_uv: args.ptr_at(3)?,
            src_width: args.i32_at(4)?,
            src_height: args.i32_at(5)?,
            src_y_pitch: args.i32_at(6)?,
            src_uv_pitch: args.i32_at(7)?,
            dst_width: args.i32_at(8)?,
            dst_height: args.i32_at(9)?,
            dst_y_pitch: args.i32_at(10)?,
            dst_uv_pitch: args.i32_at(11)?,
        })
    }

    /// One thread per destination luma pixel.
    pub fn launch_dims(&self, max_threads_per_block: u32) -> ([u32; 3], [u32; 3]) {
        let (grid, block) = compute_launch_config_2d(
            self.dst_width.max(0) as u32,
            self.dst_height.max(0) as u32,
            max_threads_per_block,
        );
        ([grid.0, grid.1, grid.2], [block.0, block.1, block.2])
    }
}

/// Whether `kernel` takes [`ResizeParams`] (otherwise [`ConvertParams`]).
pub fn is_resize_kernel(kernel: &KernelId) -> bool {
    matches!(
        kernel,
        KernelId::ResizeNv12Nearest | KernelId::ResizeNv12Bilinear
    )
}

/// Calculate grid and block dimensions for a 2D kernel launch sized from the
/// device's max threads per block.
///
/// Blocks are 32 wide (one warp per row) and as tall as the limit allows, up
/// to 32 rows. Returns `(grid_dim, block_dim)` as `(u32, u32, u32)` tuples.
pub fn compute_launch_config_2d(
    width: u32,
    height: u32,
    max_threads_per_block: u32,
) -> ((u32, u32, u32), (u32, u32, u32)) {
    let max_threads = max_threads_per_block.max(1);
    let block_x = max_threads.min(32);
    let block_y = (max_threads / block_x).clamp(1, 32);
    let grid_x = width.div_ceil(block_x);
    let grid_y = height.div_ceil(block_y);
    ((grid_x, grid_y, 1), (block_x, block_y, 1))
}
