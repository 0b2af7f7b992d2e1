//! CPU implementations of the VPP kernels.
//!
//! Integer-exact mirrors of `kernels/cuda/nv12_convert.cu` and
//! `kernels/cuda/nv12_resize.cu`: every thread of the launch grid is
//! visited in order and runs the same per-pixel arithmetic as the device
//! code, including the bounds check against the destination size.
//!
//! Colorspace: BT.601 limited range, 10-bit fixed point.
//!
//! ```text
//! c = Y - 16, d = U - 128, e = V - 128
//! R = clamp((1192 * c            + 1634 * e + 512) >> 10)
//! G = clamp((1192 * c -  401 * d -  833 * e + 512) >> 10)
//! B = clamp((1192 * c + 2066 * d            + 512) >> 10)
//! ```
//!
//! Chroma is co-sited: pixel `(x, y)` uses chroma sample `(x / 2, y / 2)`.

use vpp_common::color::chroma_extent;
use vpp_common::kernel::KernelId;
use vpp_common::types::ResizeMethod;

use crate::params::{ConvertParams, ResizeParams};

/// Read-only view of an NV12 frame in host memory.
#[derive(Copy, Clone, Debug)]
pub struct Nv12Planes<'a> {
    pub y: &'a [u8],
    pub uv: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub y_pitch: usize,
    pub uv_pitch: usize,
}

impl Nv12Planes<'_> {
    fn luma(&self, x: u32, y: u32) -> u8 {
        self.y[y as usize * self.y_pitch + x as usize]
    }

    fn chroma(&self, cx: u32, cy: u32) -> (u8, u8) {
        let offset = cy as usize * self.uv_pitch + cx as usize * 2;
        (self.uv[offset], self.uv[offset + 1])
    }

    /// Luma sample for destination pixel `(x, y)` of a `dst_w` x `dst_h` frame.
    fn sample_luma(&self, x: u32, y: u32, dst_w: u32, dst_h: u32, method: ResizeMethod) -> u8 {
        match method {
            ResizeMethod::Nearest => self.luma(
                nearest_index(x, dst_w, self.width),
                nearest_index(y, dst_h, self.height),
            ),
            ResizeMethod::Bilinear => {
                let tx = bilinear_tap(x, dst_w, self.width);
                let ty = bilinear_tap(y, dst_h, self.height);
                lerp2(
                    self.luma(tx.i0, ty.i0),
                    self.luma(tx.i1, ty.i0),
                    self.luma(tx.i0, ty.i1),
                    self.luma(tx.i1, ty.i1),
                    tx.frac,
                    ty.frac,
                )
            }
        }
    }

    /// Chroma pair at destination chroma position `(cx, cy)` of a
    /// `dst_cw` x `dst_ch` chroma grid. U and V are sampled separately.
    fn sample_chroma(
        &self,
        cx: u32,
        cy: u32,
        dst_cw: u32,
        dst_ch: u32,
        method: ResizeMethod,
    ) -> (u8, u8) {
        let src_cw = chroma_extent(self.width);
        let src_ch = chroma_extent(self.height);
        match method {
            ResizeMethod::Nearest => self.chroma(
                nearest_index(cx, dst_cw, src_cw),
                nearest_index(cy, dst_ch, src_ch),
            ),
            ResizeMethod::Bilinear => {
                let tx = bilinear_tap(cx, dst_cw, src_cw);
                let ty = bilinear_tap(cy, dst_ch, src_ch);
                let (u00, v00) = self.chroma(tx.i0, ty.i0);
                let (u01, v01) = self.chroma(tx.i1, ty.i0);
                let (u10, v10) = self.chroma(tx.i0, ty.i1);
                let (u11, v11) = self.chroma(tx.i1, ty.i1);
                (
                    lerp2(u00, u01, u10, u11, tx.frac, ty.frac),
                    lerp2(v00, v01, v10, v11, tx.frac, ty.frac),
                )
            }
        }
    }
}

/// BT.601 limited-range YUV to `[R, G, B]`.
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;
    let r = (1192 * c + 1634 * e + 512) >> 10;
    let g = (1192 * c - 401 * d - 833 * e + 512) >> 10;
    let b = (1192 * c + 2066 * d + 512) >> 10;
    [clamp_u8(r), clamp_u8(g), clamp_u8(b)]
}

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

/// Point-sampled source index: `floor(dst_index * src_extent / dst_extent)`.
pub fn nearest_index(dst_index: u32, dst_extent: u32, src_extent: u32) -> u32 {
    let idx = dst_index as u64 * src_extent as u64 / dst_extent.max(1) as u64;
    (idx as u32).min(src_extent.saturating_sub(1))
}

/// Two source taps and the 8-bit weight of the second one.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BilinearTap {
    pub i0: u32,
    pub i1: u32,
    pub frac: u32,
}

/// Map a destination index to source taps with pixel centers aligned.
///
/// The source coordinate is `(dst_index + 0.5) * src / dst - 0.5` in 1/256
/// units; positions before the first or past the last sample clamp to the edge.
pub fn bilinear_tap(dst_index: u32, dst_extent: u32, src_extent: u32) -> BilinearTap {
    let dst = dst_extent.max(1) as u64;
    let src = src_extent.max(1) as u64;
    let centered = (2 * dst_index as u64 + 1) * src * 256 / (2 * dst);
    let s256 = centered.saturating_sub(128);
    let i0 = (s256 >> 8) as u32;
    let last = src as u32 - 1;
    if i0 >= last {
        return BilinearTap {
            i0: last,
            i1: last,
            frac: 0,
        };
    }
    BilinearTap {
        i0,
        i1: i0 + 1,
        frac: (s256 & 0xFF) as u32,
    }
}

/// Weighted 2x2 blend with 8-bit fractional weights, rounded.
pub fn lerp2(p00: u8, p01: u8, p10: u8, p11: u8, fx: u32, fy: u32) -> u8 {
    let top = p00 as u32 * (256 - fx) + p01 as u32 * fx;
    let bottom = p10 as u32 * (256 - fx) + p11 as u32 * fx;
    ((top * (256 - fy) + bottom * fy + 32768) >> 16) as u8
}

/// Iterate every thread index of a 2-D launch, like the device scheduler would.
fn for_each_thread(grid: [u32; 3], block: [u32; 3], mut f: impl FnMut(u32, u32)) {
    let threads_y = grid[1].saturating_mul(block[1]);
    let threads_x = grid[0].saturating_mul(block[0]);
    for ty in 0..threads_y {
        for tx in 0..threads_x {
            f(tx, ty);
        }
    }
}

/// Run one of the fused conversion kernels.
pub fn run_convert(
    kernel: KernelId,
    params: &ConvertParams,
    grid: [u32; 3],
    block: [u32; 3],
    src: Nv12Planes<'_>,
    dst: &mut [u8],
) {
    let dst_w = params.dst_width as u32;
    let dst_h = params.dst_height as u32;
    let dst_cw = chroma_extent(dst_w);
    let dst_ch = chroma_extent(dst_h);
    let pitch = params.dst_pitch as usize;
    let method = params.method;

    for_each_thread(grid, block, |x, y| {
        if x >= dst_w || y >= dst_h {
            return;
        }
        let luma = src.sample_luma(x, y, dst_w, dst_h, method);
        let row = y as usize * pitch;
        match kernel {
            KernelId::Nv12ToY800 => dst[row + x as usize] = luma,
            KernelId::Nv12ToRgb24 | KernelId::Nv12ToBgr24 => {
                let (u, v) = src.sample_chroma(x / 2, y / 2, dst_cw, dst_ch, method);
                let [r, g, b] = yuv_to_rgb(luma, u, v);
                let px = row + x as usize * 3;
                let out = &mut dst[px..px + 3];
                if kernel == KernelId::Nv12ToRgb24 {
                    out.copy_from_slice(&[r, g, b]);
                } else {
                    out.copy_from_slice(&[b, g, r]);
                }
            }
            KernelId::ResizeNv12Nearest | KernelId::ResizeNv12Bilinear => {}
        }
    });
}

/// Run one of the NV12 -> NV12 resize kernels.
pub fn run_resize(
    kernel: KernelId,
    params: &ResizeParams,
    grid: [u32; 3],
    block: [u32; 3],
    src: Nv12Planes<'_>,
    dst_y: &mut [u8],
    dst_uv: &mut [u8],
) {
    let method = match kernel {
        KernelId::ResizeNv12Bilinear => ResizeMethod::Bilinear,
        _ => ResizeMethod::Nearest,
    };
    let dst_w = params.dst_width as u32;
    let dst_h = params.dst_height as u32;
    let dst_cw = chroma_extent(dst_w);
    let dst_ch = chroma_extent(dst_h);
    let y_pitch = params.dst_y_pitch as usize;
    let uv_pitch = params.dst_uv_pitch as usize;

    for_each_thread(grid, block, |x, y| {
        if x >= dst_w || y >= dst_h {
            return;
        }
        dst_y[y as usize * y_pitch + x as usize] = src.sample_luma(x, y, dst_w, dst_h, method);
        if x < dst_cw && y < dst_ch {
            let (u, v) = src.sample_chroma(x, y, dst_cw, dst_ch, method);
            let offset = y as usize * uv_pitch + x as usize * 2;
            dst_uv[offset] = u;
            dst_uv[offset + 1] = v;
        }
    });
}
