//! GPU kernel identification and argument passing.

/// Identifies a VPP kernel (maps to an entry point in `kernels/cuda/*.cu`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KernelId {
    /// NV12 -> packed R, G, B (optionally resampled on the fly).
    Nv12ToRgb24,
    /// NV12 -> packed B, G, R (optionally resampled on the fly).
    Nv12ToBgr24,
    /// NV12 -> monochrome (luma plane copy, optionally resampled).
    Nv12ToY800,
    /// NV12 -> NV12 point-sampled resize.
    ResizeNv12Nearest,
    /// NV12 -> NV12 bilinear resize.
    ResizeNv12Bilinear,
}

impl KernelId {
    pub const ALL: [KernelId; 5] = [
        Self::Nv12ToRgb24,
        Self::Nv12ToBgr24,
        Self::Nv12ToY800,
        Self::ResizeNv12Nearest,
        Self::ResizeNv12Bilinear,
    ];

    /// Returns the kernel function name used in CUDA PTX.
    pub fn entry_point(&self) -> &'static str {
        match self {
            Self::Nv12ToRgb24 => "nv12_to_rgb24",
            Self::Nv12ToBgr24 => "nv12_to_bgr24",
            Self::Nv12ToY800 => "nv12_to_y800",
            Self::ResizeNv12Nearest => "resize_nv12_nearest",
            Self::ResizeNv12Bilinear => "resize_nv12_bilinear",
        }
    }

    /// Source file stem of the `.cu` file defining this kernel.
    pub fn module_stem(&self) -> &'static str {
        match self {
            Self::Nv12ToRgb24 | Self::Nv12ToBgr24 | Self::Nv12ToY800 => "nv12_convert",
            Self::ResizeNv12Nearest | Self::ResizeNv12Bilinear => "nv12_resize",
        }
    }

    /// Returns the PTX module filename (CUDA).
    pub fn cuda_module_name(&self) -> String {
        format!("{}.ptx", self.module_stem())
    }
}

/// Arguments passed to a GPU kernel dispatch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KernelArgs {
    entries: Vec<KernelArg>,
}

/// A single kernel argument.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum KernelArg {
    /// Device pointer (CUdeviceptr).
    DevicePtr(u64),
    /// 32-bit unsigned integer.
    U32(u32),
    /// 32-bit signed integer.
    I32(i32),
}

impl KernelArgs {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push_ptr(mut self, ptr: u64) -> Self {
        self.entries.push(KernelArg::DevicePtr(ptr));
        self
    }

    pub fn push_u32(mut self, val: u32) -> Self {
        self.entries.push(KernelArg::U32(val));
        self
    }

    pub fn push_i32(mut self, val: i32) -> Self {
        self.entries.push(KernelArg::I32(val));
        self
    }

    pub fn entries(&self) -> &[KernelArg] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Device pointer at position `index`, if that slot holds one.
    pub fn ptr_at(&self, index: usize) -> Option<u64> {
        match self.entries.get(index)? {
            KernelArg::DevicePtr(p) => Some(*p),
            _ => None,
        }
    }

    pub fn i32_at(&self, index: usize) -> Option<i32> {
        match self.entries.get(index)? {
            KernelArg::I32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn u32_at(&self, index: usize) -> Option<u32> {
        match self.entries.get(index)? {
            KernelArg::U32(v) => Some(*v),
            _ => None,
        }
    }
}
