//! PTX embedded from the `build.rs` output. Without nvcc at build time every
//! lookup is `None`.

/// PTX for a module, looked up by `.cu` file stem.
///
/// | Source file        | `get_ptx()` key   | Entry points                                       |
/// |--------------------|-------------------|----------------------------------------------------|
/// | `nv12_convert.cu`  | `"nv12_convert"`  | `nv12_to_rgb24`, `nv12_to_bgr24`, `nv12_to_y800`   |
/// | `nv12_resize.cu`   | `"nv12_resize"`   | `resize_nv12_nearest`, `resize_nv12_bilinear`      |
///
/// The stem for a kernel is `KernelId::module_stem()`.
#[cfg(feature = "cuda")]
pub fn get_ptx(name: &str) -> Option<&'static [u8]> {
    #[cfg(no_cuda_kernels)]
    {
        tracing::warn!(module = name, "Built without CUDA kernels");
        None
    }

    #[cfg(not(no_cuda_kernels))]
    {
        cuda_kernels::get(name)
    }
}

/// Stems of every embedded module.
#[cfg(feature = "cuda")]
pub fn available_ptx_kernels() -> &'static [&'static str] {
    #[cfg(no_cuda_kernels)]
    {
        &[]
    }

    #[cfg(not(no_cuda_kernels))]
    {
        cuda_kernels::NAMES
    }
}

#[cfg(all(feature = "cuda", not(no_cuda_kernels)))]
mod cuda_kernels {
    static NV12_CONVERT: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/ptx/nv12_convert.ptx"));

    static NV12_RESIZE: &[u8] = include_bytes!(concat!(env!("OUT_DIR"), "/ptx/nv12_resize.ptx"));

    pub static NAMES: &[&str] = &["nv12_convert", "nv12_resize"];

    pub fn get(name: &str) -> Option<&'static [u8]> {
        match name {
            "nv12_convert" => Some(NV12_CONVERT),
            "nv12_resize" => Some(NV12_RESIZE),
            _ => None,
        }
    }
}
