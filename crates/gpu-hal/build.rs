//! Compiles `kernels/cuda/*.cu` to PTX when the `cuda` feature is on.
//!
//! A missing nvcc or a failed compile is a warning, not a build error: the
//! crate then sets `no_cuda_kernels` and the CUDA backend reports a module
//! load failure at runtime. The host backend needs none of this.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Must match the stems embedded by `src/kernels.rs`.
const MODULES: [&str; 2] = ["nv12_convert", "nv12_resize"];

fn main() {
    println!("cargo::rustc-check-cfg=cfg(no_cuda_kernels)");
    println!("cargo:rerun-if-env-changed=CUDA_PATH");

    if env::var_os("CARGO_FEATURE_CUDA").is_none() {
        return;
    }

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR"));
    let kernel_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../kernels/cuda");
    println!("cargo:rerun-if-changed={}", kernel_dir.display());

    let ptx_dir = out_dir.join("ptx");
    let compiled = match find_nvcc() {
        Some(nvcc) => {
            fs::create_dir_all(&ptx_dir).expect("create PTX output directory");
            MODULES
                .iter()
                .filter(|stem| compile(&nvcc, &kernel_dir, &ptx_dir, stem))
                .count()
        }
        None => {
            println!("cargo:warning=nvcc not found; set CUDA_PATH or put nvcc on PATH");
            0
        }
    };

    if compiled != MODULES.len() {
        println!("cargo:warning=CUDA kernels unavailable; launches will fail at runtime");
        println!("cargo:rustc-cfg=no_cuda_kernels");
    }
}

fn find_nvcc() -> Option<PathBuf> {
    let exe = if cfg!(windows) { "nvcc.exe" } else { "nvcc" };
    let from_cuda_path = env::var_os("CUDA_PATH")
        .map(|root| Path::new(&root).join("bin").join(exe))
        .filter(|p| p.is_file());
    from_cuda_path.or_else(|| {
        let path = env::var_os("PATH")?;
        env::split_paths(&path)
            .map(|dir| dir.join(exe))
            .find(|p| p.is_file())
    })
}

fn compile(nvcc: &Path, kernel_dir: &Path, ptx_dir: &Path, stem: &str) -> bool {
    let source = kernel_dir.join(format!("{stem}.cu"));
    println!("cargo:rerun-if-changed={}", source.display());
    println!("cargo:rerun-if-changed={}", kernel_dir.join("common.cuh").display());

    // sm_61 is the oldest NVDEC-capable generation we target. Integer-only
    // kernels, so no fast-math.
    let result = Command::new(nvcc)
        .arg("--ptx")
        .args(["-arch=sm_61", "-O3", "-Wno-deprecated-gpu-targets"])
        .arg("-I")
        .arg(kernel_dir)
        .arg("-o")
        .arg(ptx_dir.join(format!("{stem}.ptx")))
        .arg(&source)
        .status();

    match result {
        Ok(status) if status.success() => true,
        Ok(status) => {
            println!("cargo:warning=nvcc {stem}.cu exited with {status}");
            false
        }
        Err(e) => {
            println!("cargo:warning=cannot run nvcc for {stem}.cu: {e}");
            false
        }
    }
}
