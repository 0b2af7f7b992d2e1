//! Conversion dispatch: validate a request, pick the kernel, submit it.
//!
//! Validation and planning are pure and touch no device state, so a
//! rejected request never creates a stream or launches anything.
//!
//! | target            | same size                    | different size                 |
//! |-------------------|------------------------------|--------------------------------|
//! | NV12              | `resize_nv12_nearest` (copy) | `resize_nv12_{nearest,bilinear}` |
//! | RGB24/BGR24/Y800  | conversion kernel            | conversion kernel, fused resample |

use std::sync::Arc;

use tracing::debug;

use vpp_common::color::PixelFormat;
use vpp_common::error::{VppError, VppResult};
use vpp_common::frame::{Frame, Plane};
use vpp_common::gpu_traits::{DeviceCapabilities, VppBackend};
use vpp_common::kernel::{KernelArgs, KernelId};
use vpp_common::types::{ConversionTarget, ResizeMethod};
use vpp_gpu_hal::params::{ConvertParams, ResizeParams};

use crate::streams::{StreamHandle, StreamRegistry};

/// The single kernel launch that implements one conversion request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelPlan {
    Resize {
        kernel: KernelId,
        params: ResizeParams,
    },
    Convert {
        kernel: KernelId,
        params: ConvertParams,
    },
}

impl KernelPlan {
    /// Validate `input`/`output` against `target` and build the launch.
    pub fn build(input: &Frame, output: &Frame, target: &ConversionTarget) -> VppResult<Self> {
        if input.format() != PixelFormat::Nv12 {
            return Err(VppError::UnsupportedConversion {
                from: input.format(),
                to: target.format,
            });
        }
        check_no_null_planes("input", input)?;
        check_no_null_planes("output", output)?;
        check_output(output, target)?;
        check_input(input)?;

        let resize = input.resolution() != target.resolution();
        let src_y = plane(input, 0)?;
        let src_uv = plane(input, 1)?;

        let plan = match target.format {
            PixelFormat::Nv12 => {
                let kernel = match (resize, target.resize) {
                    (true, ResizeMethod::Bilinear) => KernelId::ResizeNv12Bilinear,
                    _ => KernelId::ResizeNv12Nearest,
                };
                let dst_y = plane(output, 0)?;
                let dst_uv = plane(output, 1)?;
                KernelPlan::Resize {
                    kernel,
                    params: ResizeParams {
                        src_y: src_y.ptr,
                        src_uv: src_uv.ptr,
                        dst_y: dst_y.ptr,
                        dst_uv: dst_uv.ptr,
                        src_width: input_dim(input.width(), "width")?,
                        src_height: input_dim(input.height(), "height")?,
                        src_y_pitch: pitch(src_y, "input luma")?,
                        src_uv_pitch: pitch(src_uv, "input chroma")?,
                        dst_width: target_dim(target.width, "width")?,
                        dst_height: target_dim(target.height, "height")?,
                        dst_y_pitch: pitch(dst_y, "output luma")?,
                        dst_uv_pitch: pitch(dst_uv, "output chroma")?,
                    },
                }
            }
            format => {
                let kernel = match format {
                    PixelFormat::Rgb24 => KernelId::Nv12ToRgb24,
                    PixelFormat::Bgr24 => KernelId::Nv12ToBgr24,
                    _ => KernelId::Nv12ToY800,
                };
                // Without a size change both methods are the identity; nearest is cheaper.
                let method = if resize {
                    target.resize
                } else {
                    ResizeMethod::Nearest
                };
                let dst = plane(output, 0)?;
                KernelPlan::Convert {
                    kernel,
                    params: ConvertParams {
                        y_plane: src_y.ptr,
                        uv_plane: src_uv.ptr,
                        dst: dst.ptr,
                        src_width: input_dim(input.width(), "width")?,
                        src_height: input_dim(input.height(), "height")?,
                        y_pitch: pitch(src_y, "input luma")?,
                        uv_pitch: pitch(src_uv, "input chroma")?,
                        dst_width: target_dim(target.width, "width")?,
                        dst_height: target_dim(target.height, "height")?,
                        dst_pitch: pitch(dst, "output")?,
                        method,
                    },
                }
            }
        };
        Ok(plan)
    }

    pub fn kernel(&self) -> KernelId {
        match self {
            KernelPlan::Resize { kernel, .. } | KernelPlan::Convert { kernel, .. } => *kernel,
        }
    }

    pub fn kernel_args(&self) -> KernelArgs {
        match self {
            KernelPlan::Resize { params, .. } => params.to_kernel_args(),
            KernelPlan::Convert { params, .. } => params.to_kernel_args(),
        }
    }

    pub fn launch_dims(&self, max_threads_per_block: u32) -> ([u32; 3], [u32; 3]) {
        match self {
            KernelPlan::Resize { params, .. } => params.launch_dims(max_threads_per_block),
            KernelPlan::Convert { params, .. } => params.launch_dims(max_threads_per_block),
        }
    }
}

fn check_no_null_planes(role: &str, frame: &Frame) -> VppResult<()> {
    match frame.planes().iter().position(Plane::is_null) {
        Some(index) => Err(VppError::InvalidFrame {
            reason: format!("{role} plane {index} has a null address"),
        }),
        None => Ok(()),
    }
}

fn check_output(output: &Frame, target: &ConversionTarget) -> VppResult<()> {
    let mismatch = |reason: String| -> VppResult<()> { Err(VppError::DimensionMismatch { reason }) };
    if target.width == 0 || target.height == 0 {
        return mismatch(format!("target size {} is empty", target.resolution()));
    }
    if output.format() != target.format {
        return mismatch(format!(
            "output format {:?} != target format {:?}",
            output.format(),
            target.format
        ));
    }
    if output.resolution() != target.resolution() {
        return mismatch(format!(
            "output size {} != target size {}",
            output.resolution(),
            target.resolution()
        ));
    }
    output
        .check_layout()
        .map_err(|reason| VppError::DimensionMismatch { reason })
}

fn check_input(input: &Frame) -> VppResult<()> {
    if input.width() == 0 || input.height() == 0 {
        return Err(VppError::InvalidFrame {
            reason: format!("input size {} is empty", input.resolution()),
        });
    }
    input
        .check_layout()
        .map_err(|reason| VppError::InvalidFrame { reason })
}

fn plane(frame: &Frame, index: usize) -> VppResult<&Plane> {
    frame.plane(index).ok_or_else(|| VppError::InvalidFrame {
        reason: format!("missing plane {index}"),
    })
}

fn input_dim(value: u32, what: &str) -> VppResult<i32> {
    i32::try_from(value).map_err(|_| VppError::InvalidFrame {
        reason: format!("input {what} {value} exceeds kernel range"),
    })
}

fn target_dim(value: u32, what: &str) -> VppResult<i32> {
    i32::try_from(value).map_err(|_| VppError::DimensionMismatch {
        reason: format!("target {what} {value} exceeds kernel range"),
    })
}

fn pitch(plane: &Plane, what: &str) -> VppResult<i32> {
    i32::try_from(plane.pitch).map_err(|_| VppError::InvalidFrame {
        reason: format!("{what} pitch {} exceeds kernel range", plane.pitch),
    })
}

/// Submits planned conversions onto per-consumer streams.
pub struct Dispatcher {
    backend: Arc<dyn VppBackend>,
    capabilities: DeviceCapabilities,
    streams: StreamRegistry,
}

impl Dispatcher {
    pub fn new(backend: Arc<dyn VppBackend>, capabilities: DeviceCapabilities) -> Self {
        Self {
            streams: StreamRegistry::new(Arc::clone(&backend)),
            backend,
            capabilities,
        }
    }

    pub fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    pub fn streams(&self) -> &StreamRegistry {
        &self.streams
    }

    /// Enqueue the conversion of `input` into `output` on the consumer's
    /// stream. Returns once the launch is submitted.
    pub fn convert(
        &self,
        input: &Frame,
        output: &mut Frame,
        target: &ConversionTarget,
        consumer: &str,
    ) -> VppResult<()> {
        let plan = KernelPlan::build(input, output, target)?;
        let kernel = plan.kernel();
        let (grid, block) = plan.launch_dims(self.capabilities.max_threads_per_block);
        let args = plan.kernel_args();

        let handle: Arc<StreamHandle> = self
            .streams
            .get_or_create(consumer)
            .map_err(|e| e.into_launch_failure(kernel.entry_point()))?;
        handle
            .with_stream(|stream| self.backend.dispatch_kernel(&kernel, grid, block, &args, stream))
            .map_err(|e| e.into_launch_failure(kernel.entry_point()))?;

        debug!(
            consumer,
            kernel = kernel.entry_point(),
            src = %input.resolution(),
            dst = %target.resolution(),
            format = ?target.format,
            "Submitted conversion"
        );
        Ok(())
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("capabilities", &self.capabilities)
            .field("streams", &self.streams)
            .finish()
    }
}
