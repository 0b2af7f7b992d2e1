//! Caller-owned frame descriptors.
//!
//! A [`Frame`] only *describes* pixel memory: a format tag, a resolution and
//! one `(address, pitch, length)` triple per plane. The memory itself belongs
//! to the caller, who allocates it before the call and frees it after every
//! piece of work referencing it has completed. Nothing in this workspace
//! allocates, resizes or frees frame pixel data.

use crate::color::PixelFormat;
use crate::types::Resolution;

/// One memory plane of a frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Plane {
    /// Device-accessible base address (CUdeviceptr, or a host pointer for the host backend).
    pub ptr: u64,
    /// Byte stride between the starts of consecutive rows (linesize).
    pub pitch: usize,
    /// Bytes addressable from `ptr`.
    pub len: usize,
}

impl Plane {
    pub fn new(ptr: u64, pitch: usize, len: usize) -> Self {
        Self { ptr, pitch, len }
    }

    pub fn is_null(&self) -> bool {
        self.ptr == 0
    }
}

/// Foreign-owned frame record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    format: PixelFormat,
    width: u32,
    height: u32,
    planes: Vec<Plane>,
}

impl Frame {
    /// Describe caller-owned frame memory.
    ///
    /// # Safety
    ///
    /// For every plane, `ptr .. ptr + len` must be memory the active backend
    /// can read (input frames) or write (output frames), and it must stay valid
    /// until the consumer's stream has drained all work that references it.
    /// Input and output planes of one conversion must not overlap.
    pub unsafe fn from_raw_parts(
        format: PixelFormat,
        width: u32,
        height: u32,
        planes: Vec<Plane>,
    ) -> Self {
        Self {
            format,
            width,
            height,
            planes,
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes.get(index)
    }

    /// Check that the planes can hold a `format` frame of this resolution.
    ///
    /// Returns a human-readable reason on the first violated rule.
    pub fn check_layout(&self) -> Result<(), String> {
        let expected = self.format.plane_count();
        if self.planes.len() != expected {
            return Err(format!(
                "{:?} needs {expected} planes, frame has {}",
                self.format,
                self.planes.len()
            ));
        }

        for (index, plane) in self.planes.iter().enumerate() {
            if plane.is_null() {
                return Err(format!("plane {index} has a null address"));
            }
            // Indices come from `plane_count`, so both lookups succeed.
            let row_bytes = self.format.row_bytes(index, self.width).unwrap_or(0);
            if plane.pitch < row_bytes {
                return Err(format!(
                    "plane {index} pitch {} is below the row size {row_bytes}",
                    plane.pitch
                ));
            }
            let needed = self
                .format
                .min_plane_len(index, self.width, self.height, plane.pitch)
                .unwrap_or(0);
            if plane.len < needed {
                return Err(format!(
                    "plane {index} holds {} bytes, {needed} needed",
                    plane.len
                ));
            }
        }
        Ok(())
    }
}
