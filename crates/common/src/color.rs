//! Pixel formats and their memory layout rules.

use serde::{Deserialize, Serialize};

/// Pixel format of a frame in device memory.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// NV12: Y plane + interleaved UV at half resolution (decoder output).
    Nv12,
    /// Monochrome, 8 bits per pixel.
    Y800,
    /// Packed 24-bit, channel order R, G, B.
    Rgb24,
    /// Packed 24-bit, channel order B, G, R.
    Bgr24,
}

impl PixelFormat {
    /// Number of memory planes.
    pub fn plane_count(self) -> usize {
        match self {
            Self::Nv12 => 2,
            Self::Y800 | Self::Rgb24 | Self::Bgr24 => 1,
        }
    }

    /// Bytes per pixel of the first plane.
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Nv12 | Self::Y800 => 1,
            Self::Rgb24 | Self::Bgr24 => 3,
        }
    }

    pub fn is_planar(self) -> bool {
        matches!(self, Self::Nv12)
    }

    /// Visible bytes in one row of `plane` for a `width` pixel wide frame.
    ///
    /// The NV12 chroma plane holds `ceil(width / 2)` (U, V) pairs per row.
    /// Returns `None` for a plane index the format does not have.
    pub fn row_bytes(self, plane: usize, width: u32) -> Option<usize> {
        let w = width as usize;
        match (self, plane) {
            (Self::Nv12, 0) | (Self::Y800, 0) => Some(w),
            (Self::Nv12, 1) => Some(chroma_extent(width) as usize * 2),
            (Self::Rgb24, 0) | (Self::Bgr24, 0) => Some(w * 3),
            _ => None,
        }
    }

    /// Number of rows in `plane` for a `height` pixel tall frame.
    pub fn plane_rows(self, plane: usize, height: u32) -> Option<usize> {
        match (self, plane) {
            (Self::Nv12, 1) => Some(chroma_extent(height) as usize),
            (_, 0) => Some(height as usize),
            _ => None,
        }
    }

    /// Smallest plane length (in bytes) that holds every visible row at `pitch`.
    pub fn min_plane_len(self, plane: usize, width: u32, height: u32, pitch: usize) -> Option<usize> {
        let row_bytes = self.row_bytes(plane, width)?;
        let rows = self.plane_rows(plane, height)?;
        if rows == 0 {
            return Some(0);
        }
        Some(pitch * (rows - 1) + row_bytes)
    }

    /// Total visible bytes of a frame (all planes, no pitch padding).
    pub fn frame_bytes(self, width: u32, height: u32) -> usize {
        (0..self.plane_count())
            .filter_map(|p| Some(self.row_bytes(p, width)? * self.plane_rows(p, height)?))
            .sum()
    }
}

/// Chroma samples along one axis of a 4:2:0 frame.
pub fn chroma_extent(luma: u32) -> u32 {
    luma.div_ceil(2)
}
