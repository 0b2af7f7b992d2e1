//! Core types with newtype pattern for type safety.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::color::PixelFormat;

/// Opaque caller-supplied identity of a logical consumer.
///
/// Cheap to clone; all work submitted under the same id lands on the same
/// execution stream.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(Arc<str>);

impl ConsumerId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-name form of the id, unique per id.
    ///
    /// ASCII alphanumerics and `-` pass through, as does `.` anywhere but
    /// the first position. Every other byte, `_` included, becomes `_XX`
    /// (upper-case hex), so distinct ids never share a name and no name
    /// starts with a dot. The empty id maps to `_`.
    pub fn sanitized(&self) -> String {
        if self.0.is_empty() {
            return "_".to_string();
        }
        let mut name = String::with_capacity(self.0.len());
        for (i, byte) in self.0.bytes().enumerate() {
            let keep = byte.is_ascii_alphanumeric() || byte == b'-' || (byte == b'.' && i > 0);
            if keep {
                name.push(char::from(byte));
            } else {
                let _ = write!(name, "_{byte:02X}");
            }
        }
        name
    }
}

impl From<&str> for ConsumerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ConsumerId {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

impl Borrow<str> for ConsumerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Frame resolution (width x height).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD: Self = Self {
        width: 1280,
        height: 720,
    };
    pub const FHD: Self = Self {
        width: 1920,
        height: 1080,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Resampling algorithm used when source and target resolution differ.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResizeMethod {
    /// Point sampling, exactly reproducible.
    #[default]
    Nearest,
    /// Four-tap interpolation with edge clamping.
    Bilinear,
}

impl ResizeMethod {
    /// Value passed to kernels as the `method` argument.
    pub fn as_kernel_arg(self) -> u32 {
        match self {
            Self::Nearest => 0,
            Self::Bilinear => 1,
        }
    }

    pub fn from_kernel_arg(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Nearest),
            1 => Some(Self::Bilinear),
            _ => None,
        }
    }
}

/// Desired output of one conversion call.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversionTarget {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    #[serde(default)]
    pub resize: ResizeMethod,
}

impl ConversionTarget {
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
            resize: ResizeMethod::default(),
        }
    }

    pub fn with_resize(mut self, resize: ResizeMethod) -> Self {
        self.resize = resize;
        self
    }

    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}
