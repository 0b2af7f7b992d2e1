//! GPU video post-processing for multiple consumers.
//!
//! Takes decoded NV12 frames and writes color-converted, optionally resized
//! frames into caller-allocated device memory:
//!
//! - [`VideoProcessor`]: lifecycle and the public operations.
//! - [`dispatch`]: validation, kernel planning and submission.
//! - [`streams`]: one execution stream per consumer, created on first use.
//! - [`dump`]: optional per-consumer raw dumps of converted frames.

pub mod dispatch;
pub mod dump;
pub mod processor;
pub mod registry;
pub mod streams;

pub use dispatch::{Dispatcher, KernelPlan};
pub use dump::{DumpSink, FileSinkFactory, SinkFactory};
pub use processor::{ProcessorState, VideoProcessor};
pub use streams::StreamHandle;
