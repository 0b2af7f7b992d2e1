//! Diagnostic frame dumps.
//!
//! Each consumer gets one append-only sink, created on its first dump. A
//! dumped frame is the visible bytes of every plane, top row first, with
//! pitch padding dropped. Several frames for one consumer are simply
//! concatenated in call order.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use vpp_common::error::VppResult;
use vpp_common::frame::Frame;
use vpp_common::gpu_traits::VppBackend;
use vpp_common::types::ConsumerId;

use crate::registry::ConsumerRegistry;

/// Append-only byte sink.
pub trait DumpSink: Send {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Flush buffered data. Called at shutdown.
    fn finish(&mut self) -> io::Result<()>;
}

/// Creates the sink of a consumer on its first dump.
pub trait SinkFactory: Send + Sync {
    fn create(&self, consumer: &ConsumerId) -> io::Result<Box<dyn DumpSink>>;
}

/// Writes `<dir>/<ConsumerId::sanitized>.dump`, truncating an existing file.
/// Distinct consumers always get distinct files.
#[derive(Clone, Debug)]
pub struct FileSinkFactory {
    dir: PathBuf,
}

impl FileSinkFactory {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, consumer: &ConsumerId) -> PathBuf {
        self.dir.join(format!("{}.dump", consumer.sanitized()))
    }
}

impl SinkFactory for FileSinkFactory {
    fn create(&self, consumer: &ConsumerId) -> io::Result<Box<dyn DumpSink>> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(consumer);
        let file = File::create(&path)?;
        debug!(consumer = %consumer, path = %path.display(), "Opened dump file");
        Ok(Box::new(FileSink {
            writer: BufWriter::new(file),
        }))
    }
}

struct FileSink {
    writer: BufWriter<File>,
}

impl DumpSink for FileSink {
    fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// A consumer's sink plus its write counter.
pub struct DumpEntry {
    sink: Mutex<Box<dyn DumpSink>>,
    bytes_written: AtomicU64,
}

impl DumpEntry {
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    fn append(&self, bytes: &[u8]) -> io::Result<()> {
        self.sink.lock().append(bytes)?;
        self.bytes_written
            .fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

impl std::fmt::Debug for DumpEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpEntry")
            .field("bytes_written", &self.bytes_written())
            .finish()
    }
}

/// ConsumerId -> dump sink map with lazy creation.
pub struct DumpRegistry {
    backend: Arc<dyn VppBackend>,
    factory: Arc<dyn SinkFactory>,
    sinks: ConsumerRegistry<DumpEntry>,
}

impl DumpRegistry {
    pub fn new(backend: Arc<dyn VppBackend>, factory: Arc<dyn SinkFactory>) -> Self {
        Self {
            backend,
            factory,
            sinks: ConsumerRegistry::new(),
        }
    }

    pub fn get(&self, consumer: &str) -> Option<Arc<DumpEntry>> {
        self.sinks.get(consumer)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Append raw bytes to the consumer's sink.
    pub fn write(&self, consumer: &str, bytes: &[u8]) -> VppResult<()> {
        let entry = self.entry(consumer)?;
        entry.append(bytes)?;
        Ok(())
    }

    /// Read `frame` back from the device and append its visible rows.
    ///
    /// Does not synchronize: the caller makes sure the work producing
    /// `frame` has completed. Every failure is `VppError::Io`; a malformed
    /// descriptor is `ErrorKind::InvalidInput` and creates no sink.
    pub fn write_frame(&self, frame: &Frame, consumer: &str) -> VppResult<()> {
        frame
            .check_layout()
            .map_err(|reason| io::Error::new(io::ErrorKind::InvalidInput, reason))?;
        let bytes = self.read_visible(frame)?;
        self.write(consumer, &bytes)
    }

    /// Flush and close every sink. Failures are logged.
    pub fn shutdown(&self) -> usize {
        let entries = self.sinks.drain();
        let count = entries.len();
        for (consumer, entry) in entries {
            if let Err(e) = entry.sink.lock().finish() {
                warn!(consumer = %consumer, error = %e, "Dump flush failed at shutdown");
            }
        }
        count
    }

    fn entry(&self, consumer: &str) -> io::Result<Arc<DumpEntry>> {
        self.sinks.get_or_create(consumer, |id| {
            let sink = self.factory.create(id)?;
            Ok(DumpEntry {
                sink: Mutex::new(sink),
                bytes_written: AtomicU64::new(0),
            })
        })
    }

    fn read_visible(&self, frame: &Frame) -> io::Result<Vec<u8>> {
        let format = frame.format();
        let mut out = Vec::with_capacity(format.frame_bytes(frame.width(), frame.height()));

        for (index, plane) in frame.planes().iter().enumerate() {
            let (Some(row_bytes), Some(rows), Some(len)) = (
                format.row_bytes(index, frame.width()),
                format.plane_rows(index, frame.height()),
                format.min_plane_len(index, frame.width(), frame.height(), plane.pitch),
            ) else {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{format:?} has no plane {index}"),
                ));
            };
            if row_bytes == 0 || rows == 0 {
                continue;
            }

            let mut staging = vec![0u8; len];
            self.backend
                .copy_to_host(plane.ptr, &mut staging)
                .map_err(io::Error::other)?;
            for row in staging.chunks(plane.pitch).take(rows) {
                out.extend_from_slice(&row[..row_bytes]);
            }
        }
        Ok(out)
    }
}

impl std::fmt::Debug for DumpRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpRegistry")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}
