//! Per-consumer execution streams.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use vpp_common::error::GpuError;
use vpp_common::gpu_traits::{GpuStream, VppBackend};
use vpp_common::types::ConsumerId;

use crate::registry::ConsumerRegistry;

/// The execution stream owned by one consumer.
///
/// Handed out as `Arc<StreamHandle>`; two handles for the same consumer in
/// one session are always the same allocation. After shutdown the handle
/// is released and every use of it fails.
#[derive(Debug)]
pub struct StreamHandle {
    consumer: ConsumerId,
    raw_handle: u64,
    stream: Mutex<Option<GpuStream>>,
}

impl StreamHandle {
    fn new(consumer: ConsumerId, stream: GpuStream) -> Self {
        Self {
            consumer,
            raw_handle: stream.handle,
            stream: Mutex::new(Some(stream)),
        }
    }

    pub fn consumer(&self) -> &ConsumerId {
        &self.consumer
    }

    /// Backend handle of the underlying stream.
    pub fn raw_handle(&self) -> u64 {
        self.raw_handle
    }

    pub fn is_released(&self) -> bool {
        self.stream.lock().is_none()
    }

    /// Run `f` against the live stream. Fails once the handle is released.
    pub fn with_stream<R>(
        &self,
        f: impl FnOnce(&GpuStream) -> Result<R, GpuError>,
    ) -> Result<R, GpuError> {
        let guard = self.stream.lock();
        match guard.as_ref() {
            Some(stream) => f(stream),
            None => Err(GpuError::Stream(format!(
                "stream of consumer '{}' was released",
                self.consumer
            ))),
        }
    }

    fn take(&self) -> Option<GpuStream> {
        self.stream.lock().take()
    }
}

/// ConsumerId -> stream map with lazy creation on first use.
pub struct StreamRegistry {
    backend: Arc<dyn VppBackend>,
    streams: ConsumerRegistry<StreamHandle>,
}

impl StreamRegistry {
    pub fn new(backend: Arc<dyn VppBackend>) -> Self {
        Self {
            backend,
            streams: ConsumerRegistry::new(),
        }
    }

    pub fn get(&self, consumer: &str) -> Option<Arc<StreamHandle>> {
        self.streams.get(consumer)
    }

    pub fn get_or_create(&self, consumer: &str) -> Result<Arc<StreamHandle>, GpuError> {
        self.streams.get_or_create(consumer, |id| {
            let stream = self.backend.create_stream()?;
            debug!(consumer = %id, stream = stream.handle, "Created consumer stream");
            Ok(StreamHandle::new(id.clone(), stream))
        })
    }

    /// Block until the consumer's stream drains. Unknown consumers have
    /// nothing in flight, so this is `Ok` for them.
    pub fn synchronize(&self, consumer: &str) -> Result<(), GpuError> {
        match self.get(consumer) {
            Some(handle) => handle.with_stream(|stream| self.backend.synchronize(stream)),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    /// Synchronize and destroy every stream. Failures are logged; the
    /// remaining streams are still released. Returns how many were released.
    pub fn shutdown(&self) -> usize {
        let entries = self.streams.drain();
        let count = entries.len();
        for (consumer, handle) in entries {
            let Some(stream) = handle.take() else {
                continue;
            };
            if let Err(e) = self.backend.synchronize(&stream) {
                warn!(consumer = %consumer, error = %e, "Stream drain failed at shutdown");
            }
            let raw = stream.handle;
            if let Err(e) = self.backend.destroy_stream(stream) {
                warn!(consumer = %consumer, stream = raw, error = %e, "Stream destroy failed");
            }
        }
        count
    }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("device", &self.backend.device_name())
            .field("streams", &self.streams.len())
            .finish()
    }
}
