//! The video processor facade and its lifecycle.
//!
//! ```text
//! Uninitialized --initialize--> Open --shutdown--> Closed
//!       |                         ^                  ^  |
//!       |                         +---initialize-----+--+
//!       +-----------------shutdown-------------------+
//! ```
//!
//! Everything that lives for one open session (device capabilities, the
//! stream registry, the dump registry) sits in a [`Session`] behind an
//! `Arc`. Operations clone the `Arc` under a short read lock and run without
//! holding it, so consumers never contend on the facade.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use vpp_common::config::VppConfig;
use vpp_common::error::{VppError, VppResult};
use vpp_common::frame::Frame;
use vpp_common::gpu_traits::{DeviceCapabilities, VppBackend};
use vpp_common::types::ConversionTarget;

use crate::dispatch::Dispatcher;
use crate::dump::{DumpRegistry, FileSinkFactory, SinkFactory};
use crate::streams::StreamHandle;

/// Observable lifecycle state.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessorState {
    Uninitialized,
    Open,
    Closed,
}

struct Session {
    dispatcher: Dispatcher,
    dumps: Option<DumpRegistry>,
}

enum State {
    Uninitialized,
    Open(Arc<Session>),
    Closed,
}

/// Converts decoded NV12 frames for any number of independent consumers.
///
/// `VideoProcessor` is `Send + Sync`; share it behind an `Arc`. Calls for
/// different consumers may run concurrently. Calls for one consumer must be
/// serialized by the caller.
pub struct VideoProcessor {
    backend: Arc<dyn VppBackend>,
    sink_factory: Arc<dyn SinkFactory>,
    state: RwLock<State>,
}

impl VideoProcessor {
    /// Build a processor on `backend`. Dumps go to `config.dump_dir`.
    pub fn new(backend: Arc<dyn VppBackend>, config: &VppConfig) -> Self {
        Self::with_sink_factory(backend, Arc::new(FileSinkFactory::new(&config.dump_dir)))
    }

    /// Build a processor whose dump sinks come from `sink_factory`.
    pub fn with_sink_factory(
        backend: Arc<dyn VppBackend>,
        sink_factory: Arc<dyn SinkFactory>,
    ) -> Self {
        Self {
            backend,
            sink_factory,
            state: RwLock::new(State::Uninitialized),
        }
    }

    /// Select a backend per `config` and build a processor on it.
    pub fn from_config(config: &VppConfig) -> VppResult<Self> {
        let backend =
            vpp_gpu_hal::create_backend(config).map_err(VppError::DeviceQueryFailure)?;
        Ok(Self::new(backend, config))
    }

    pub fn backend(&self) -> &Arc<dyn VppBackend> {
        &self.backend
    }

    /// Query the device and open the processor.
    ///
    /// Idempotent while open: the running session and its diagnostics
    /// setting are kept. After [`shutdown`](Self::shutdown) this opens a
    /// fresh session with empty registries.
    pub fn initialize(&self, enable_diagnostics: bool) -> VppResult<()> {
        let mut state = self.state.write();
        if matches!(*state, State::Open(_)) {
            debug!("Video processor already open");
            return Ok(());
        }

        let capabilities = self
            .backend
            .capabilities()
            .map_err(VppError::DeviceQueryFailure)?;
        let dumps = enable_diagnostics
            .then(|| DumpRegistry::new(Arc::clone(&self.backend), Arc::clone(&self.sink_factory)));

        *state = State::Open(Arc::new(Session {
            dispatcher: Dispatcher::new(Arc::clone(&self.backend), capabilities),
            dumps,
        }));

        info!(
            device = self.backend.device_name(),
            max_threads_per_block = capabilities.max_threads_per_block,
            diagnostics = enable_diagnostics,
            "Video processor initialized"
        );
        Ok(())
    }

    /// Enqueue conversion of `input` into the caller-allocated `output`.
    ///
    /// Returns once the work is submitted on the consumer's stream. A
    /// failure of that work is reported by the next `convert` or
    /// [`synchronize`](Self::synchronize) for the same consumer.
    pub fn convert(
        &self,
        input: &Frame,
        output: &mut Frame,
        target: &ConversionTarget,
        consumer: &str,
    ) -> VppResult<()> {
        self.session()?
            .dispatcher
            .convert(input, output, target, consumer)
    }

    /// Append `output`'s bytes to the consumer's dump.
    ///
    /// A successful no-op when diagnostics are disabled. Reads device memory
    /// without waiting for the consumer's stream; call
    /// [`synchronize`](Self::synchronize) first.
    ///
    /// Fails with `NotOpen` or `Io`. A malformed `output` descriptor is an
    /// `Io` error of kind `InvalidInput`.
    pub fn dump(&self, output: &Frame, consumer: &str) -> VppResult<()> {
        let session = self.session()?;
        match &session.dumps {
            Some(dumps) => dumps.write_frame(output, consumer),
            None => Ok(()),
        }
    }

    /// Wait for the consumer's submitted work to finish.
    pub fn synchronize(&self, consumer: &str) -> VppResult<()> {
        self.session()?
            .dispatcher
            .streams()
            .synchronize(consumer)
            .map_err(|e| e.into_launch_failure("synchronize"))
    }

    /// The consumer's stream, if it has one. Never creates it.
    pub fn consumer_stream(&self, consumer: &str) -> Option<Arc<StreamHandle>> {
        self.session().ok()?.dispatcher.streams().get(consumer)
    }

    /// Number of consumers with a stream in the current session.
    pub fn consumer_count(&self) -> usize {
        self.session()
            .map(|s| s.dispatcher.streams().len())
            .unwrap_or(0)
    }

    /// Number of consumers with an open dump sink in the current session.
    pub fn dump_sink_count(&self) -> usize {
        self.session()
            .ok()
            .and_then(|s| s.dumps.as_ref().map(DumpRegistry::len))
            .unwrap_or(0)
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.session()
            .map(|s| s.dumps.is_some())
            .unwrap_or(false)
    }

    pub fn state(&self) -> ProcessorState {
        match *self.state.read() {
            State::Uninitialized => ProcessorState::Uninitialized,
            State::Open(_) => ProcessorState::Open,
            State::Closed => ProcessorState::Closed,
        }
    }

    /// Capabilities queried by the open session.
    pub fn capabilities(&self) -> Option<DeviceCapabilities> {
        self.session().ok().map(|s| s.dispatcher.capabilities())
    }

    /// Drain and release every consumer's stream and dump sink.
    ///
    /// The caller guarantees no `convert` or `dump` runs concurrently.
    /// Failures while draining are logged. Always ends `Closed`; from
    /// `Uninitialized` there is nothing to drain.
    pub fn shutdown(&self) {
        let session = match std::mem::replace(&mut *self.state.write(), State::Closed) {
            State::Open(session) => session,
            State::Uninitialized | State::Closed => return,
        };

        let streams = session.dispatcher.streams().shutdown();
        let sinks = session.dumps.as_ref().map(DumpRegistry::shutdown).unwrap_or(0);
        info!(streams, sinks, "Video processor shut down");
    }

    fn session(&self) -> VppResult<Arc<Session>> {
        match &*self.state.read() {
            State::Open(session) => Ok(Arc::clone(session)),
            _ => Err(VppError::NotOpen),
        }
    }
}

impl Drop for VideoProcessor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for VideoProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoProcessor")
            .field("device", &self.backend.device_name())
            .field("state", &self.state())
            .field("consumers", &self.consumer_count())
            .finish()
    }
}
