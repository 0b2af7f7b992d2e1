//! Host stream emulation: one worker thread per stream, fed by a channel.
//!
//! Jobs run strictly in submission order. A failing job does not stop the
//! worker; its error is parked and handed to whoever next submits to or
//! synchronizes the stream, mirroring how CUDA reports asynchronous faults.

use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use vpp_common::error::GpuError;

/// Unit of work executed on a stream's worker thread.
pub type Job = Box<dyn FnOnce() -> Result<(), GpuError> + Send + 'static>;

enum Command {
    Run(Job),
    /// Completion marker used by `synchronize`.
    Fence(Sender<()>),
}

/// A CPU-emulated execution stream.
pub struct HostStream {
    id: u64,
    sender: Mutex<Option<Sender<Command>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    deferred_error: Arc<Mutex<Option<GpuError>>>,
}

impl std::fmt::Debug for HostStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostStream").field("id", &self.id).finish()
    }
}

impl HostStream {
    /// Spawn the worker thread for stream `id`.
    pub fn new(id: u64) -> Result<Self, GpuError> {
        let (tx, rx) = channel::unbounded::<Command>();
        let deferred_error = Arc::new(Mutex::new(None::<GpuError>));
        let errors = Arc::clone(&deferred_error);

        let worker = std::thread::Builder::new()
            .name(format!("vpp-host-stream-{id}"))
            .spawn(move || {
                for command in rx {
                    match command {
                        Command::Run(job) => {
                            if let Err(e) = job() {
                                warn!(stream = id, error = %e, "Host stream job failed");
                                errors.lock().get_or_insert(e);
                            }
                        }
                        Command::Fence(done) => {
                            let _ = done.send(());
                        }
                    }
                }
                debug!(stream = id, "Host stream worker exiting");
            })
            .map_err(|e| GpuError::Stream(format!("Failed to spawn stream worker: {e}")))?;

        debug!(stream = id, "Created host stream");
        Ok(Self {
            id,
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            deferred_error,
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Take the error of a previously executed job, if any.
    pub fn take_deferred_error(&self) -> Option<GpuError> {
        self.deferred_error.lock().take()
    }

    /// Enqueue a job. Fails if an earlier job failed or the stream is closed.
    pub fn submit(&self, job: Job) -> Result<(), GpuError> {
        if let Some(e) = self.take_deferred_error() {
            return Err(e);
        }
        self.send(Command::Run(job))
    }

    /// Block until every job submitted so far has run.
    pub fn synchronize(&self) -> Result<(), GpuError> {
        let (done_tx, done_rx) = channel::bounded(1);
        self.send(Command::Fence(done_tx))?;
        done_rx
            .recv()
            .map_err(|_| GpuError::Stream(format!("Host stream {} worker died", self.id)))?;
        match self.take_deferred_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Stop accepting work, let the worker drain the queue and join it.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!(stream = self.id, "Host stream worker panicked");
            }
        }
    }

    fn send(&self, command: Command) -> Result<(), GpuError> {
        let sender = self.sender.lock();
        let tx = sender
            .as_ref()
            .ok_or_else(|| GpuError::Stream(format!("Host stream {} is closed", self.id)))?;
        tx.send(command)
            .map_err(|_| GpuError::Stream(format!("Host stream {} worker died", self.id)))
    }
}

impl Drop for HostStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}
