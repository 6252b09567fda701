//! Background progressive rendering.
//!
//! A worker thread owns the render loop so the caller (typically a UI) stays
//! responsive. The tracer sits behind a mutex: edits through
//! [`ProgressiveRenderer::with_tracer`] wait for the in-flight pass to finish,
//! and the worker publishes a copy of the display image after every pass.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;

use crate::tracer::{FrameStatus, PathTracer};
use crate::util::{Error, Result};

/// How long a converged worker sleeps between command checks.
const IDLE_POLL: Duration = Duration::from_millis(5);

/// Commands sent to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerCommand {
    /// Begin or resume rendering passes.
    Start,
    /// Pause after the current pass.
    Stop,
    /// Exit the worker thread.
    Shutdown,
}

/// Display image published by the worker.
#[derive(Debug, Clone)]
pub struct ProgressiveFrame {
    pub width: u32,
    pub height: u32,
    /// RGBA8, row-major.
    pub pixels: Vec<u8>,
    pub frame_count: u32,
}

#[derive(Default)]
struct Shared {
    running: AtomicBool,
    sample_count: AtomicU32,
    latest: Mutex<Option<Arc<ProgressiveFrame>>>,
}

/// Handle to the background render thread.
pub struct ProgressiveRenderer {
    tracer: Arc<Mutex<Box<dyn PathTracer>>>,
    shared: Arc<Shared>,
    tx: Sender<WorkerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl ProgressiveRenderer {
    /// Spawn an idle worker around `tracer`. Call [`start`](Self::start) to render.
    pub fn spawn(tracer: Box<dyn PathTracer>) -> Result<Self> {
        let tracer = Arc::new(Mutex::new(tracer));
        let shared = Arc::new(Shared::default());
        let (tx, rx) = channel::<WorkerCommand>();

        let handle = {
            let tracer = Arc::clone(&tracer);
            let shared = Arc::clone(&shared);
            thread::Builder::new()
                .name("lumina-progressive".into())
                .spawn(move || worker_loop(tracer, shared, rx))
                .map_err(|e| Error::backend(format!("failed to spawn render worker: {e}")))?
        };

        Ok(Self {
            tracer,
            shared,
            tx,
            handle: Some(handle),
        })
    }

    pub fn start(&self) {
        self.shared.running.store(true, Ordering::Release);
        let _ = self.tx.send(WorkerCommand::Start);
    }

    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::Release);
        let _ = self.tx.send(WorkerCommand::Stop);
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Whether at least one pass is available since the last reset.
    pub fn is_ready(&self) -> bool {
        self.sample_count() > 0 && self.shared.latest.lock().is_some()
    }

    /// Passes in the most recently published image.
    pub fn sample_count(&self) -> u32 {
        self.shared.sample_count.load(Ordering::Acquire)
    }

    /// Most recent published image.
    pub fn latest_frame(&self) -> Option<Arc<ProgressiveFrame>> {
        self.shared.latest.lock().clone()
    }

    /// Run `f` with exclusive access to the tracer, between passes.
    ///
    /// Scene or settings edits made here reset accumulation before this returns,
    /// and the published image is withdrawn until the next pass lands.
    pub fn with_tracer<R>(&self, f: impl FnOnce(&mut dyn PathTracer) -> R) -> R {
        let mut guard = self.tracer.lock();
        let result = f(&mut **guard);
        guard.sync();
        let frame_count = guard.frame_count();
        if frame_count == 0 {
            *self.shared.latest.lock() = None;
        }
        self.shared.sample_count.store(frame_count, Ordering::Release);
        result
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(&mut self) {
        let _ = self.tx.send(WorkerCommand::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            tracing::debug!("progressive worker joined");
        }
        self.shared.running.store(false, Ordering::Release);
    }
}

impl Drop for ProgressiveRenderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Main worker loop - runs in background thread.
fn worker_loop(
    tracer: Arc<Mutex<Box<dyn PathTracer>>>,
    shared: Arc<Shared>,
    rx: Receiver<WorkerCommand>,
) {
    let mut running = false;
    let mut converged = false;

    loop {
        let cmd = if !running {
            match rx.recv() {
                Ok(cmd) => Some(cmd),
                Err(_) => break, // Handle dropped
            }
        } else if converged {
            match rx.recv_timeout(IDLE_POLL) {
                Ok(cmd) => Some(cmd),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.try_recv() {
                Ok(cmd) => Some(cmd),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => break,
            }
        };

        match cmd {
            Some(WorkerCommand::Start) => {
                tracing::debug!("progressive rendering started");
                running = true;
            }
            Some(WorkerCommand::Stop) => {
                tracing::debug!("progressive rendering stopped");
                running = false;
                continue;
            }
            Some(WorkerCommand::Shutdown) => break,
            None => {}
        }
        if !running {
            continue;
        }

        let mut guard = tracer.lock();
        match guard.render() {
            Ok(FrameStatus::Rendered { frame_count }) => {
                converged = false;
                let display = guard.display();
                let frame = ProgressiveFrame {
                    width: display.width(),
                    height: display.height(),
                    pixels: display.as_bytes().to_vec(),
                    frame_count,
                };
                *shared.latest.lock() = Some(Arc::new(frame));
                shared.sample_count.store(frame_count, Ordering::Release);
            }
            Ok(FrameStatus::Converged { .. }) => {
                if !converged {
                    tracing::info!(frames = guard.frame_count(), "progressive render converged");
                }
                converged = true;
            }
            Err(e) => {
                tracing::warn!(error = %e, "progressive render failed, stopping");
                running = false;
                shared.running.store(false, Ordering::Release);
            }
        }
    }
}
