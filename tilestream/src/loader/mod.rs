//! Background tile loading.
//!
//! The render thread pushes [`LoadRequest`]s onto a blocking FIFO and
//! calls [`TileLoader::update`] once per frame. Finished work comes back
//! over two channels the render thread drains without blocking.
//!
//! # Modes
//!
//! - **Synchronous** (`threads = 0`): `update()` performs exactly one load
//!   on the calling thread.
//! - **Threaded** (`threads >= 1`): workers block on the queue and build
//!   tiles in parallel, but each finished tile waits for a [`FramePermit`]
//!   before it is handed over; `update()` releases one permit. At most one
//!   tile per frame reaches the attach queue, whatever the worker count.
//!
//! ```text
//!  render thread                 loader workers
//!  ─────────────                 ──────────────
//!  add(req) ──► LoadQueue ──► pop_blocking()
//!                                  build_tile()
//!  update() ──► FramePermit ──► acquire()
//!  drain_attach() ◄── mpsc ◄──── send(AttachRequest)
//!  drain_models() ◄── mpsc ◄──── send(ModelReady)
//! ```
//!
//! Workers never see the scene, the cache or the manager. Nothing in
//! flight is cancelled; stale results are discarded by the receiver.

mod build;
mod manifest;
mod permit;
mod queue;
mod reader;
mod request;

pub use build::{Completion, TileBuilder};
pub use manifest::{parse_line, ManifestEntry, ManifestError, ModelLine, TileManifest};
pub use permit::FramePermit;
pub use queue::LoadQueue;
pub use reader::{ModelReader, TilePayload, TileReadError, TileReader};
pub use request::{AttachRequest, LoadRequest, ModelLoad, ModelReady, TileLoad};

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Default number of loader threads.
pub const DEFAULT_LOADER_THREADS: usize = 1;

/// Owns the load queue, the worker threads and the completion channels.
pub struct TileLoader {
    queue: Arc<LoadQueue>,
    permit: Arc<FramePermit>,
    builder: Arc<TileBuilder>,
    attach_tx: Sender<AttachRequest>,
    attach_rx: Receiver<AttachRequest>,
    model_tx: Sender<ModelReady>,
    model_rx: Receiver<ModelReady>,
    token: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

impl TileLoader {
    /// Start a loader with `threads` workers; `0` selects synchronous mode.
    pub fn new(builder: TileBuilder, threads: usize) -> Self {
        let queue = Arc::new(LoadQueue::new());
        let permit = Arc::new(FramePermit::new());
        let builder = Arc::new(builder);
        let (attach_tx, attach_rx) = mpsc::channel();
        let (model_tx, model_rx) = mpsc::channel();
        let token = CancellationToken::new();

        info!(
            threads,
            roots = builder.roots().len(),
            "Starting tile loader"
        );

        let workers = (0..threads)
            .map(|i| {
                let queue = Arc::clone(&queue);
                let permit = Arc::clone(&permit);
                let builder = Arc::clone(&builder);
                let attach_tx = attach_tx.clone();
                let model_tx = model_tx.clone();
                let token = token.clone();

                thread::Builder::new()
                    .name(format!("tile-loader-{}", i))
                    .spawn(move || {
                        Self::worker_loop(i, queue, permit, builder, attach_tx, model_tx, token)
                    })
                    .expect("Failed to spawn tile loader thread")
            })
            .collect();

        Self {
            queue,
            permit,
            builder,
            attach_tx,
            attach_rx,
            model_tx,
            model_rx,
            token,
            workers,
        }
    }

    /// Queue a request behind everything already queued.
    pub fn add(&self, request: LoadRequest) {
        self.queue.push(request);
    }

    /// Per-frame tick from the render thread.
    pub fn update(&self) {
        if self.workers.is_empty() {
            if let Some(request) = self.queue.try_pop() {
                self.deliver(self.builder.process(request));
            }
        } else {
            self.permit.release();
        }
    }

    /// Finished tiles, without blocking.
    pub fn drain_attach(&self) -> impl Iterator<Item = AttachRequest> + '_ {
        self.attach_rx.try_iter()
    }

    /// Finished model loads, without blocking.
    pub fn drain_models(&self) -> impl Iterator<Item = ModelReady> + '_ {
        self.model_rx.try_iter()
    }

    /// Requests not yet taken by a loader.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    pub fn is_threaded(&self) -> bool {
        !self.workers.is_empty()
    }

    fn deliver(&self, completion: Completion) {
        // both receivers live in self, sends cannot fail
        match completion {
            Completion::Tile(request) => {
                let _ = self.attach_tx.send(request);
            }
            Completion::Model(ready) => {
                let _ = self.model_tx.send(ready);
            }
        }
    }

    fn worker_loop(
        id: usize,
        queue: Arc<LoadQueue>,
        permit: Arc<FramePermit>,
        builder: Arc<TileBuilder>,
        attach_tx: Sender<AttachRequest>,
        model_tx: Sender<ModelReady>,
        token: CancellationToken,
    ) {
        debug!(worker = id, "Loader worker started");

        while let Some(request) = queue.pop_blocking(&token) {
            let delivered = match builder.process(request) {
                Completion::Tile(request) => {
                    if !permit.acquire(&token) {
                        break;
                    }
                    attach_tx.send(request).is_ok()
                }
                Completion::Model(ready) => model_tx.send(ready).is_ok(),
            };
            if !delivered {
                break;
            }
        }

        debug!(worker = id, "Loader worker stopped");
    }
}

impl Drop for TileLoader {
    fn drop(&mut self) {
        self.token.cancel();
        self.queue.wake_all();
        self.permit.wake_all();

        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Tile loader thread panicked");
            }
        }
    }
}
