//! FeedStore: the single-slot feed cache.
//!
//! Provides asynchronous retrieve/insert/delete with:
//! - FIFO serialization of every operation on one storage handle
//! - Atomic replace-on-insert and all-or-nothing delete
//! - Read-only mode that rejects mutations before touching the engine
//! - Panics inside the engine reported as `PlatformFault`
//!
//! ```text
//! callers ──retrieve/insert/delete──▶ queue ──▶ worker thread ──▶ SlotEngine
//!    ▲                                              │
//!    └──────────── Completion (oneshot) ◀───────────┘
//! ```

mod fault;
mod worker;

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};
use std::fmt;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::config::StoreConfig;
use crate::errors::{FeedStoreError, FeedStoreResult};
use crate::model::{CachedFeed, FeedSnapshot, ImageDescriptor};
use crate::storage::{SlotEngine, SqliteSlot};
use worker::{Job, Opener, Worker};

/// The feed cache.
///
/// Operations are queued when called, not when awaited, so submission order
/// is call order. Dropping the store waits for queued operations to finish.
pub struct FeedStore {
    config: StoreConfig,
    queue: Option<mpsc::UnboundedSender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl FeedStore {
    /// Create a SQLite-backed store. The database is opened on first use.
    pub fn open(config: StoreConfig) -> FeedStoreResult<Self> {
        Self::with_engine(config, SqliteSlot::open)
    }

    /// Create a store over a custom engine.
    ///
    /// `opener` runs on the worker thread at the first operation, and again
    /// after a failed open or a fault.
    pub fn with_engine<E, F>(config: StoreConfig, mut opener: F) -> FeedStoreResult<Self>
    where
        E: SlotEngine + 'static,
        F: FnMut(&StoreConfig) -> FeedStoreResult<E> + Send + 'static,
    {
        let opener: Opener =
            Box::new(move |cfg: &StoreConfig| opener(cfg).map(|e| Box::new(e) as Box<dyn SlotEngine>));
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker::new(config.clone(), opener);

        let handle = std::thread::Builder::new()
            .name("feed-store".into())
            .spawn(move || worker.run(rx))
            .map_err(|e| FeedStoreError::fault(format!("failed to spawn store worker: {e}")))?;

        Ok(Self {
            config,
            queue: Some(tx),
            worker: Some(handle),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Load the cached feed: `Empty`, `Found`, or an error. Never mutates.
    pub fn retrieve(&self) -> Completion<CachedFeed> {
        self.submit(Job::Retrieve)
    }

    /// Replace the cached feed with `images` captured at `timestamp`.
    pub fn insert(&self, images: Vec<ImageDescriptor>, timestamp: DateTime<Utc>) -> Completion<()> {
        self.insert_snapshot(FeedSnapshot::new(images, timestamp))
    }

    pub fn insert_snapshot(&self, snapshot: FeedSnapshot) -> Completion<()> {
        self.submit(|done| Job::Insert(snapshot, done))
    }

    /// Remove the cached feed. Deleting an empty cache succeeds.
    pub fn delete(&self) -> Completion<()> {
        self.submit(Job::Delete)
    }

    /// Wait for queued operations, then release the storage handle.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn submit<T>(
        &self,
        job: impl FnOnce(oneshot::Sender<FeedStoreResult<T>>) -> Job,
    ) -> Completion<T> {
        let (done, rx) = oneshot::channel();
        if let Some(queue) = &self.queue {
            // On a dead worker the job, and its sender, are dropped here and
            // the completion resolves to a fault.
            let _ = queue.send(job(done));
        }
        Completion { rx }
    }

    fn shutdown(&mut self) {
        drop(self.queue.take());
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                tracing::error!(location = %self.config.location, "feed store worker panicked");
            }
        }
    }
}

impl Drop for FeedStore {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for FeedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedStore")
            .field("location", &self.config.location)
            .field("read_only", &self.config.read_only)
            .field("open", &self.queue.is_some())
            .finish()
    }
}

/// Resolves once with the outcome of one queued operation.
///
/// Dropping it does not cancel the operation.
#[must_use = "the operation runs regardless, but its outcome is only observable through the completion"]
#[derive(Debug)]
pub struct Completion<T> {
    rx: oneshot::Receiver<FeedStoreResult<T>>,
}

impl<T> Completion<T> {
    /// Block the current thread until the operation completes.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn wait(self) -> FeedStoreResult<T> {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(worker_gone()))
    }
}

impl<T> Future for Completion<T> {
    type Output = FeedStoreResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(worker_gone())),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn worker_gone() -> FeedStoreError {
    FeedStoreError::fault("feed store worker stopped before completing the operation")
}
