//! The store's single serialization point.
//!
//! One thread owns the storage handle and drains the job queue in FIFO
//! order. Each job's completion is sent exactly once.

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::fault::guard;
use crate::codec::{self, DecodePolicy};
use crate::config::StoreConfig;
use crate::errors::{FeedStoreError, FeedStoreResult};
use crate::model::{CachedFeed, DeletionResult, FeedSnapshot, InsertionResult, RetrievalResult};
use crate::storage::SlotEngine;

pub(crate) type Opener =
    Box<dyn FnMut(&StoreConfig) -> FeedStoreResult<Box<dyn SlotEngine>> + Send>;

pub(crate) enum Job {
    Retrieve(oneshot::Sender<RetrievalResult>),
    Insert(FeedSnapshot, oneshot::Sender<InsertionResult>),
    Delete(oneshot::Sender<DeletionResult>),
}

pub(crate) struct Worker {
    config: StoreConfig,
    opener: Opener,
    handle: Option<Box<dyn SlotEngine>>,
}

impl Worker {
    pub(crate) fn new(config: StoreConfig, opener: Opener) -> Self {
        Self {
            config,
            opener,
            handle: None,
        }
    }

    /// Drain `queue` until every sender is gone. Jobs queued before the
    /// store was dropped still run.
    pub(crate) fn run(mut self, mut queue: mpsc::UnboundedReceiver<Job>) {
        while let Some(job) = queue.blocking_recv() {
            self.process(job);
        }
        if self.handle.take().is_some() {
            debug!(location = %self.config.location, "released feed store handle");
        }
    }

    fn process(&mut self, job: Job) {
        match job {
            Job::Retrieve(done) => {
                let result = self.retrieve();
                report("retrieve", &result);
                let _ = done.send(result);
            }
            Job::Insert(snapshot, done) => {
                let result = self.insert(&snapshot);
                report("insert", &result);
                let _ = done.send(result);
            }
            Job::Delete(done) => {
                let result = self.delete();
                report("delete", &result);
                let _ = done.send(result);
            }
        }
    }

    fn retrieve(&mut self) -> RetrievalResult {
        let policy: DecodePolicy = self.config.decode_policy;
        match self.with_engine("retrieve", |engine| engine.load())? {
            None => Ok(CachedFeed::Empty),
            Some(record) => Ok(Some(codec::decode(record, policy)?).into()),
        }
    }

    fn insert(&mut self, snapshot: &FeedSnapshot) -> InsertionResult {
        if self.config.read_only {
            return Err(FeedStoreError::ReadOnlyStore);
        }
        let record = codec::encode(snapshot);
        self.with_engine("insert", |engine| engine.replace(&record))
            .map_err(for_mutation)
    }

    fn delete(&mut self) -> DeletionResult {
        if self.config.read_only {
            return Err(FeedStoreError::ReadOnlyStore);
        }
        self.with_engine("delete", |engine| engine.clear())
            .map_err(for_mutation)
    }

    /// Open the handle on first use, then run `f` against it.
    ///
    /// A failed open leaves no handle, so the next job tries again. A fault
    /// drops the handle, which rolls back anything the engine left open.
    fn with_engine<T>(
        &mut self,
        op: &'static str,
        f: impl FnOnce(&mut dyn SlotEngine) -> FeedStoreResult<T>,
    ) -> FeedStoreResult<T> {
        if self.handle.is_none() {
            let opener = &mut self.opener;
            let config = &self.config;
            let engine = guard("open", || opener(config))?;
            info!(
                location = %self.config.location,
                read_only = self.config.read_only,
                "opened feed store"
            );
            self.handle = Some(engine);
        }

        let Some(engine) = self.handle.as_deref_mut() else {
            return Err(FeedStoreError::fault("storage handle missing after open"));
        };

        let result = guard(op, || f(engine));
        if matches!(result, Err(FeedStoreError::PlatformFault { .. })) {
            self.handle = None;
        }
        result
    }
}

// Undecodable bytes under a write mean the location is unusable, not that a
// record was read.
fn for_mutation(e: FeedStoreError) -> FeedStoreError {
    match e {
        FeedStoreError::MalformedRecord { message } => FeedStoreError::unavailable(message),
        other => other,
    }
}

fn report<T>(op: &'static str, result: &FeedStoreResult<T>) {
    match result {
        Ok(_) => debug!(op, "feed store operation completed"),
        Err(e) => warn!(op, error = %e, "feed store operation failed"),
    }
}
