//! Single-slot persistent cache for a feed snapshot.
//!
//! The cache holds at most one [`FeedSnapshot`]: an ordered list of image
//! descriptors plus the time they were captured. Consumers retrieve it,
//! replace it wholesale, or clear it:
//!
//! - All operations on one [`FeedStore`] run one at a time, in submission order
//! - `insert` atomically replaces the previous snapshot
//! - Failures are reported as [`FeedStoreError`] values, never as aborts
//!
//! # Quick Start
//!
//! ```no_run
//! use chrono::Utc;
//! use feedcache_core::{CachedFeed, FeedStore, StoreConfig};
//!
//! # async fn example() -> Result<(), feedcache_core::FeedStoreError> {
//! let store = FeedStore::open(StoreConfig::file("feed.db"))?;
//!
//! store.insert(vec![], Utc::now()).await?;
//! match store.retrieve().await? {
//!     CachedFeed::Empty => println!("nothing cached"),
//!     CachedFeed::Found { feed, timestamp } => {
//!         println!("{} images from {timestamp}", feed.len())
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod config;
pub mod errors;
pub mod model;
pub mod storage;
pub mod store;

pub use codec::{DecodePolicy, PersistedImage, PersistedRecord};
pub use config::{ConfigError, StoreConfig, StoreLocation};
pub use errors::{FeedStoreError, FeedStoreResult};
pub use model::{
    CachedFeed, DeletionResult, FeedSnapshot, ImageDescriptor, InsertionResult, RetrievalResult,
};
pub use storage::{SlotEngine, SqliteSlot};
pub use store::{Completion, FeedStore};
