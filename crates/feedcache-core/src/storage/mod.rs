//! Storage engine adapter.
//!
//! Engines are synchronous and owned by exactly one thread at a time; the
//! store serializes every call through its worker queue.

pub mod engine;
pub mod schema;

pub use engine::{clear_record, load_record, open_connection, replace_record, SqliteSlot};
pub use schema::FEED_SCHEMA;

use crate::codec::PersistedRecord;
use crate::errors::FeedStoreResult;

/// An opened handle on the persisted slot.
///
/// `replace` and `clear` must apply fully or not at all.
pub trait SlotEngine: Send {
    /// The current record, or `None` if the slot is empty.
    fn load(&mut self) -> FeedStoreResult<Option<PersistedRecord>>;

    /// Atomically replace whatever the slot holds with `record`.
    fn replace(&mut self, record: &PersistedRecord) -> FeedStoreResult<()>;

    /// Atomically empty the slot.
    fn clear(&mut self) -> FeedStoreResult<()>;
}
