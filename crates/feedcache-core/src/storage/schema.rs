//! SQLite schema for the feed slot.
//!
//! Tables:
//! - `feed_cache`: at most one row (the slot) holding the capture timestamp
//! - `feed_images`: the slot's images, ordered by `position`

/// DDL for the feed cache tables.
///
/// Schema version: 1
pub const FEED_SCHEMA: &str = r#"
-- The single slot; the CHECK keeps it single
CREATE TABLE IF NOT EXISTS feed_cache (
    slot        INTEGER PRIMARY KEY CHECK (slot = 1),
    timestamp   TEXT NOT NULL,
    inserted_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Images of the slot, duplicates allowed
CREATE TABLE IF NOT EXISTS feed_images (
    slot        INTEGER NOT NULL REFERENCES feed_cache(slot) ON DELETE CASCADE,
    position    INTEGER NOT NULL,
    id          TEXT NOT NULL,
    description TEXT,
    location    TEXT,
    url         TEXT NOT NULL,
    PRIMARY KEY (slot, position)
);
"#;

/// Table probed to tell a never-initialized store from a populated one.
pub const SLOT_TABLE: &str = "feed_cache";

/// The slot key.
pub const SLOT: i64 = 1;
