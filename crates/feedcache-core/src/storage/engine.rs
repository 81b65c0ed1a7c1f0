//! SQLite-backed slot.

use std::borrow::Cow;
use std::path::Path;

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tracing::debug;

use super::schema::{FEED_SCHEMA, SLOT, SLOT_TABLE};
use super::SlotEngine;
use crate::codec::{PersistedImage, PersistedRecord};
use crate::config::{StoreConfig, StoreLocation};
use crate::errors::{FeedStoreError, FeedStoreResult};

/// The slot persisted in one SQLite database.
#[derive(Debug)]
pub struct SqliteSlot {
    conn: Connection,
}

impl SqliteSlot {
    /// Open the database named by `cfg`.
    ///
    /// Read-write opens create the file, and the schema when the database
    /// is empty. Read-only opens never create anything. A database that
    /// belongs to someone else is rejected without being written to.
    pub fn open(cfg: &StoreConfig) -> FeedStoreResult<Self> {
        let conn = open_connection(cfg)?;
        Ok(Self { conn })
    }
}

impl SlotEngine for SqliteSlot {
    fn load(&mut self) -> FeedStoreResult<Option<PersistedRecord>> {
        load_record(&self.conn)
    }

    fn replace(&mut self, record: &PersistedRecord) -> FeedStoreResult<()> {
        replace_record(&self.conn, record)
    }

    fn clear(&mut self) -> FeedStoreResult<()> {
        clear_record(&self.conn)
    }
}

pub fn open_connection(cfg: &StoreConfig) -> FeedStoreResult<Connection> {
    let mode = if cfg.read_only {
        OpenFlags::SQLITE_OPEN_READ_ONLY
    } else {
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
    };
    // The store hands the connection to a single worker thread.
    let flags = mode | OpenFlags::SQLITE_OPEN_NO_MUTEX;

    let conn = match &cfg.location {
        StoreLocation::File(path) => Connection::open_with_flags(plain_path(path), flags)?,
        StoreLocation::InMemory(None) => Connection::open_in_memory_with_flags(flags)?,
        StoreLocation::InMemory(Some(name)) => Connection::open_with_flags(
            format!("file:{name}?mode=memory&cache=shared"),
            flags | OpenFlags::SQLITE_OPEN_URI,
        )?,
    };
    conn.busy_timeout(cfg.busy_timeout())?;
    init_connection(&conn, cfg.read_only)?;

    debug!(location = %cfg.location, read_only = cfg.read_only, "opened feed store connection");
    Ok(conn)
}

/// The bundled SQLite parses any filename starting with `file:` as a URI,
/// whatever the open flags say. Anchor such relative paths so their query
/// text stays part of the name.
fn plain_path(path: &Path) -> Cow<'_, Path> {
    if path.to_string_lossy().starts_with("file:") {
        Cow::Owned(Path::new(".").join(path))
    } else {
        Cow::Borrowed(path)
    }
}

/// What an opened database already holds.
#[derive(Debug, PartialEq, Eq)]
enum Contents {
    Empty,
    Feed,
    Foreign(Vec<String>),
}

fn contents(conn: &Connection) -> FeedStoreResult<Contents> {
    // Reading the catalog also validates the file header.
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if tables.is_empty() {
        Contents::Empty
    } else if tables.iter().any(|t| t == SLOT_TABLE) {
        Contents::Feed
    } else {
        Contents::Foreign(tables)
    })
}

fn init_connection(conn: &Connection, read_only: bool) -> FeedStoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON")?;
    match contents(conn)? {
        Contents::Foreign(tables) => Err(FeedStoreError::malformed(format!(
            "database holds unrelated tables ({}) and no {SLOT_TABLE}",
            tables.join(", ")
        ))),
        _ if read_only => Ok(()),
        _ => {
            conn.execute_batch(FEED_SCHEMA)?;
            Ok(())
        }
    }
}

fn has_schema(conn: &Connection) -> FeedStoreResult<bool> {
    let found: Option<String> = conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [SLOT_TABLE],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Read the slot. `None` when nothing is cached.
///
/// Both queries run inside one read transaction so a writer on another
/// connection cannot interleave between them.
pub fn load_record(conn: &Connection) -> FeedStoreResult<Option<PersistedRecord>> {
    conn.execute_batch("BEGIN DEFERRED")?;
    let result = load_record_inner(conn);
    // Read-only transaction: nothing to keep.
    let _ = conn.execute_batch("ROLLBACK");
    result
}

fn load_record_inner(conn: &Connection) -> FeedStoreResult<Option<PersistedRecord>> {
    // A read-only store over an empty database holds nothing.
    if !has_schema(conn)? {
        return Ok(None);
    }

    let timestamp: Option<String> = conn
        .query_row(
            "SELECT timestamp FROM feed_cache WHERE slot = ?1",
            params![SLOT],
            |row| row.get(0),
        )
        .optional()?;

    let Some(timestamp) = timestamp else {
        return Ok(None);
    };

    let mut stmt = conn.prepare(
        "SELECT position, id, description, location, url
         FROM feed_images
         WHERE slot = ?1
         ORDER BY position ASC",
    )?;
    let images = stmt
        .query_map(params![SLOT], |row| {
            Ok(PersistedImage {
                position: row.get(0)?,
                id: row.get(1)?,
                description: row.get(2)?,
                location: row.get(3)?,
                url: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(PersistedRecord { timestamp, images }))
}

/// Replace the slot with `record` in one write transaction.
pub fn replace_record(conn: &Connection, record: &PersistedRecord) -> FeedStoreResult<()> {
    in_write_transaction(conn, |conn| {
        delete_slot(conn)?;
        conn.execute(
            "INSERT INTO feed_cache (slot, timestamp) VALUES (?1, ?2)",
            params![SLOT, record.timestamp],
        )?;

        let mut stmt = conn.prepare(
            "INSERT INTO feed_images (slot, position, id, description, location, url)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )?;
        for image in &record.images {
            stmt.execute(params![
                SLOT,
                image.position,
                image.id,
                image.description,
                image.location,
                image.url,
            ])?;
        }
        Ok(())
    })
}

/// Empty the slot in one write transaction. Clearing an empty slot is a no-op.
pub fn clear_record(conn: &Connection) -> FeedStoreResult<()> {
    in_write_transaction(conn, delete_slot)
}

fn delete_slot(conn: &Connection) -> FeedStoreResult<()> {
    conn.execute("DELETE FROM feed_images WHERE slot = ?1", params![SLOT])?;
    conn.execute("DELETE FROM feed_cache WHERE slot = ?1", params![SLOT])?;
    Ok(())
}

fn in_write_transaction<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> FeedStoreResult<T>,
) -> FeedStoreResult<T> {
    // BEGIN IMMEDIATE acquires write lock immediately
    conn.execute_batch("BEGIN IMMEDIATE")?;

    let result = f(conn).and_then(|value| {
        conn.execute_batch("COMMIT")?;
        Ok(value)
    });

    if result.is_err() && !conn.is_autocommit() {
        let _ = conn.execute_batch("ROLLBACK");
    }

    result
}
