//! Failure modes: read-only stores, bad locations, foreign or corrupt data,
//! commit failures.
//!
//! Every failure must be repeatable and leave the persisted slot untouched.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use feedcache_core::storage::{clear_record, load_record, open_connection, replace_record};
use feedcache_core::{
    CachedFeed, DecodePolicy, FeedStore, FeedStoreError, FeedStoreResult, ImageDescriptor,
    PersistedRecord, SlotEngine, StoreConfig,
};
use rusqlite::{params, Connection};
use url::Url;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("feedcache_core=debug")
        .with_test_writer()
        .try_init();
}

fn unique_feed(n: usize) -> Vec<ImageDescriptor> {
    (0..n)
        .map(|i| {
            ImageDescriptor::new(
                Uuid::new_v4(),
                Url::parse(&format!("https://images.test/{i}")).unwrap(),
            )
        })
        .collect()
}

fn seed(path: &Path, feed: Vec<ImageDescriptor>) -> CachedFeed {
    init_tracing();
    let timestamp = Utc::now();
    let store = FeedStore::open(StoreConfig::file(path)).unwrap();
    store.insert(feed.clone(), timestamp).wait().unwrap();
    store.close();
    CachedFeed::Found { feed, timestamp }
}

// === A) Read-only stores ===

#[test]
fn read_only_insert_fails_and_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let before = seed(&path, unique_feed(2));

    let store = FeedStore::open(StoreConfig::file(&path).with_read_only(true)).unwrap();

    assert_eq!(
        store.insert(unique_feed(1), Utc::now()).wait(),
        Err(FeedStoreError::ReadOnlyStore)
    );
    assert_eq!(store.retrieve().wait(), Ok(before));
}

#[test]
fn read_only_delete_fails_and_has_no_side_effects() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let before = seed(&path, unique_feed(2));

    let store = FeedStore::open(StoreConfig::file(&path).with_read_only(true)).unwrap();

    assert_eq!(store.delete().wait(), Err(FeedStoreError::ReadOnlyStore));
    assert_eq!(store.retrieve().wait(), Ok(before));
}

#[test]
fn read_only_mutations_fail_even_without_a_database() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never-created.db");
    let store = FeedStore::open(StoreConfig::file(&path).with_read_only(true)).unwrap();

    assert_eq!(
        store.insert(unique_feed(1), Utc::now()).wait(),
        Err(FeedStoreError::ReadOnlyStore)
    );
    assert_eq!(store.delete().wait(), Err(FeedStoreError::ReadOnlyStore));
    assert!(!path.exists());
}

#[test]
fn read_only_retrieve_of_missing_file_fails_repeatably() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never-created.db");
    let store = FeedStore::open(StoreConfig::file(&path).with_read_only(true)).unwrap();

    for _ in 0..2 {
        assert!(matches!(
            store.retrieve().wait(),
            Err(FeedStoreError::StorageUnavailable { .. })
        ));
    }
    assert!(!path.exists());
}

// === B) Invalid locations ===

#[test]
fn retrieve_delivers_failure_on_invalid_location() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no").join("such").join("dir").join("feed.db");
    let store = FeedStore::open(StoreConfig::file(&path)).unwrap();

    assert!(matches!(
        store.retrieve().wait(),
        Err(FeedStoreError::StorageUnavailable { .. })
    ));
}

#[test]
fn retrieve_has_no_side_effects_on_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no").join("such").join("dir").join("feed.db");
    let store = FeedStore::open(StoreConfig::file(&path)).unwrap();

    let first = store.retrieve().wait();
    let second = store.retrieve().wait();

    assert!(matches!(first, Err(FeedStoreError::StorageUnavailable { .. })));
    assert_eq!(first, second);
    assert!(!path.exists());
}

#[test]
fn mutations_fail_on_invalid_location() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("feed.db");
    let store = FeedStore::open(StoreConfig::file(&path)).unwrap();

    assert!(matches!(
        store.insert(unique_feed(1), Utc::now()).wait(),
        Err(FeedStoreError::StorageUnavailable { .. })
    ));
    assert!(matches!(
        store.delete().wait(),
        Err(FeedStoreError::StorageUnavailable { .. })
    ));
}

#[test]
fn file_prefixed_path_cannot_override_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let before = seed(&path, unique_feed(2));

    // Read as a plain relative path, never as a URI asking for `mode=ro`.
    let lookalike = format!("file:{}?mode=ro", path.display());
    let store = FeedStore::open(StoreConfig::file(lookalike)).unwrap();
    assert!(!store.config().read_only);

    let insert = store.insert(unique_feed(1), Utc::now()).wait();
    assert!(matches!(insert, Err(FeedStoreError::StorageUnavailable { .. })));

    let original = FeedStore::open(StoreConfig::file(&path)).unwrap();
    assert_eq!(original.retrieve().wait(), Ok(before));
}

// === C) Corrupt and foreign data ===

fn table_names(path: &Path) -> Vec<String> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    let names = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap();
    names
}

#[test]
fn database_of_another_app_is_malformed_and_never_written() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("other-app.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE contacts (name TEXT); INSERT INTO contacts VALUES ('ada');")
        .unwrap();

    let store = FeedStore::open(StoreConfig::file(&path)).unwrap();

    for _ in 0..2 {
        assert!(matches!(
            store.retrieve().wait(),
            Err(FeedStoreError::MalformedRecord { .. })
        ));
    }
    assert!(matches!(
        store.insert(unique_feed(1), Utc::now()).wait(),
        Err(FeedStoreError::StorageUnavailable { .. })
    ));
    assert!(matches!(
        store.delete().wait(),
        Err(FeedStoreError::StorageUnavailable { .. })
    ));
    store.close();

    assert_eq!(table_names(&path), vec!["contacts".to_string()]);
}

#[test]
fn retrieve_on_empty_database_bootstraps_and_reads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    Connection::open(&path)
        .unwrap()
        .execute_batch("PRAGMA user_version = 1")
        .unwrap();

    let store = FeedStore::open(StoreConfig::file(&path)).unwrap();

    assert_eq!(store.retrieve().wait(), Ok(CachedFeed::Empty));
    store.close();
    assert_eq!(
        table_names(&path),
        vec!["feed_cache".to_string(), "feed_images".to_string()]
    );
}

#[test]
fn foreign_file_is_reported_as_malformed_and_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let garbage = b"this is not a database, it is a grocery list".repeat(100);
    std::fs::write(&path, &garbage).unwrap();

    let store = FeedStore::open(StoreConfig::file(&path)).unwrap();

    for _ in 0..2 {
        assert!(matches!(
            store.retrieve().wait(),
            Err(FeedStoreError::MalformedRecord { .. })
        ));
    }
    // Malformed data is a retrieve-only failure; writes see an unusable location.
    assert!(matches!(
        store.insert(unique_feed(1), Utc::now()).wait(),
        Err(FeedStoreError::StorageUnavailable { .. })
    ));
    assert_eq!(std::fs::read(&path).unwrap(), garbage);
}

#[test]
fn strict_policy_fails_whole_retrieve_on_one_bad_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    seed(&path, unique_feed(3));

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE feed_images SET id = ?1 WHERE position = ?2",
        params!["not-a-uuid", 1],
    )
    .unwrap();
    drop(conn);

    let store = FeedStore::open(StoreConfig::file(&path)).unwrap();
    let first = store.retrieve().wait();
    assert!(matches!(first, Err(FeedStoreError::MalformedRecord { .. })));
    assert_eq!(store.retrieve().wait(), first);
}

#[test]
fn skip_policy_serves_remaining_images_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let CachedFeed::Found { feed, timestamp } = seed(&path, unique_feed(3)) else {
        panic!("seeded store should hold a feed");
    };

    let conn = Connection::open(&path).unwrap();
    conn.execute(
        "UPDATE feed_images SET url = ?1 WHERE position = ?2",
        params!["not a url", 1],
    )
    .unwrap();
    drop(conn);

    let store = FeedStore::open(
        StoreConfig::file(&path).with_decode_policy(DecodePolicy::SkipMalformed),
    )
    .unwrap();

    assert_eq!(
        store.retrieve().wait(),
        Ok(CachedFeed::Found {
            feed: vec![feed[0].clone(), feed[2].clone()],
            timestamp,
        })
    );
}

#[test]
fn corrupt_timestamp_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    seed(&path, unique_feed(1));

    Connection::open(&path)
        .unwrap()
        .execute("UPDATE feed_cache SET timestamp = 'last tuesday'", [])
        .unwrap();

    let store = FeedStore::open(StoreConfig::file(&path)).unwrap();
    assert!(matches!(
        store.retrieve().wait(),
        Err(FeedStoreError::MalformedRecord { .. })
    ));
}

#[test]
fn insert_recovers_a_store_with_malformed_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    seed(&path, unique_feed(2));
    Connection::open(&path)
        .unwrap()
        .execute("UPDATE feed_images SET id = 'broken'", [])
        .unwrap();

    let store = FeedStore::open(StoreConfig::file(&path)).unwrap();
    let feed = unique_feed(1);
    let timestamp = Utc::now();

    store.insert(feed.clone(), timestamp).wait().unwrap();

    assert_eq!(
        store.retrieve().wait(),
        Ok(CachedFeed::Found { feed, timestamp })
    );
}

// === D) Commit failures ===

#[test]
fn insert_that_cannot_commit_leaves_previous_feed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let before = seed(&path, unique_feed(2));

    let store = FeedStore::open(
        StoreConfig::file(&path).with_busy_timeout(Duration::from_millis(50)),
    )
    .unwrap();
    // Open the handle before the lock is taken.
    assert_eq!(store.retrieve().wait(), Ok(before.clone()));

    let locker = Connection::open(&path).unwrap();
    locker.execute_batch("BEGIN EXCLUSIVE").unwrap();

    let insert = store.insert(unique_feed(5), Utc::now()).wait();
    let delete = store.delete().wait();

    locker.execute_batch("ROLLBACK").unwrap();
    drop(locker);

    assert!(matches!(insert, Err(FeedStoreError::StorageUnavailable { .. })));
    assert!(matches!(delete, Err(FeedStoreError::StorageUnavailable { .. })));
    assert!(insert.unwrap_err().is_retryable());
    assert_eq!(store.retrieve().wait(), Ok(before));
}

/// A read-write store whose medium refuses every write.
struct WriteProtected(Connection);

impl WriteProtected {
    fn open(cfg: &StoreConfig) -> FeedStoreResult<Self> {
        let conn = open_connection(cfg)?;
        conn.execute_batch("PRAGMA query_only = ON")?;
        Ok(Self(conn))
    }
}

impl SlotEngine for WriteProtected {
    fn load(&mut self) -> FeedStoreResult<Option<PersistedRecord>> {
        load_record(&self.0)
    }

    fn replace(&mut self, record: &PersistedRecord) -> FeedStoreResult<()> {
        replace_record(&self.0, record)
    }

    fn clear(&mut self) -> FeedStoreResult<()> {
        clear_record(&self.0)
    }
}

#[test]
fn write_protected_medium_is_unavailable_not_read_only() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feed.db");
    let before = seed(&path, unique_feed(2));

    let store = FeedStore::with_engine(StoreConfig::file(&path), WriteProtected::open).unwrap();
    assert!(!store.config().read_only);

    let insert = store.insert(unique_feed(3), Utc::now()).wait();
    let delete = store.delete().wait();

    assert!(matches!(insert, Err(FeedStoreError::StorageUnavailable { .. })));
    assert!(matches!(delete, Err(FeedStoreError::StorageUnavailable { .. })));
    assert_eq!(store.retrieve().wait(), Ok(before));
}
