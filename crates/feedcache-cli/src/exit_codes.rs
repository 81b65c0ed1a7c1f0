//! Exit codes for the `feedcache` binary.
//! Store failures exit with `FeedStoreError::exit_code` (1 malformed record,
//! 2 storage unavailable, 3 read-only store, 4 platform fault).

pub const SUCCESS: i32 = 0;
pub const CONFIG_ERROR: i32 = 5; // Bad arguments or unreadable input document
