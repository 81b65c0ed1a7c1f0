pub mod clear;
pub mod dispatch;
pub mod put;
pub mod show;

pub use dispatch::dispatch;

use crate::exit_codes::SUCCESS;
use feedcache_core::FeedStoreError;

/// Print a store failure and turn it into the process exit code.
pub(crate) fn finish(op: &str, result: Result<(), FeedStoreError>) -> i32 {
    match result {
        Ok(()) => SUCCESS,
        Err(e) => {
            eprintln!("{op} failed: {e}");
            e.exit_code()
        }
    }
}
