use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::errors::{FeedStoreError, FeedStoreResult};

/// Run an engine call, turning a panic into [`FeedStoreError::PlatformFault`].
pub(crate) fn guard<T>(
    op: &'static str,
    f: impl FnOnce() -> FeedStoreResult<T>,
) -> FeedStoreResult<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(FeedStoreError::fault(format!(
            "{op} panicked: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
