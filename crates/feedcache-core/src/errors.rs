//! Error taxonomy for the feed cache.
//!
//! Every failure is recovered at the store boundary and delivered to the
//! caller as one of these values. Nothing here is retried automatically.

use rusqlite::ErrorCode;

/// Feed store errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FeedStoreError {
    /// Persisted data exists but cannot be decoded into domain types.
    #[error("malformed record: {message}")]
    MalformedRecord { message: String },

    /// A mutation was attempted against a store opened read-only.
    #[error("store is read-only")]
    ReadOnlyStore,

    /// The engine could not be opened, read, or committed to.
    #[error("storage unavailable: {message}")]
    StorageUnavailable { message: String },

    /// A panic raised inside an engine call, caught at the store boundary.
    #[error("platform fault: {message}")]
    PlatformFault { message: String },
}

impl FeedStoreError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            message: message.into(),
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
        }
    }

    pub fn fault(message: impl Into<String>) -> Self {
        Self::PlatformFault {
            message: message.into(),
        }
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MalformedRecord { .. } => 1,
            Self::StorageUnavailable { .. } => 2,
            Self::ReadOnlyStore => 3,
            Self::PlatformFault { .. } => 4,
        }
    }

    /// Whether a caller may reasonably retry the operation.
    ///
    /// Read-only and malformed-data failures are structural and will repeat.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}

impl From<rusqlite::Error> for FeedStoreError {
    fn from(e: rusqlite::Error) -> Self {
        if matches!(
            e,
            rusqlite::Error::InvalidColumnType(..) | rusqlite::Error::FromSqlConversionFailure(..)
        ) {
            return Self::malformed(e.to_string());
        }
        match e.sqlite_error_code() {
            Some(ErrorCode::NotADatabase) | Some(ErrorCode::DatabaseCorrupt) => {
                Self::malformed(e.to_string())
            }
            // A medium that refuses writes is an unusable location. Only the
            // store's own read-only setting produces `ReadOnlyStore`.
            _ => Self::unavailable(e.to_string()),
        }
    }
}

/// Result type for feed store operations.
pub type FeedStoreResult<T> = Result<T, FeedStoreError>;
