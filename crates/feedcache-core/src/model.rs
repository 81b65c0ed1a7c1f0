use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::errors::FeedStoreError;

/// One image in a cached feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub url: Url,
}

impl ImageDescriptor {
    pub fn new(id: Uuid, url: Url) -> Self {
        Self {
            id,
            description: None,
            location: None,
            url,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// The single persisted feed record.
///
/// Image order is preserved and duplicate ids are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub images: Vec<ImageDescriptor>,
    pub timestamp: DateTime<Utc>,
}

impl FeedSnapshot {
    pub fn new(images: Vec<ImageDescriptor>, timestamp: DateTime<Utc>) -> Self {
        Self { images, timestamp }
    }
}

/// Successful outcome of a retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedFeed {
    Empty,
    Found {
        feed: Vec<ImageDescriptor>,
        timestamp: DateTime<Utc>,
    },
}

impl CachedFeed {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn into_snapshot(self) -> Option<FeedSnapshot> {
        match self {
            Self::Empty => None,
            Self::Found { feed, timestamp } => Some(FeedSnapshot::new(feed, timestamp)),
        }
    }
}

impl From<Option<FeedSnapshot>> for CachedFeed {
    fn from(snapshot: Option<FeedSnapshot>) -> Self {
        match snapshot {
            Some(s) => Self::Found {
                feed: s.images,
                timestamp: s.timestamp,
            },
            None => Self::Empty,
        }
    }
}

/// `Empty`, `Found`, or `Failed`.
pub type RetrievalResult = Result<CachedFeed, FeedStoreError>;
pub type InsertionResult = Result<(), FeedStoreError>;
pub type DeletionResult = Result<(), FeedStoreError>;
