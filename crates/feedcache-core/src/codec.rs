//! Record codec: `FeedSnapshot` to and from its persisted rows.
//!
//! Encoding is total. Decoding validates every id, url and the timestamp;
//! what happens to an unreadable image depends on [`DecodePolicy`].

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;
use uuid::Uuid;

use crate::errors::{FeedStoreError, FeedStoreResult};
use crate::model::{FeedSnapshot, ImageDescriptor};

/// How decode treats a single unreadable image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecodePolicy {
    /// One malformed image fails the whole snapshot.
    #[default]
    Strict,
    /// Malformed images are dropped; the rest keep their order.
    SkipMalformed,
}

impl DecodePolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "skip-malformed" | "skip_malformed" | "skip" => Some(Self::SkipMalformed),
            _ => None,
        }
    }
}

/// Persisted shape of the feed slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    pub timestamp: String,
    pub images: Vec<PersistedImage>,
}

/// Persisted shape of one image row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedImage {
    pub position: i64,
    pub id: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub url: String,
}

pub fn encode(snapshot: &FeedSnapshot) -> PersistedRecord {
    PersistedRecord {
        timestamp: encode_timestamp(&snapshot.timestamp),
        images: snapshot
            .images
            .iter()
            .enumerate()
            .map(|(position, image)| PersistedImage {
                position: position as i64,
                id: image.id.to_string(),
                description: image.description.clone(),
                location: image.location.clone(),
                url: image.url.to_string(),
            })
            .collect(),
    }
}

pub fn decode(record: PersistedRecord, policy: DecodePolicy) -> FeedStoreResult<FeedSnapshot> {
    let timestamp = decode_timestamp(&record.timestamp)?;

    let mut rows = record.images;
    rows.sort_by_key(|r| r.position);

    let mut images = Vec::with_capacity(rows.len());
    for row in rows {
        match decode_image(row) {
            Ok(image) => images.push(image),
            Err(e) if policy == DecodePolicy::SkipMalformed => {
                warn!(error = %e, "dropping unreadable cached image");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(FeedSnapshot { images, timestamp })
}

fn decode_image(row: PersistedImage) -> FeedStoreResult<ImageDescriptor> {
    let id = Uuid::parse_str(&row.id).map_err(|e| {
        FeedStoreError::malformed(format!(
            "image at position {}: invalid id {:?}: {e}",
            row.position, row.id
        ))
    })?;
    let url = Url::parse(&row.url).map_err(|e| {
        FeedStoreError::malformed(format!(
            "image at position {}: invalid url {:?}: {e}",
            row.position, row.url
        ))
    })?;

    Ok(ImageDescriptor {
        id,
        description: row.description,
        location: row.location,
        url,
    })
}

// Nanosecond precision with a `Z` suffix reloads to the identical instant.
fn encode_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_timestamp(s: &str) -> FeedStoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| FeedStoreError::malformed(format!("invalid timestamp {s:?}: {e}")))
}
