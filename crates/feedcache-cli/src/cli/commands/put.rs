use std::io::Read;

use anyhow::Context;
use chrono::{DateTime, Utc};
use feedcache_core::{FeedSnapshot, FeedStore, ImageDescriptor, StoreConfig};
use serde::Deserialize;

use super::super::args::PutArgs;

/// Input accepted by `feedcache put`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FeedDocument {
    /// Capture time; defaults to now.
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    images: Vec<ImageDescriptor>,
}

pub async fn run(config: StoreConfig, args: PutArgs) -> anyhow::Result<i32> {
    let text = read_input(&args)?;
    let snapshot = parse_document(&text, Utc::now())
        .with_context(|| format!("invalid feed document: {}", args.input.display()))?;
    let count = snapshot.images.len();

    let store = FeedStore::open(config)?;
    let result = store.insert_snapshot(snapshot).await;
    if result.is_ok() {
        tracing::info!(images = count, "cached feed replaced");
        println!("{}", serde_json::json!({ "status": "stored", "images": count }));
    }
    Ok(super::finish("put", result))
}

fn read_input(args: &PutArgs) -> anyhow::Result<String> {
    if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read feed document from stdin")?;
        Ok(buf)
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))
    }
}

fn parse_document(text: &str, now: DateTime<Utc>) -> anyhow::Result<FeedSnapshot> {
    let doc: FeedDocument = serde_json::from_str(text)?;
    Ok(FeedSnapshot::new(doc.images, doc.timestamp.unwrap_or(now)))
}
