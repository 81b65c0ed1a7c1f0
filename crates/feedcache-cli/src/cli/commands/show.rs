use feedcache_core::{CachedFeed, FeedStore, StoreConfig};
use serde_json::{json, Value};

pub async fn run(config: StoreConfig) -> anyhow::Result<i32> {
    let store = FeedStore::open(config)?;
    let result = store.retrieve().await.map(|cached| {
        println!("{}", serde_json::to_string_pretty(&render(&cached)).unwrap_or_default());
    });
    Ok(super::finish("show", result))
}

fn render(cached: &CachedFeed) -> Value {
    match cached {
        CachedFeed::Empty => json!({ "status": "empty" }),
        CachedFeed::Found { feed, timestamp } => json!({
            "status": "found",
            "timestamp": timestamp,
            "images": feed,
        }),
    }
}
