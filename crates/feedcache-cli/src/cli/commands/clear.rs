use feedcache_core::{FeedStore, StoreConfig};

pub async fn run(config: StoreConfig) -> anyhow::Result<i32> {
    let store = FeedStore::open(config)?;
    let result = store.delete().await;
    if result.is_ok() {
        println!("{}", serde_json::json!({ "status": "cleared" }));
    }
    Ok(super::finish("clear", result))
}
