use coalesce_store::{JsonFileStore, KeyValueStore, MemoryStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry {
    id: String,
    revalidate: i64,
}

fn entry(id: &str) -> Entry {
    Entry { id: id.to_string(), revalidate: 1_700_000_000_000 }
}

/// Behaviour every backend must share
async fn exercise_store(store: &dyn KeyValueStore<Entry>) {
    assert!(store.is_empty().await.unwrap());
    assert_eq!(store.get("missing").await.unwrap(), None);

    store.set("a", entry("a")).await.unwrap();
    store.set("b", entry("b")).await.unwrap();
    assert_eq!(store.get("a").await.unwrap(), Some(entry("a")));
    assert_eq!(store.len().await.unwrap(), 2);

    let mut updated = entry("a");
    updated.revalidate = 0;
    store.set("a", updated.clone()).await.unwrap();
    assert_eq!(store.get("a").await.unwrap(), Some(updated));

    assert_eq!(store.remove("b").await.unwrap(), Some(entry("b")));
    assert_eq!(store.remove("b").await.unwrap(), None);
    assert_eq!(store.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_memory_store_contract() {
    let store: MemoryStore<Entry> = MemoryStore::new();
    exercise_store(&store).await;
}

#[tokio::test]
async fn test_json_file_store_contract() {
    let dir = tempfile::tempdir().unwrap();
    let store: JsonFileStore<Entry> = JsonFileStore::open(dir.path(), "contract").await.unwrap();
    exercise_store(&store).await;
}

#[tokio::test]
async fn test_json_file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store: JsonFileStore<Entry> = JsonFileStore::open_default(dir.path()).await.unwrap();
        store.set("font-1", entry("font-1")).await.unwrap();
        store.set("font-2", entry("font-2")).await.unwrap();
        store.remove("font-2").await.unwrap();
    }

    let reopened: JsonFileStore<Entry> = JsonFileStore::open_default(dir.path()).await.unwrap();
    assert_eq!(reopened.get("font-1").await.unwrap(), Some(entry("font-1")));
    assert_eq!(reopened.get("font-2").await.unwrap(), None);
    assert_eq!(reopened.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_named_instances_are_separate() {
    let dir = tempfile::tempdir().unwrap();
    let fonts: JsonFileStore<Entry> = JsonFileStore::open(dir.path(), "fonts").await.unwrap();
    let icons: JsonFileStore<Entry> = JsonFileStore::open(dir.path(), "icons").await.unwrap();

    fonts.set("x", entry("x")).await.unwrap();
    assert_eq!(icons.get("x").await.unwrap(), None);
    assert!(dir.path().join("fonts.json").exists());
    assert!(!dir.path().join("icons.json").exists());
}
