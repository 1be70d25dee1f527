// Client-local cache: named JSON collections over a pluggable backend

pub mod fs;
pub mod memory;

pub use fs::FsCache;
pub use memory::MemoryCache;

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::AppResult;

/// Named collections kept in the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    PendingItems,
    ActiveItems,
    Claims,
    EmailNotifications,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::PendingItems,
        Collection::ActiveItems,
        Collection::Claims,
        Collection::EmailNotifications,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Collection::PendingItems => "pending_items",
            Collection::ActiveItems => "active_items",
            Collection::Claims => "claims",
            Collection::EmailNotifications => "email_notifications",
        }
    }

    fn index(&self) -> usize {
        match self {
            Collection::PendingItems => 0,
            Collection::ActiveItems => 1,
            Collection::Claims => 2,
            Collection::EmailNotifications => 3,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw string storage behind the cache (filesystem / in-memory).
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Stored contents for `key`, or `None` when nothing was written yet.
    async fn read(&self, key: &str) -> AppResult<Option<String>>;

    /// Replace the contents stored under `key`.
    async fn write(&self, key: &str, contents: &str) -> AppResult<()>;

    fn backend_tag(&self) -> &'static str;
}

/// Typed access to the cache collections.
///
/// Every `update` is a whole-collection read-modify-write. Updates to the same
/// collection are serialized inside this process; two processes sharing one
/// backend can still lose an update (last write wins per collection).
pub struct LocalCache {
    backend: Arc<dyn CacheBackend>,
    locks: [Mutex<()>; 4],
}

impl LocalCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend,
            locks: [
                Mutex::new(()),
                Mutex::new(()),
                Mutex::new(()),
                Mutex::new(()),
            ],
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Records of a collection. Missing, unreadable or corrupt collections read as empty.
    pub async fn get<T: DeserializeOwned>(&self, collection: Collection) -> Vec<T> {
        match self.backend.read(collection.key()).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<T>>(&raw) {
                Ok(records) => records,
                Err(e) => {
                    tracing::error!(
                        "Corrupt cache collection, treating as empty: collection={}, error={}",
                        collection,
                        e
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::error!(
                    "Failed to read cache collection, treating as empty: collection={}, error={}",
                    collection,
                    e
                );
                Vec::new()
            }
        }
    }

    /// Overwrite a whole collection.
    pub async fn set<T: Serialize>(&self, collection: Collection, records: &[T]) -> AppResult<()> {
        let _guard = self.locks[collection.index()].lock().await;
        self.write(collection, records).await
    }

    /// Read, mutate and write back one collection while holding its lock.
    pub async fn update<T, R, F>(&self, collection: Collection, f: F) -> AppResult<R>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut Vec<T>) -> R,
    {
        let _guard = self.locks[collection.index()].lock().await;
        let mut records: Vec<T> = self.get(collection).await;
        let result = f(&mut records);
        self.write(collection, &records).await?;
        Ok(result)
    }

    async fn write<T: Serialize>(&self, collection: Collection, records: &[T]) -> AppResult<()> {
        let raw = serde_json::to_string(records)?;
        self.backend.write(collection.key(), &raw).await?;
        tracing::debug!(
            "Cache write: backend={}, collection={}, records={}",
            self.backend.backend_tag(),
            collection,
            records.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        id: String,
    }

    fn row(id: &str) -> Row {
        Row { id: id.to_string() }
    }

    #[test]
    fn test_collection_keys() {
        let keys: Vec<&str> = Collection::ALL.iter().map(|c| c.key()).collect();
        assert_eq!(
            keys,
            vec!["pending_items", "active_items", "claims", "email_notifications"]
        );
    }

    #[tokio::test]
    async fn test_missing_collection_reads_empty() {
        let cache = LocalCache::in_memory();
        let rows: Vec<Row> = cache.get(Collection::Claims).await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_collection_reads_empty() {
        let cache = LocalCache::in_memory();
        cache
            .backend()
            .write("pending_items", "{not json")
            .await
            .unwrap();
        let rows: Vec<Row> = cache.get(Collection::PendingItems).await;
        assert!(rows.is_empty());

        // A corrupt collection is replaced by the next update.
        cache
            .update(Collection::PendingItems, |rows: &mut Vec<Row>| rows.push(row("a")))
            .await
            .unwrap();
        let rows: Vec<Row> = cache.get(Collection::PendingItems).await;
        assert_eq!(rows, vec![row("a")]);
    }

    #[tokio::test]
    async fn test_concurrent_updates_are_not_lost() {
        let cache = Arc::new(LocalCache::in_memory());
        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .update(Collection::Claims, move |rows: &mut Vec<Row>| {
                        rows.push(row(&format!("c{}", i)))
                    })
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let rows: Vec<Row> = cache.get(Collection::Claims).await;
        assert_eq!(rows.len(), 16);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = LocalCache::in_memory();
        cache
            .set(Collection::ActiveItems, &[row("a"), row("b")])
            .await
            .unwrap();
        cache.set(Collection::ActiveItems, &[row("c")]).await.unwrap();
        let rows: Vec<Row> = cache.get(Collection::ActiveItems).await;
        assert_eq!(rows, vec![row("c")]);
    }
}
