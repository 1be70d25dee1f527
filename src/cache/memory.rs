use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::error::AppResult;

use super::CacheBackend;

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryCache {
    async fn read(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, contents: &str) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), contents.to_string());
        Ok(())
    }

    fn backend_tag(&self) -> &'static str {
        "memory"
    }
}
