use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};

use super::{Record, Repository};

/// In-process stand-in for the remote store.
///
/// Used when no database is configured and by tests; `set_available(false)`
/// makes every call fail the way an unreachable remote store would.
pub struct MemoryRepository<T: Record> {
    records: Mutex<Vec<T>>,
    available: AtomicBool,
    calls: AtomicU64,
}

impl<T: Record> Default for MemoryRepository<T> {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            calls: AtomicU64::new(0),
        }
    }
}

impl<T: Record> MemoryRepository<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<T>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of calls made against this repository, failed ones included.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Vec<T> {
        self.records.lock().await.clone()
    }

    fn enter(&self, op: &str) -> AppResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::Unavailable(format!("memory store offline ({})", op)))
        }
    }
}

#[async_trait::async_trait]
impl<T: Record> Repository<T> for MemoryRepository<T> {
    async fn insert(&self, records: &[T]) -> AppResult<()> {
        self.enter("insert")?;
        let mut stored = self.records.lock().await;
        if let Some(dup) = records
            .iter()
            .find(|r| stored.iter().any(|s| s.id() == r.id()))
        {
            return Err(AppError::Conflict(format!("duplicate id {}", dup.id())));
        }
        stored.extend(records.iter().cloned());
        Ok(())
    }

    async fn get_all(&self) -> AppResult<Vec<T>> {
        self.enter("get_all")?;
        Ok(self.records.lock().await.clone())
    }

    async fn get_by_status(&self, status: T::Status) -> AppResult<Vec<T>> {
        self.enter("get_by_status")?;
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| r.status() == status)
            .cloned()
            .collect())
    }

    async fn get_by_ids(&self, ids: &[String]) -> AppResult<Vec<T>> {
        self.enter("get_by_ids")?;
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| ids.iter().any(|id| id == r.id()))
            .cloned()
            .collect())
    }

    async fn set_by_id(&self, id: &str, record: &T) -> AppResult<()> {
        self.enter("set_by_id")?;
        let mut stored = self.records.lock().await;
        match stored.iter_mut().find(|r| r.id() == id) {
            Some(existing) => *existing = record.clone(),
            None => stored.push(record.clone()),
        }
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> AppResult<()> {
        self.enter("delete_by_id")?;
        self.records.lock().await.retain(|r| r.id() != id);
        Ok(())
    }

    fn backend_tag(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemCategory, ItemModel, ItemStatus, NewItem};

    fn item(name: &str) -> ItemModel {
        ItemModel::reported(NewItem {
            item_name: name.to_string(),
            category: ItemCategory::Keys,
            date_found: "2024-01-10".to_string(),
            location_found: "Library".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_crud() {
        let repo = MemoryRepository::new();
        let a = item("keys");
        let b = item("ring");
        repo.insert(&[a.clone(), b.clone()]).await.unwrap();
        assert!(repo.insert(&[a.clone()]).await.is_err());

        let active = a.with_status(ItemStatus::Active, "admin");
        repo.set_by_id(&a.id, &active).await.unwrap();
        assert_eq!(
            repo.get_by_status(ItemStatus::Active).await.unwrap(),
            vec![active.clone()]
        );
        assert_eq!(
            repo.get_by_ids(&[b.id.clone()]).await.unwrap(),
            vec![b.clone()]
        );

        repo.delete_by_id(&b.id).await.unwrap();
        repo.delete_by_id(&b.id).await.unwrap();
        assert_eq!(repo.get_all().await.unwrap(), vec![active]);
    }

    #[tokio::test]
    async fn test_offline_fails_every_call() {
        let repo: MemoryRepository<ItemModel> = MemoryRepository::new();
        repo.set_available(false);
        assert!(matches!(
            repo.get_all().await,
            Err(AppError::Unavailable(_))
        ));
        assert!(repo.insert(&[item("x")]).await.is_err());
        assert_eq!(repo.calls(), 2);
        assert!(repo.snapshot().await.is_empty());
    }
}
