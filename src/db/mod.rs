pub mod memory;
pub mod pool;
pub mod postgres;

pub use memory::MemoryRepository;
pub use pool::{create_pool, ensure_schema};
pub use postgres::{PgClaimRepository, PgItemRepository};

use crate::error::AppResult;
use crate::models::{ClaimModel, ClaimStatus, ItemModel, ItemStatus};

/// An entity kept in the remote store.
pub trait Record: Clone + Send + Sync + 'static {
    type Status: Copy + PartialEq + Send + Sync;

    fn id(&self) -> &str;
    fn status(&self) -> Self::Status;
}

impl Record for ItemModel {
    type Status = ItemStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ItemStatus {
        self.status
    }
}

impl Record for ClaimModel {
    type Status = ClaimStatus;

    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> ClaimStatus {
        self.claim_status
    }
}

/// CRUD access to one entity collection of the remote store. Any call may fail.
#[async_trait::async_trait]
pub trait Repository<T: Record>: Send + Sync {
    async fn insert(&self, records: &[T]) -> AppResult<()>;

    async fn get_all(&self) -> AppResult<Vec<T>>;

    async fn get_by_status(&self, status: T::Status) -> AppResult<Vec<T>>;

    async fn get_by_ids(&self, ids: &[String]) -> AppResult<Vec<T>>;

    /// Replace the record stored under `id`, creating it when absent.
    async fn set_by_id(&self, id: &str, record: &T) -> AppResult<()>;

    /// Delete the record; deleting a missing record is not an error.
    async fn delete_by_id(&self, id: &str) -> AppResult<()>;

    fn backend_tag(&self) -> &'static str;
}

pub type ItemRepository = dyn Repository<ItemModel>;
pub type ClaimRepository = dyn Repository<ClaimModel>;
