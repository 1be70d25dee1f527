pub mod lost_found_service;
pub mod optimistic;
pub mod outcome;

pub use lost_found_service::LostFoundService;
pub use optimistic::{ItemListView, MutationObserver, NoopObserver, Settlement};
pub use outcome::{Delivery, DrainReport, ItemStats, Outcome, SyncState};
