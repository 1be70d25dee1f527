use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::models::ItemModel;

use super::outcome::{Outcome, SyncState};
use crate::error::AppResult;

/// Final word on an operation the caller already applied optimistically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    Confirmed,
    RolledBack { reason: String },
}

impl Settlement {
    pub fn of<T>(result: &AppResult<Outcome<T>>) -> Self {
        match result {
            Ok(outcome) => match &outcome.sync {
                SyncState::Mirrored => Settlement::Confirmed,
                SyncState::Lagging { reason } => Settlement::RolledBack {
                    reason: reason.clone(),
                },
            },
            Err(e) => Settlement::RolledBack {
                reason: e.to_string(),
            },
        }
    }
}

/// Two-phase callback for approve/decline.
///
/// `intended` fires before any store is touched; `settled` fires once the
/// local and remote writes finished.
pub trait MutationObserver<T>: Send + Sync {
    fn intended(&self, target: &T);

    fn settled(&self, target: &T, settlement: &Settlement);
}

pub struct NoopObserver;

impl<T> MutationObserver<T> for NoopObserver {
    fn intended(&self, _target: &T) {}

    fn settled(&self, _target: &T, _settlement: &Settlement) {}
}

struct Snapshot {
    before: Vec<ItemModel>,
    after: Vec<ItemModel>,
}

#[derive(Default)]
struct ViewState {
    items: Vec<ItemModel>,
    in_flight: HashMap<String, Snapshot>,
}

/// A caller-side cached list of items (for instance the pending review list).
///
/// Used as an observer it drops the item as soon as the operation is issued
/// and restores it when the operation is rolled back. The restore is
/// compare-and-restore: if the list is still exactly what the optimistic
/// update left, the pre-operation snapshot comes back whole; otherwise only
/// the item is put back at its former position.
#[derive(Default)]
pub struct ItemListView {
    state: Mutex<ViewState>,
}

impl ItemListView {
    pub fn new(items: Vec<ItemModel>) -> Self {
        Self {
            state: Mutex::new(ViewState {
                items,
                in_flight: HashMap::new(),
            }),
        }
    }

    pub fn items(&self) -> Vec<ItemModel> {
        self.lock().items.clone()
    }

    /// Replace the list with freshly read data.
    pub fn replace(&self, items: Vec<ItemModel>) {
        self.lock().items = items;
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().items.iter().any(|i| i.id == id)
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl MutationObserver<ItemModel> for ItemListView {
    fn intended(&self, target: &ItemModel) {
        let mut state = self.lock();
        let before = state.items.clone();
        state.items.retain(|i| i.id != target.id);
        let after = state.items.clone();
        state
            .in_flight
            .insert(target.id.clone(), Snapshot { before, after });
    }

    fn settled(&self, target: &ItemModel, settlement: &Settlement) {
        let mut state = self.lock();
        let Some(snapshot) = state.in_flight.remove(&target.id) else {
            return;
        };
        let Settlement::RolledBack { reason } = settlement else {
            return;
        };
        tracing::debug!("Rolling back view: id={}, reason={}", target.id, reason);

        if state.items == snapshot.after {
            state.items = snapshot.before;
            return;
        }
        if state.items.iter().any(|i| i.id == target.id) {
            return;
        }
        if let Some(pos) = snapshot.before.iter().position(|i| i.id == target.id) {
            let original = snapshot.before[pos].clone();
            let pos = pos.min(state.items.len());
            state.items.insert(pos, original);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemCategory, NewItem};

    fn item(name: &str) -> ItemModel {
        ItemModel::reported(NewItem {
            item_name: name.to_string(),
            category: ItemCategory::Books,
            date_found: "2024-02-01".to_string(),
            location_found: "Library".to_string(),
            ..Default::default()
        })
    }

    fn rolled_back() -> Settlement {
        Settlement::RolledBack {
            reason: "remote offline".to_string(),
        }
    }

    #[test]
    fn test_confirmed_keeps_removal() {
        let a = item("a");
        let b = item("b");
        let view = ItemListView::new(vec![a.clone(), b.clone()]);
        view.intended(&a);
        assert!(!view.contains(&a.id));
        view.settled(&a, &Settlement::Confirmed);
        assert_eq!(view.items(), vec![b]);
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let a = item("a");
        let b = item("b");
        let view = ItemListView::new(vec![a.clone(), b.clone()]);
        view.intended(&a);
        view.settled(&a, &rolled_back());
        assert_eq!(view.items(), vec![a, b]);
    }

    #[test]
    fn test_rollback_after_concurrent_change_reinserts_only_target() {
        let a = item("a");
        let b = item("b");
        let c = item("c");
        let view = ItemListView::new(vec![a.clone(), b.clone()]);
        view.intended(&a);
        view.replace(vec![b.clone(), c.clone()]);
        view.settled(&a, &rolled_back());
        assert_eq!(view.items(), vec![a, b, c]);
    }

    #[test]
    fn test_settle_without_intent_is_ignored() {
        let a = item("a");
        let view = ItemListView::new(vec![]);
        view.settled(&a, &rolled_back());
        assert!(view.items().is_empty());
    }
}
