use serde::Serialize;

/// State of the remote mirror after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncState {
    /// Every remote write issued by the operation succeeded.
    Mirrored,
    /// At least one remote write failed; the local cache is ahead of the remote store.
    Lagging { reason: String },
}

impl SyncState {
    pub fn is_mirrored(&self) -> bool {
        matches!(self, SyncState::Mirrored)
    }

    /// Combine two mirror steps; the first failure wins.
    pub fn and(self, other: SyncState) -> SyncState {
        match self {
            SyncState::Mirrored => other,
            lagging => lagging,
        }
    }
}

/// What happened to the notification an operation owed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delivery {
    NotRequired,
    Sent,
    /// Delivery failed and the message was appended to the local queue.
    Queued,
    /// Delivery failed and the message could not be queued either.
    Dropped,
}

/// Result of a mutating operation: the locally committed value plus the
/// remote and notification side effects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub sync: SyncState,
    pub delivery: Delivery,
}

impl<T> Outcome<T> {
    pub fn new(value: T, sync: SyncState) -> Self {
        Self {
            value,
            sync,
            delivery: Delivery::NotRequired,
        }
    }

    pub fn with_delivery(mut self, delivery: Delivery) -> Self {
        self.delivery = delivery;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub attempted: usize,
    pub delivered: usize,
    pub remaining: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ItemStats {
    pub total: usize,
    pub active: usize,
    pub claimed: usize,
}
