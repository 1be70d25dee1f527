use std::future::Future;
use std::sync::Arc;

use crate::cache::{Collection, LocalCache};
use crate::db::{ClaimRepository, ItemRepository};
use crate::error::{AppError, AppResult};
use crate::models::{
    ClaimDecision, ClaimModel, ClaimStatus, ItemEdits, ItemModel, ItemStatus, ItemTransition,
    NewClaim, NewItem, Notification, QueuedNotification, ADMIN_USER, LOCAL_USER,
};
use crate::notify::Notifier;
use crate::storage::{upload_photo, PhotoStore};

use super::optimistic::{MutationObserver, Settlement};
use super::outcome::{Delivery, DrainReport, ItemStats, Outcome, SyncState};

const UNKNOWN_ITEM_NAME: &str = "your requested item";

/// Keeps the local cache and the remote store in step for items and claims.
///
/// Writes land in the local cache first and are authoritative; the remote
/// store is then updated best-effort. Reads come from the local cache and
/// fall back to the remote store only when the cached collection is empty.
pub struct LostFoundService {
    cache: Arc<LocalCache>,
    items: Arc<ItemRepository>,
    claims: Arc<ClaimRepository>,
    notifier: Arc<dyn Notifier>,
    photos: Option<Arc<dyn PhotoStore>>,
}

impl LostFoundService {
    pub fn new(
        cache: Arc<LocalCache>,
        items: Arc<ItemRepository>,
        claims: Arc<ClaimRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            cache,
            items,
            claims,
            notifier,
            photos: None,
        }
    }

    /// Enable photo uploads for finder reports.
    pub fn with_photo_store(mut self, photos: Arc<dyn PhotoStore>) -> Self {
        self.photos = Some(photos);
        self
    }

    // ---- reads ----

    /// Items with the given status (`None` for all).
    ///
    /// Pending reads `pending_items`, Active reads `active_items` verbatim
    /// (claim holds and claimed items included), Claimed reads the claimed
    /// entries of `active_items`, and `None` reads both collections. Never fails.
    pub async fn list_items(&self, status: Option<ItemStatus>) -> Vec<ItemModel> {
        let local = self.local_items(status).await;
        if !local.is_empty() {
            return local;
        }

        let remote = match status {
            Some(status) => self.items.get_by_status(status).await,
            None => self.items.get_all().await,
        };
        match remote {
            Ok(items) => {
                tracing::debug!(
                    "Loaded items from remote store: status={:?}, count={}",
                    status,
                    items.len()
                );
                items
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load items from remote store: status={:?}, error={}",
                    status,
                    e
                );
                Vec::new()
            }
        }
    }

    pub async fn list_pending_items(&self) -> Vec<ItemModel> {
        self.list_items(Some(ItemStatus::Pending)).await
    }

    pub async fn list_active_items(&self) -> Vec<ItemModel> {
        self.list_items(Some(ItemStatus::Active)).await
    }

    /// All claims, local first. Never fails.
    pub async fn list_claims(&self) -> Vec<ClaimModel> {
        let local: Vec<ClaimModel> = self.cache.get(Collection::Claims).await;
        if !local.is_empty() {
            return local;
        }
        match self.claims.get_all().await {
            Ok(claims) => {
                tracing::debug!("Loaded claims from remote store: count={}", claims.len());
                claims
            }
            Err(e) => {
                tracing::warn!("Failed to load claims from remote store: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn stats(&self) -> ItemStats {
        let items = self.list_items(None).await;
        ItemStats {
            total: items.len(),
            active: items
                .iter()
                .filter(|i| i.status == ItemStatus::Active)
                .count(),
            claimed: items
                .iter()
                .filter(|i| i.status == ItemStatus::Claimed)
                .count(),
        }
    }

    pub async fn queued_notifications(&self) -> Vec<QueuedNotification> {
        self.cache.get(Collection::EmailNotifications).await
    }

    async fn local_items(&self, status: Option<ItemStatus>) -> Vec<ItemModel> {
        match status {
            Some(ItemStatus::Pending) => self.cache.get(Collection::PendingItems).await,
            Some(ItemStatus::Active) => self.cache.get(Collection::ActiveItems).await,
            Some(ItemStatus::Claimed) => {
                let active: Vec<ItemModel> = self.cache.get(Collection::ActiveItems).await;
                active
                    .into_iter()
                    .filter(|i| i.status == ItemStatus::Claimed)
                    .collect()
            }
            None => {
                let mut all: Vec<ItemModel> = self.cache.get(Collection::PendingItems).await;
                let active: Vec<ItemModel> = self.cache.get(Collection::ActiveItems).await;
                all.extend(active);
                all
            }
        }
    }

    // ---- finder submissions ----

    /// Record a found item. The item is pending review and visible in the
    /// pending list even when the remote insert fails.
    pub async fn report_item(&self, new: NewItem) -> AppResult<Outcome<ItemModel>> {
        let item = ItemModel::reported(new);

        let stored = item.clone();
        self.cache
            .update(Collection::PendingItems, move |items: &mut Vec<ItemModel>| {
                items.push(stored)
            })
            .await?;
        tracing::info!("Item reported: id={}, name={}", item.id, item.item_name);

        let sync = self
            .mirror(
                "insert item",
                &item.id,
                self.items.insert(std::slice::from_ref(&item)),
            )
            .await;

        Ok(Outcome::new(item, sync))
    }

    /// Upload the finder's photo, then record the item with its URL.
    ///
    /// Nothing is recorded when the upload fails.
    pub async fn report_item_with_photo(
        &self,
        mut new: NewItem,
        photo: &[u8],
        content_type: &str,
    ) -> AppResult<Outcome<ItemModel>> {
        let photos = self
            .photos
            .as_deref()
            .ok_or_else(|| AppError::Storage("photo storage not configured".to_string()))?;
        let url = upload_photo(photos, photo, content_type).await?;
        new.photo_url = Some(url);
        self.report_item(new).await
    }

    // ---- review of reports ----

    /// Publish a pending report, optionally with administrator corrections.
    pub async fn approve_item(
        &self,
        item: &ItemModel,
        edits: ItemEdits,
        observer: &dyn MutationObserver<ItemModel>,
    ) -> AppResult<Outcome<ItemModel>> {
        item.check(ItemTransition::Approve)?;
        self.ensure_awaiting_review(item).await?;

        observer.intended(item);
        let result = self.publish(item, edits).await;
        observer.settled(item, &Settlement::of(&result));
        result
    }

    async fn publish(&self, item: &ItemModel, edits: ItemEdits) -> AppResult<Outcome<ItemModel>> {
        let mut approved = item.with_status(ItemStatus::Active, ADMIN_USER);
        if !edits.is_empty() {
            tracing::debug!("Applying edits before approval: id={}", item.id);
            approved.apply_edits(edits);
        }

        self.cache
            .update(Collection::PendingItems, |items: &mut Vec<ItemModel>| {
                items.retain(|i| i.id != approved.id)
            })
            .await?;
        let stored = approved.clone();
        self.cache
            .update(Collection::ActiveItems, move |items: &mut Vec<ItemModel>| {
                upsert_item(items, stored)
            })
            .await?;
        tracing::info!("Item approved: id={}", approved.id);

        let sync = self
            .mirror(
                "update item",
                &approved.id,
                self.items.set_by_id(&approved.id, &approved),
            )
            .await;

        Ok(Outcome::new(approved, sync))
    }

    /// Discard a pending report and tell the finder, if they left an address.
    pub async fn decline_item(
        &self,
        item: &ItemModel,
        observer: &dyn MutationObserver<ItemModel>,
    ) -> AppResult<Outcome<ItemModel>> {
        item.check(ItemTransition::Decline)?;
        self.ensure_awaiting_review(item).await?;

        observer.intended(item);
        let result = self.discard(item).await;
        observer.settled(item, &Settlement::of(&result));
        result
    }

    async fn discard(&self, item: &ItemModel) -> AppResult<Outcome<ItemModel>> {
        self.cache
            .update(Collection::PendingItems, |items: &mut Vec<ItemModel>| {
                items.retain(|i| i.id != item.id)
            })
            .await?;
        tracing::info!("Item declined: id={}", item.id);

        let sync = self
            .mirror("delete item", &item.id, self.items.delete_by_id(&item.id))
            .await;

        let delivery = match item.finder_email.as_deref().filter(|e| !e.is_empty()) {
            Some(email) => {
                self.notify(Notification::report_declined(item, email))
                    .await
            }
            None => Delivery::NotRequired,
        };

        Ok(Outcome::new(item.clone(), sync).with_delivery(delivery))
    }

    /// Pending items that also sit in `active_items` are held for a claim,
    /// not awaiting review.
    async fn ensure_awaiting_review(&self, item: &ItemModel) -> AppResult<()> {
        let active: Vec<ItemModel> = self.cache.get(Collection::ActiveItems).await;
        if active.iter().any(|i| i.id == item.id) {
            return Err(AppError::InvalidTransition(format!(
                "item {} is published; it is not awaiting review",
                item.id
            )));
        }
        Ok(())
    }

    /// Take a published item off the list for good.
    pub async fn remove_item(&self, item: &ItemModel) -> AppResult<Outcome<ItemModel>> {
        item.check(ItemTransition::Remove)?;

        self.cache
            .update(Collection::ActiveItems, |items: &mut Vec<ItemModel>| {
                items.retain(|i| i.id != item.id)
            })
            .await?;
        tracing::info!("Item removed: id={}", item.id);

        let sync = self
            .mirror("delete item", &item.id, self.items.delete_by_id(&item.id))
            .await;

        Ok(Outcome::new(item.clone(), sync))
    }

    // ---- pickup requests ----

    /// File a pickup request for a published item and hold the item.
    ///
    /// Only one pending claim per item is accepted. If the item is no longer
    /// available in the local active list the hold is skipped and the claim
    /// still stands; the remote item is then held only if it is still Active
    /// there.
    pub async fn request_claim(
        &self,
        item: &ItemModel,
        new: NewClaim,
    ) -> AppResult<Outcome<ClaimModel>> {
        item.check(ItemTransition::RequestClaim)?;

        let claim = ClaimModel::requested(&item.id, new);

        let stored = claim.clone();
        self.cache
            .update(Collection::Claims, move |claims: &mut Vec<ClaimModel>| {
                let open = claims.iter().find(|c| {
                    c.item_id == stored.item_id && c.claim_status == ClaimStatus::Pending
                });
                if let Some(open) = open {
                    return Err(AppError::Conflict(format!(
                        "item {} already has pending claim {}",
                        stored.item_id, open.id
                    )));
                }
                claims.push(stored);
                Ok(())
            })
            .await??;
        tracing::info!("Claim requested: id={}, item_id={}", claim.id, item.id);

        let held = self
            .cache
            .update(Collection::ActiveItems, |items: &mut Vec<ItemModel>| -> Option<ItemModel> {
                let local = items.iter_mut().find(|i| i.id == item.id)?;
                local.check(ItemTransition::RequestClaim).ok()?;
                *local = local.with_status(ItemStatus::Pending, LOCAL_USER);
                Some(local.clone())
            })
            .await?;

        let claim_sync = self
            .mirror(
                "insert claim",
                &claim.id,
                self.claims.insert(std::slice::from_ref(&claim)),
            )
            .await;
        let item_sync = match held {
            Some(held_item) => {
                self.mirror(
                    "update item",
                    &item.id,
                    self.items.set_by_id(&item.id, &held_item),
                )
                .await
            }
            None => {
                tracing::warn!(
                    "Item not available locally, claim hold skipped: item_id={}, claim_id={}",
                    item.id,
                    claim.id
                );
                let (sync, _) = self
                    .mirror_item_transition(
                        &item.id,
                        ItemTransition::RequestClaim,
                        ItemStatus::Pending,
                        LOCAL_USER,
                    )
                    .await;
                sync
            }
        };
        let sync = claim_sync.and(item_sync);

        Ok(Outcome::new(claim, sync))
    }

    /// Approve or decline a pending claim and tell the student.
    ///
    /// Fails with `NotFound` when the claim is neither cached nor known
    /// remotely, and with `InvalidTransition` when it was already resolved.
    pub async fn resolve_claim(
        &self,
        claim: &ClaimModel,
        decision: ClaimDecision,
    ) -> AppResult<Outcome<ClaimModel>> {
        let current = self.find_claim(&claim.id).await?;
        let resolved = current.resolved(decision, ADMIN_USER)?;

        let stored = resolved.clone();
        self.cache
            .update(Collection::Claims, move |claims: &mut Vec<ClaimModel>| {
                match claims.iter_mut().find(|c| c.id == stored.id) {
                    Some(existing) => *existing = stored,
                    None => claims.push(stored),
                }
            })
            .await?;

        let target = decision.item_status();
        let local_name = self
            .cache
            .update(Collection::ActiveItems, |items: &mut Vec<ItemModel>| -> Option<String> {
                let local = items.iter_mut().find(|i| i.id == resolved.item_id)?;
                if local.check(decision.item_transition()).is_ok() {
                    *local = local.with_status(target, ADMIN_USER);
                } else {
                    tracing::warn!(
                        "Item not held for a claim, status left unchanged: item_id={}, status={}",
                        local.id,
                        local.status
                    );
                }
                Some(local.item_name.clone())
            })
            .await?;
        tracing::info!(
            "Claim {}: id={}, item_id={}",
            decision.verb(),
            resolved.id,
            resolved.item_id
        );

        let claim_sync = self
            .mirror(
                "update claim",
                &resolved.id,
                self.claims.set_by_id(&resolved.id, &resolved),
            )
            .await;
        let (item_sync, remote_name) = self
            .mirror_item_transition(
                &resolved.item_id,
                decision.item_transition(),
                decision.item_status(),
                ADMIN_USER,
            )
            .await;

        let item_name = local_name
            .or(remote_name)
            .unwrap_or_else(|| UNKNOWN_ITEM_NAME.to_string());
        let delivery = self
            .notify(Notification::claim_resolved(&resolved, &item_name, decision))
            .await;

        Ok(Outcome::new(resolved, claim_sync.and(item_sync)).with_delivery(delivery))
    }

    async fn find_claim(&self, id: &str) -> AppResult<ClaimModel> {
        let local: Vec<ClaimModel> = self.cache.get(Collection::Claims).await;
        if let Some(claim) = local.into_iter().find(|c| c.id == id) {
            return Ok(claim);
        }

        match self.claims.get_by_ids(&[id.to_string()]).await {
            Ok(remote) => remote
                .into_iter()
                .find(|c| c.id == id)
                .ok_or_else(|| AppError::NotFound(format!("claim {}", id))),
            Err(e) => {
                tracing::warn!("Remote claim lookup failed: id={}, error={}", id, e);
                Err(AppError::NotFound(format!("claim {}", id)))
            }
        }
    }

    /// Remote read-modify-write of one item. The remote record is written only
    /// if it exists and `transition` is legal from its current status.
    /// Returns the mirror state and the item's name when the remote store knows it.
    async fn mirror_item_transition(
        &self,
        item_id: &str,
        transition: ItemTransition,
        target: ItemStatus,
        updater: &str,
    ) -> (SyncState, Option<String>) {
        let fetched = match self.items.get_by_ids(&[item_id.to_string()]).await {
            Ok(items) => items.into_iter().find(|i| i.id == item_id),
            Err(e) => {
                tracing::warn!(
                    "Remote fetch item failed, local state kept: id={}, error={}",
                    item_id,
                    e
                );
                return (
                    SyncState::Lagging {
                        reason: e.to_string(),
                    },
                    None,
                );
            }
        };

        let Some(remote) = fetched else {
            tracing::warn!("Item missing from remote store: id={}", item_id);
            return (
                SyncState::Lagging {
                    reason: format!("item {} missing from remote store", item_id),
                },
                None,
            );
        };
        let name = Some(remote.item_name.clone());

        if let Err(e) = remote.check(transition) {
            tracing::warn!("Remote item left unchanged: {}", e);
            return (
                SyncState::Lagging {
                    reason: e.to_string(),
                },
                name,
            );
        }

        let updated = remote.with_status(target, updater);
        let sync = self
            .mirror("update item", item_id, self.items.set_by_id(item_id, &updated))
            .await;
        (sync, name)
    }

    // ---- notifications ----

    /// Send a notification; on any failure append it to the local queue.
    async fn notify(&self, notification: Notification) -> Delivery {
        let err = match self.notifier.send(&notification).await {
            Ok(()) => return Delivery::Sent,
            Err(e) => e,
        };
        tracing::error!(
            "Failed to send notification, queueing locally: to={}, backend={}, error={}",
            notification.recipient_email,
            self.notifier.backend_tag(),
            err
        );

        let queued = QueuedNotification::from_failed(&notification);
        match self
            .cache
            .update(
                Collection::EmailNotifications,
                move |queue: &mut Vec<QueuedNotification>| queue.push(queued),
            )
            .await
        {
            Ok(()) => Delivery::Queued,
            Err(e) => {
                tracing::error!(
                    "Failed to queue notification: to={}, error={}",
                    notification.recipient_email,
                    e
                );
                Delivery::Dropped
            }
        }
    }

    /// Retry every queued notification. Delivered ones leave the queue;
    /// failed ones stay with their attempt count raised.
    pub async fn drain_notifications(&self) -> AppResult<DrainReport> {
        let queued: Vec<QueuedNotification> =
            self.cache.get(Collection::EmailNotifications).await;
        if queued.is_empty() {
            return Ok(DrainReport::default());
        }

        let mut delivered = Vec::new();
        let mut failed = Vec::new();
        for entry in &queued {
            match self.notifier.send(&entry.notification()).await {
                Ok(()) => delivered.push(entry.clone()),
                Err(e) => {
                    tracing::warn!(
                        "Queued notification still undeliverable: to={}, attempts={}, error={}",
                        entry.to,
                        entry.attempts,
                        e
                    );
                    failed.push(entry.clone());
                }
            }
        }

        let remaining = self
            .cache
            .update(
                Collection::EmailNotifications,
                |queue: &mut Vec<QueuedNotification>| {
                    for sent in &delivered {
                        if let Some(pos) = queue.iter().position(|q| q == sent) {
                            queue.remove(pos);
                        }
                    }
                    for entry in &failed {
                        if let Some(q) = queue.iter_mut().find(|q| *q == entry) {
                            q.attempts += 1;
                        }
                    }
                    queue.len()
                },
            )
            .await?;

        let report = DrainReport {
            attempted: queued.len(),
            delivered: delivered.len(),
            remaining,
        };
        tracing::info!(
            "Notification queue drained: attempted={}, delivered={}, remaining={}",
            report.attempted,
            report.delivered,
            report.remaining
        );
        Ok(report)
    }

    // ---- remote mirroring ----

    /// Await one remote write and fold its failure into a `SyncState`.
    async fn mirror<F>(&self, op: &str, id: &str, write: F) -> SyncState
    where
        F: Future<Output = AppResult<()>>,
    {
        match write.await {
            Ok(()) => SyncState::Mirrored,
            Err(e) => {
                tracing::warn!(
                    "Remote {} failed, local state kept: id={}, error={}",
                    op,
                    id,
                    e
                );
                SyncState::Lagging {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn upsert_item(items: &mut Vec<ItemModel>, item: ItemModel) {
    match items.iter_mut().find(|i| i.id == item.id) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}
