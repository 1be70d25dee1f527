use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::{epoch_now, LOCAL_USER};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Electronics,
    Books,
    Clothing,
    Accessories,
    Keys,
    Bags,
    SportsEquipment,
    #[default]
    Miscellaneous,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 8] = [
        ItemCategory::Electronics,
        ItemCategory::Books,
        ItemCategory::Clothing,
        ItemCategory::Accessories,
        ItemCategory::Keys,
        ItemCategory::Bags,
        ItemCategory::SportsEquipment,
        ItemCategory::Miscellaneous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemCategory::Electronics => "electronics",
            ItemCategory::Books => "books",
            ItemCategory::Clothing => "clothing",
            ItemCategory::Accessories => "accessories",
            ItemCategory::Keys => "keys",
            ItemCategory::Bags => "bags",
            ItemCategory::SportsEquipment => "sports_equipment",
            ItemCategory::Miscellaneous => "miscellaneous",
        }
    }

    /// Human-readable label shown next to an item.
    pub fn label(&self) -> &'static str {
        match self {
            ItemCategory::Electronics => "Electronics",
            ItemCategory::Books => "Books",
            ItemCategory::Clothing => "Clothing",
            ItemCategory::Accessories => "Accessories",
            ItemCategory::Keys => "Keys",
            ItemCategory::Bags => "Bags",
            ItemCategory::SportsEquipment => "Sports Equipment",
            ItemCategory::Miscellaneous => "Miscellaneous",
        }
    }
}

impl FromStr for ItemCategory {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| AppError::InvalidInput(format!("unknown item category '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Active,
    Claimed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Active => "active",
            ItemStatus::Claimed => "claimed",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "active" => Ok(ItemStatus::Active),
            "claimed" => Ok(ItemStatus::Claimed),
            other => Err(AppError::InvalidInput(format!(
                "unknown item status '{}'",
                other
            ))),
        }
    }
}

/// Every edge of the item lifecycle.
///
/// `Pending` is reached twice: once after a report (awaiting review) and once
/// after a claim request (held for pickup). The transition names keep the two
/// apart; the status value alone does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemTransition {
    Approve,
    Decline,
    RequestClaim,
    ApproveClaim,
    DeclineClaim,
    Remove,
}

impl ItemTransition {
    pub fn from_status(&self) -> ItemStatus {
        match self {
            ItemTransition::Approve | ItemTransition::Decline => ItemStatus::Pending,
            ItemTransition::RequestClaim | ItemTransition::Remove => ItemStatus::Active,
            ItemTransition::ApproveClaim | ItemTransition::DeclineClaim => ItemStatus::Pending,
        }
    }

    /// Status after the transition; `None` means the record is erased.
    pub fn to_status(&self) -> Option<ItemStatus> {
        match self {
            ItemTransition::Approve => Some(ItemStatus::Active),
            ItemTransition::RequestClaim => Some(ItemStatus::Pending),
            ItemTransition::ApproveClaim => Some(ItemStatus::Claimed),
            ItemTransition::DeclineClaim => Some(ItemStatus::Active),
            ItemTransition::Decline | ItemTransition::Remove => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ItemTransition::Approve => "approve",
            ItemTransition::Decline => "decline",
            ItemTransition::RequestClaim => "request_claim",
            ItemTransition::ApproveClaim => "approve_claim",
            ItemTransition::DeclineClaim => "decline_claim",
            ItemTransition::Remove => "remove",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemModel {
    pub id: String,
    pub item_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: ItemCategory,
    pub date_found: String,
    pub location_found: String,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub finder_name: Option<String>,
    #[serde(default)]
    pub finder_email: Option<String>,
    pub status: ItemStatus,
    pub data_creator: String,
    pub data_updater: String,
    pub create_time: String,
    pub update_time: String,
}

impl ItemModel {
    /// Build a freshly reported item with a generated identifier.
    pub fn reported(new: NewItem) -> Self {
        let now = epoch_now();
        Self {
            id: format!("item-{}", Uuid::new_v4()),
            item_name: new.item_name,
            description: non_empty(new.description),
            category: new.category,
            date_found: new.date_found,
            location_found: new.location_found,
            photo_url: non_empty(new.photo_url),
            finder_name: non_empty(new.finder_name),
            finder_email: non_empty(new.finder_email),
            status: ItemStatus::Pending,
            data_creator: LOCAL_USER.to_string(),
            data_updater: LOCAL_USER.to_string(),
            create_time: now.clone(),
            update_time: now,
        }
    }

    /// Reject a transition whose source status does not match.
    pub fn check(&self, transition: ItemTransition) -> AppResult<()> {
        if self.status == transition.from_status() {
            Ok(())
        } else {
            Err(AppError::InvalidTransition(format!(
                "cannot {} item {} in status {}",
                transition.name(),
                self.id,
                self.status
            )))
        }
    }

    /// Copy of this item with the given status and refreshed audit fields.
    pub fn with_status(&self, status: ItemStatus, updater: &str) -> Self {
        Self {
            status,
            data_updater: updater.to_string(),
            update_time: epoch_now(),
            ..self.clone()
        }
    }

    pub fn apply_edits(&mut self, edits: ItemEdits) {
        if let Some(name) = edits.item_name {
            self.item_name = name;
        }
        if let Some(description) = edits.description {
            self.description = non_empty(Some(description));
        }
        if let Some(category) = edits.category {
            self.category = category;
        }
        if let Some(location) = edits.location_found {
            self.location_found = location;
        }
    }
}

/// Fields a finder submits; identifier, status and audit fields are assigned on report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItem {
    pub item_name: String,
    pub description: Option<String>,
    pub category: ItemCategory,
    pub date_found: String,
    pub location_found: String,
    pub photo_url: Option<String>,
    pub finder_name: Option<String>,
    pub finder_email: Option<String>,
}

/// Corrections an administrator may make while approving a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemEdits {
    pub item_name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ItemCategory>,
    pub location_found: Option<String>,
}

impl ItemEdits {
    pub fn is_empty(&self) -> bool {
        self.item_name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.location_found.is_none()
    }
}

/// Row shape of the `lost_items` table.
#[derive(Debug, Clone, FromRow)]
pub struct ItemRow {
    pub id: String,
    pub item_name: String,
    pub description: Option<String>,
    pub category: String,
    pub date_found: String,
    pub location_found: String,
    pub photo_url: Option<String>,
    pub finder_name: Option<String>,
    pub finder_email: Option<String>,
    pub status: String,
    pub data_creator: String,
    pub data_updater: String,
    pub create_time: String,
    pub update_time: String,
}

impl TryFrom<ItemRow> for ItemModel {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(ItemModel {
            category: row.category.parse()?,
            status: row.status.parse()?,
            id: row.id,
            item_name: row.item_name,
            description: row.description,
            date_found: row.date_found,
            location_found: row.location_found,
            photo_url: row.photo_url,
            finder_name: row.finder_name,
            finder_email: row.finder_email,
            data_creator: row.data_creator,
            data_updater: row.data_updater,
            create_time: row.create_time,
            update_time: row.update_time,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backpack() -> NewItem {
        NewItem {
            item_name: "Blue Backpack".to_string(),
            category: ItemCategory::Bags,
            date_found: "2024-01-10".to_string(),
            location_found: "Gym".to_string(),
            finder_email: Some(String::new()),
            ..Default::default()
        }
    }

    #[test]
    fn test_reported_item_is_pending_with_unique_id() {
        let a = ItemModel::reported(backpack());
        let b = ItemModel::reported(backpack());
        assert_eq!(a.status, ItemStatus::Pending);
        assert!(a.id.starts_with("item-"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.finder_email, None);
        assert_eq!(a.data_creator, LOCAL_USER);
    }

    #[test]
    fn test_transitions_follow_lifecycle() {
        let item = ItemModel::reported(backpack());
        assert!(item.check(ItemTransition::Approve).is_ok());
        assert!(item.check(ItemTransition::RequestClaim).is_err());
        assert!(item.check(ItemTransition::Remove).is_err());

        let active = item.with_status(ItemStatus::Active, "admin");
        assert!(active.check(ItemTransition::RequestClaim).is_ok());
        assert!(active.check(ItemTransition::ApproveClaim).is_err());

        let claimed = active.with_status(ItemStatus::Claimed, "admin");
        for t in [
            ItemTransition::Approve,
            ItemTransition::Decline,
            ItemTransition::RequestClaim,
            ItemTransition::ApproveClaim,
            ItemTransition::DeclineClaim,
            ItemTransition::Remove,
        ] {
            assert!(claimed.check(t).is_err(), "claimed item accepted {:?}", t);
        }
    }

    #[test]
    fn test_category_round_trips_through_str() {
        for category in ItemCategory::ALL {
            assert_eq!(category.as_str().parse::<ItemCategory>().unwrap(), category);
        }
        assert!("furniture".parse::<ItemCategory>().is_err());
    }

    #[test]
    fn test_apply_edits() {
        let mut item = ItemModel::reported(backpack());
        item.apply_edits(ItemEdits {
            item_name: Some("Navy Backpack".to_string()),
            location_found: Some("Gym bleachers".to_string()),
            ..Default::default()
        });
        assert_eq!(item.item_name, "Navy Backpack");
        assert_eq!(item.location_found, "Gym bleachers");
        assert_eq!(item.category, ItemCategory::Bags);
    }

    #[test]
    fn test_cached_json_shape() {
        let item = ItemModel::reported(backpack());
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["category"], "bags");
        assert_eq!(json["item_name"], "Blue Backpack");
    }
}
