use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::{epoch_now, ItemStatus, ItemTransition, LOCAL_USER};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Pending,
    Approved,
    Declined,
}

impl ClaimStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimStatus::Pending => "pending",
            ClaimStatus::Approved => "approved",
            ClaimStatus::Declined => "declined",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ClaimStatus::Pending)
    }
}

impl fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ClaimStatus::Pending),
            "approved" => Ok(ClaimStatus::Approved),
            "declined" => Ok(ClaimStatus::Declined),
            other => Err(AppError::InvalidInput(format!(
                "unknown claim status '{}'",
                other
            ))),
        }
    }
}

/// Administrator decision on a pending pickup request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimDecision {
    Approve,
    Decline,
}

impl ClaimDecision {
    pub fn claim_status(&self) -> ClaimStatus {
        match self {
            ClaimDecision::Approve => ClaimStatus::Approved,
            ClaimDecision::Decline => ClaimStatus::Declined,
        }
    }

    pub fn item_transition(&self) -> ItemTransition {
        match self {
            ClaimDecision::Approve => ItemTransition::ApproveClaim,
            ClaimDecision::Decline => ItemTransition::DeclineClaim,
        }
    }

    pub fn item_status(&self) -> ItemStatus {
        match self {
            ClaimDecision::Approve => ItemStatus::Claimed,
            ClaimDecision::Decline => ItemStatus::Active,
        }
    }

    /// Past-tense verb used in notification text ("approved"/"declined").
    pub fn verb(&self) -> &'static str {
        match self {
            ClaimDecision::Approve => "approved",
            ClaimDecision::Decline => "declined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimModel {
    pub id: String,
    pub item_id: String,
    pub student_name: String,
    pub student_id: String,
    pub student_email: String,
    pub grade: String,
    pub homeroom_teacher: String,
    pub pickup_time_slot: String,
    pub claim_status: ClaimStatus,
    pub data_creator: String,
    pub data_updater: String,
    pub create_time: String,
    pub update_time: String,
}

impl ClaimModel {
    pub fn requested(item_id: &str, new: NewClaim) -> Self {
        let now = epoch_now();
        Self {
            id: format!("claim-{}", Uuid::new_v4()),
            item_id: item_id.to_string(),
            student_name: new.student_name,
            student_id: new.student_id,
            student_email: new.student_email,
            grade: new.grade,
            homeroom_teacher: new.homeroom_teacher,
            pickup_time_slot: new.pickup_time_slot,
            claim_status: ClaimStatus::Pending,
            data_creator: LOCAL_USER.to_string(),
            data_updater: LOCAL_USER.to_string(),
            create_time: now.clone(),
            update_time: now,
        }
    }

    /// Resolve a pending claim. Approved and declined claims are final.
    pub fn resolved(&self, decision: ClaimDecision, updater: &str) -> AppResult<Self> {
        if self.claim_status.is_terminal() {
            return Err(AppError::InvalidTransition(format!(
                "claim {} is already {}",
                self.id, self.claim_status
            )));
        }
        Ok(Self {
            claim_status: decision.claim_status(),
            data_updater: updater.to_string(),
            update_time: epoch_now(),
            ..self.clone()
        })
    }
}

/// Student-supplied pickup request fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewClaim {
    pub student_name: String,
    pub student_id: String,
    pub student_email: String,
    pub grade: String,
    pub homeroom_teacher: String,
    pub pickup_time_slot: String,
}

/// Row shape of the `claims` table.
#[derive(Debug, Clone, FromRow)]
pub struct ClaimRow {
    pub id: String,
    pub item_id: String,
    pub student_name: String,
    pub student_id: String,
    pub student_email: String,
    pub grade: String,
    pub homeroom_teacher: String,
    pub pickup_time_slot: String,
    pub claim_status: String,
    pub data_creator: String,
    pub data_updater: String,
    pub create_time: String,
    pub update_time: String,
}

impl TryFrom<ClaimRow> for ClaimModel {
    type Error = AppError;

    fn try_from(row: ClaimRow) -> Result<Self, Self::Error> {
        Ok(ClaimModel {
            claim_status: row.claim_status.parse()?,
            id: row.id,
            item_id: row.item_id,
            student_name: row.student_name,
            student_id: row.student_id,
            student_email: row.student_email,
            grade: row.grade,
            homeroom_teacher: row.homeroom_teacher,
            pickup_time_slot: row.pickup_time_slot,
            data_creator: row.data_creator,
            data_updater: row.data_updater,
            create_time: row.create_time,
            update_time: row.update_time,
        })
    }
}
