use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

use super::{epoch_now, ClaimDecision, ClaimModel, ItemModel};

/// An outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient_email: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// A recipient is required, and at least one of subject or body.
    pub fn validate(&self) -> AppResult<()> {
        if self.recipient_email.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "at least one recipient must be provided".to_string(),
            ));
        }
        if self.subject.trim().is_empty() && self.body.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "either subject or body must be provided".to_string(),
            ));
        }
        Ok(())
    }

    pub fn report_declined(item: &ItemModel, recipient: &str) -> Self {
        Self {
            recipient_email: recipient.to_string(),
            subject: "Lost & Found: Item Report Declined".to_string(),
            body: format!(
                "Automated Message. Your found item report for \"{}\" has been declined and will not be published. If you have questions, please contact the front desk.",
                item.item_name
            ),
        }
    }

    pub fn claim_resolved(claim: &ClaimModel, item_name: &str, decision: ClaimDecision) -> Self {
        let title = match decision {
            ClaimDecision::Approve => "Approved",
            ClaimDecision::Decline => "Declined",
        };
        Self {
            recipient_email: claim.student_email.clone(),
            subject: format!("Lost & Found: Pickup Request {}", title),
            body: format!(
                "Your request to pick up {} has been {}. This is an automated message. Do not reply.",
                item_name,
                decision.verb()
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
}

/// A notification whose delivery failed, kept in the local `email_notifications` queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedNotification {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub status: DeliveryStatus,
    #[serde(default)]
    pub queued_at: String,
    #[serde(default)]
    pub attempts: u32,
}

impl QueuedNotification {
    pub fn from_failed(notification: &Notification) -> Self {
        Self {
            to: notification.recipient_email.clone(),
            subject: notification.subject.clone(),
            body: notification.body.clone(),
            status: DeliveryStatus::Pending,
            queued_at: epoch_now(),
            attempts: 1,
        }
    }

    pub fn notification(&self) -> Notification {
        Notification {
            recipient_email: self.to.clone(),
            subject: self.subject.clone(),
            body: self.body.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewClaim;

    #[test]
    fn test_validate_requires_recipient_and_content() {
        let ok = Notification {
            recipient_email: "a@b.test".to_string(),
            subject: String::new(),
            body: "hello".to_string(),
        };
        assert!(ok.validate().is_ok());

        let no_recipient = Notification {
            recipient_email: " ".to_string(),
            ..ok.clone()
        };
        assert!(no_recipient.validate().is_err());

        let no_content = Notification {
            subject: String::new(),
            body: String::new(),
            ..ok
        };
        assert!(no_content.validate().is_err());
    }

    #[test]
    fn test_claim_resolved_text() {
        let claim = ClaimModel::requested(
            "item-1",
            NewClaim {
                student_email: "ada@school.test".to_string(),
                ..Default::default()
            },
        );
        let n = Notification::claim_resolved(&claim, "Blue Backpack", ClaimDecision::Decline);
        assert_eq!(n.recipient_email, "ada@school.test");
        assert_eq!(n.subject, "Lost & Found: Pickup Request Declined");
        assert!(n.body.contains("Blue Backpack has been declined"));
    }

    #[test]
    fn test_queued_shape() {
        let n = Notification {
            recipient_email: "a@b.test".to_string(),
            subject: "s".to_string(),
            body: "b".to_string(),
        };
        let queued = QueuedNotification::from_failed(&n);
        let json = serde_json::to_value(&queued).unwrap();
        assert_eq!(json["to"], "a@b.test");
        assert_eq!(json["status"], "pending");
        assert_eq!(queued.notification(), n);
    }
}
