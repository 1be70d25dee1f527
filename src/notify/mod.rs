// Outgoing email delivery

pub mod mail;

pub use mail::MailRelayNotifier;

use crate::error::AppResult;
use crate::models::Notification;

/// Best-effort delivery of one notification.
///
/// Implementations reject an invalid notification (no recipient, or neither
/// subject nor body) with `AppError::InvalidInput` before attempting delivery.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> AppResult<()>;

    fn backend_tag(&self) -> &'static str;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};

    use tokio::sync::Mutex;

    use super::Notifier;
    use crate::error::{AppError, AppResult};
    use crate::models::Notification;

    /// Records every delivered notification; can be switched to fail.
    #[derive(Default)]
    pub struct RecordingNotifier {
        failing: AtomicBool,
        sent: Mutex<Vec<Notification>>,
        attempts: Mutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub async fn sent(&self) -> Vec<Notification> {
            self.sent.lock().await.clone()
        }

        pub async fn attempts(&self) -> Vec<Notification> {
            self.attempts.lock().await.clone()
        }
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, notification: &Notification) -> AppResult<()> {
            notification.validate()?;
            self.attempts.lock().await.push(notification.clone());
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::Notification("relay unreachable".to_string()));
            }
            self.sent.lock().await.push(notification.clone());
            Ok(())
        }

        fn backend_tag(&self) -> &'static str {
            "recording"
        }
    }
}
