pub mod claim;
pub mod item;
pub mod notification;

pub use claim::*;
pub use item::*;
pub use notification::*;

/// Audit name recorded for records created through the public report/claim forms.
pub const LOCAL_USER: &str = "local-user";

/// Audit name recorded for administrator actions.
pub const ADMIN_USER: &str = "admin";

/// Current time as integer epoch seconds encoded as a string (audit field format).
pub fn epoch_now() -> String {
    chrono::Utc::now().timestamp().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_now_is_integer_seconds() {
        let now = epoch_now();
        let secs: i64 = now.parse().unwrap();
        assert!(secs > 1_600_000_000);
    }
}
