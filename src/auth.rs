use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// Static shared-secret check guarding the administrator actions.
#[derive(Clone)]
pub struct AdminGate {
    digest: Option<[u8; 32]>,
}

impl AdminGate {
    /// A gate with no configured password rejects every login.
    pub fn new(password: Option<&str>) -> Self {
        Self {
            digest: password.filter(|p| !p.is_empty()).map(digest),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.digest.is_some()
    }

    pub fn verify(&self, password: &str) -> AppResult<()> {
        if password.is_empty() {
            return Err(AppError::Unauthorized("Please enter a password".to_string()));
        }
        let expected = self
            .digest
            .ok_or_else(|| AppError::Unauthorized("admin login is not configured".to_string()))?;
        // Compare digests so the comparison length is fixed.
        let given = digest(password);
        let diff = expected
            .iter()
            .zip(given.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if diff == 0 {
            tracing::info!("Admin login succeeded");
            Ok(())
        } else {
            tracing::warn!("Admin login rejected");
            Err(AppError::Unauthorized("Invalid password".to_string()))
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    hasher.finalize().into()
}
