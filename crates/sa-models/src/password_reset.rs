//! Password reset token
//!
//! Table: password_reset_tokens (one row per email)

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordReset {
    pub email: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

impl PasswordReset {
    /// Lifetime of a reset token
    pub fn lifetime() -> Duration {
        Duration::hours(1)
    }

    pub fn new(email: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            token: token.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > Self::lifetime()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let mut reset = PasswordReset::new("alice@x", "t");
        let now = Utc::now();
        assert!(!reset.is_expired_at(now));

        reset.created_at = now - Duration::minutes(59);
        assert!(!reset.is_expired_at(now));

        reset.created_at = now - Duration::minutes(61);
        assert!(reset.is_expired_at(now));
    }
}
