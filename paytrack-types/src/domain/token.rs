//! Session credentials: JWT claims, refresh tokens and password-reset tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::{Role, UserId};

/// Identity claims embedded in a signed access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id).
    pub sub: UserId,
    pub email: String,
    pub role: Role,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiry (unix seconds).
    pub exp: i64,
}

/// Long-lived opaque credential exchanged for new access tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Single-use token that authorizes one password change.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordResetToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Redeemable only while unused and unexpired.
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        !self.used && !self.is_expired(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn reset_token(expires_in: Duration, used: bool) -> PasswordResetToken {
        let now = Utc::now();
        PasswordResetToken {
            id: Uuid::new_v4(),
            user_id: UserId::new(),
            token: "abc".into(),
            expires_at: now + expires_in,
            used,
            created_at: now,
        }
    }

    #[test]
    fn test_reset_token_redeemable() {
        let now = Utc::now();
        assert!(reset_token(Duration::hours(1), false).is_redeemable(now));
        assert!(!reset_token(Duration::hours(1), true).is_redeemable(now));
        assert!(!reset_token(Duration::seconds(-1), false).is_redeemable(now));
    }

    #[test]
    fn test_refresh_token_expiry() {
        let now = Utc::now();
        let token = RefreshToken {
            id: Uuid::new_v4(),
            user_id: UserId::new(),
            token: "t".into(),
            expires_at: now - Duration::seconds(1),
            created_at: now - Duration::days(7),
        };
        assert!(token.is_expired(now));
    }
}
