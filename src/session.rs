use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::{
    domain::SessionMode,
    dto::auth::Claims,
    error::{AppError, AppResult},
};

/// Signs and verifies session credentials. Built once from config and shared.
#[derive(Clone)]
pub struct SessionKeys {
    inner: Arc<Keys>,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

/// The identity a verified credential vouches for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub session_mode: SessionMode,
}

impl SessionKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret.as_bytes()),
                decoding: DecodingKey::from_secret(secret.as_bytes()),
                ttl,
            }),
        }
    }

    pub fn issue(&self, user_id: Uuid, session_mode: SessionMode) -> AppResult<String> {
        self.issue_at(user_id, session_mode, Utc::now())
    }

    fn issue_at(
        &self,
        user_id: Uuid,
        session_mode: SessionMode,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        let expiration = now
            .checked_add_signed(self.inner.ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

        let claims = Claims {
            sub: user_id.to_string(),
            session_mode,
            iat: now.timestamp() as usize,
            exp: expiration.timestamp() as usize,
        };

        encode(&Header::default(), &claims, &self.inner.encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    /// Signature or expiry failures, and malformed subjects, are all `Unauthorized`.
    pub fn verify(&self, token: &str) -> AppResult<SessionClaims> {
        let decoded = decode::<Claims>(token, &self.inner.decoding, &Validation::default())
            .map_err(|_| AppError::Unauthorized)?;
        let user_id = Uuid::parse_str(&decoded.claims.sub).map_err(|_| AppError::Unauthorized)?;
        Ok(SessionClaims {
            user_id,
            session_mode: decoded.claims.session_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> SessionKeys {
        SessionKeys::new("unit-test-secret-0123456789abcdef", Duration::hours(1))
    }

    #[test]
    fn issued_credential_carries_user_and_mode() {
        let keys = keys();
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, SessionMode::Admin).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.session_mode, SessionMode::Admin);
    }

    #[test]
    fn expired_credential_is_rejected() {
        let keys = keys();
        let issued = Utc::now() - Duration::hours(3);
        let token = keys
            .issue_at(Uuid::new_v4(), SessionMode::Customer, issued)
            .unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn credential_signed_with_other_secret_is_rejected() {
        let other = SessionKeys::new("another-secret-entirely-9876543210", Duration::hours(1));
        let token = other.issue(Uuid::new_v4(), SessionMode::Customer).unwrap();
        assert!(matches!(keys().verify(&token), Err(AppError::Unauthorized)));
        assert!(matches!(keys().verify("not-a-jwt"), Err(AppError::Unauthorized)));
    }
}
