use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

pub const VERIFICATION_TTL_HOURS: i64 = 24;
pub const RESET_TTL_HOURS: i64 = 1;
pub const MIN_TOKEN_LEN: usize = 20;

/// A single-use token. Only `hash` is persisted; `raw` goes out by email.
#[derive(Debug, Clone)]
pub struct OneTimeToken {
    pub raw: String,
    pub hash: String,
    pub expires_at: DateTime<Utc>,
}

impl OneTimeToken {
    pub fn issue(ttl: Duration) -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill(&mut bytes);
        let raw = hex::encode(bytes);
        let hash = hash_token(&raw);
        Self {
            raw,
            hash,
            expires_at: Utc::now() + ttl,
        }
    }
}

pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_hash_matches_raw() {
        let token = OneTimeToken::issue(Duration::hours(VERIFICATION_TTL_HOURS));
        assert_eq!(token.raw.len(), 64);
        assert_ne!(token.raw, token.hash);
        assert_eq!(hash_token(&token.raw), token.hash);
        assert!(token.expires_at > Utc::now());
    }

    #[test]
    fn hash_is_stable_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
