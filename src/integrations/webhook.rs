//! Payment webhook authentication and payload shapes.

use std::collections::HashMap;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "stripe-signature";
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,
    #[error("signature timestamp outside tolerance")]
    Stale,
    #[error("signature mismatch")]
    Mismatch,
}

/// Check a `t=<unix>,v1=<hex>[,v1=<hex>...]` header against HMAC-SHA256 of
/// `"{t}.{payload}"`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    let signed_at: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if now.abs_diff(signed_at) > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(SignatureError::Stale);
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    let matched = candidates.iter().any(|candidate| {
        hex::decode(candidate)
            .map(|expected| mac.clone().verify_slice(&expected).is_ok())
            .unwrap_or(false)
    });
    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Header value for `payload`, as the provider would compute it.
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub struct CompletedSession {
    pub id: String,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub customer_details: Option<CustomerDetails>,
    pub customer_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
}

impl CompletedSession {
    pub fn customer_email(&self) -> Option<String> {
        self.customer_details
            .as_ref()
            .and_then(|details| details.email.clone())
            .or_else(|| self.customer_email.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_unit";

    #[test]
    fn valid_signature_is_accepted() {
        let body = br#"{"type":"checkout.session.completed"}"#;
        let header = sign(body, SECRET, 1_700_000_000).unwrap();
        assert_eq!(verify_signature(body, &header, SECRET, 1_700_000_100), Ok(()));
    }

    #[test]
    fn any_matching_v1_candidate_is_enough() {
        let body = b"{}";
        let good = sign(body, SECRET, 1_700_000_000).unwrap();
        let header = format!("{good},v1={}", "00".repeat(32));
        assert_eq!(verify_signature(body, &header, SECRET, 1_700_000_000), Ok(()));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign(b"{\"amount\":1}", SECRET, 1_700_000_000).unwrap();
        assert_eq!(
            verify_signature(b"{\"amount\":9}", &header, SECRET, 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(b"{\"amount\":1}", &header, "whsec_other", 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_and_malformed_headers_are_rejected() {
        let header = sign(b"{}", SECRET, 1_700_000_000).unwrap();
        assert_eq!(
            verify_signature(b"{}", &header, SECRET, 1_700_000_000 + 301),
            Err(SignatureError::Stale)
        );
        assert_eq!(
            verify_signature(b"{}", "v1=abcd", SECRET, 0),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature(b"{}", "t=12", SECRET, 12),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature(b"{}", "t=-9223372036854775808,v1=00", SECRET, 1_700_000_000),
            Err(SignatureError::Stale)
        );
        assert_eq!(
            verify_signature(b"{}", "t=9223372036854775807,v1=00", SECRET, -1),
            Err(SignatureError::Stale)
        );
    }

    #[test]
    fn completed_session_prefers_customer_details_email() {
        let session: CompletedSession = serde_json::from_value(serde_json::json!({
            "id": "cs_test_1",
            "currency": "USD",
            "metadata": { "user_id": "x", "items": "[]" },
            "customer_details": { "email": "buyer@example.com" },
            "customer_email": "fallback@example.com"
        }))
        .unwrap();
        assert_eq!(session.customer_email().as_deref(), Some("buyer@example.com"));
        assert_eq!(session.metadata.get("items").map(String::as_str), Some("[]"));
    }
}
