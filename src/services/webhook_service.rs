use axum::http::HeaderMap;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    domain::snapshot::RequestedItem,
    dto::checkout::WebhookAck,
    error::{AppError, AppResult},
    integrations::webhook::{
        CHECKOUT_COMPLETED, CompletedSession, SIGNATURE_HEADER, WebhookEvent, verify_signature,
    },
    response::{ApiResponse, Meta},
    services::{
        checkout_service::{METADATA_ITEMS, METADATA_USER_ID},
        order_service::{ConfirmOutcome, ConfirmPayment, confirm_order},
    },
    state::AppState,
};

fn ack() -> ApiResponse<WebhookAck> {
    ApiResponse::success("Received", WebhookAck { received: true }, Some(Meta::empty()))
}

/// Pull what order creation needs out of a completed checkout session.
pub fn confirmation_from(session: CompletedSession) -> Result<ConfirmPayment, String> {
    let user_id = session
        .metadata
        .get(METADATA_USER_ID)
        .ok_or("missing user id")?
        .parse::<Uuid>()
        .map_err(|e| format!("bad user id: {e}"))?;
    let raw_items = session
        .metadata
        .get(METADATA_ITEMS)
        .ok_or("missing items")?;
    let items: Vec<RequestedItem> =
        serde_json::from_str(raw_items).map_err(|e| format!("bad items: {e}"))?;

    let customer_email = session.customer_email();
    Ok(ConfirmPayment {
        payment_session_id: session.id,
        user_id,
        items,
        currency: session.currency,
        customer_email,
    })
}

/// Authenticate and act on a payment processor notification.
///
/// Anything that passes signature verification is acknowledged, including
/// events we ignore and sessions we cannot turn into an order; the processor
/// would otherwise keep redelivering them.
pub async fn handle(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
) -> AppResult<ApiResponse<WebhookAck>> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Webhooks are not configured".into()))?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing signature".into()))?;

    verify_signature(body, signature, secret, Utc::now().timestamp()).map_err(|e| {
        tracing::warn!(error = %e, "rejected webhook");
        AppError::BadRequest("Invalid signature".into())
    })?;

    let event: WebhookEvent = serde_json::from_slice(body)
        .map_err(|_| AppError::BadRequest("Invalid payload".into()))?;
    if event.kind != CHECKOUT_COMPLETED {
        tracing::debug!(kind = %event.kind, "ignoring webhook event");
        return Ok(ack());
    }

    let session: CompletedSession = match serde_json::from_value(event.data.object) {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "unreadable checkout session");
            return Ok(ack());
        }
    };
    let session_id = session.id.clone();
    let confirmation = match confirmation_from(session) {
        Ok(c) => c,
        Err(reason) => {
            tracing::error!(%session_id, %reason, "checkout session without usable metadata");
            return Ok(ack());
        }
    };

    match confirm_order(state, confirmation).await {
        Ok(ConfirmOutcome::Created(order)) => {
            tracing::info!(%session_id, order_id = %order.id, "payment confirmed");
        }
        Ok(ConfirmOutcome::AlreadyRecorded { order_id }) => {
            tracing::info!(%session_id, ?order_id, "duplicate payment notification");
        }
        Err(e) => {
            tracing::error!(%session_id, error = ?e, "order creation failed");
        }
    }
    Ok(ack())
}
