use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};

use crate::{
    dto::checkout::{CheckoutSessionResponse, CreateCheckoutSessionRequest, WebhookAck},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    services::{checkout_service, webhook_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/create-session", post(create_session))
}

pub fn webhook_router() -> Router<AppState> {
    Router::new()
        .route("/payment-confirmed", post(payment_confirmed))
        .route("/stripe", post(payment_confirmed))
}

#[utoipa::path(
    post,
    path = "/api/checkout/create-session",
    request_body = CreateCheckoutSessionRequest,
    responses(
        (status = 200, description = "Hosted payment page created", body = ApiResponse<CheckoutSessionResponse>),
        (status = 400, description = "Invalid items or insufficient stock"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCheckoutSessionRequest>,
) -> AppResult<Json<ApiResponse<CheckoutSessionResponse>>> {
    let resp = checkout_service::create_checkout_session(&state, &user, payload).await?;
    Ok(Json(resp))
}

/// The raw body is needed as sent; signature verification runs over the bytes.
#[utoipa::path(
    post,
    path = "/api/webhooks/payment-confirmed",
    request_body(content = String, description = "Payment processor event", content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Missing or invalid signature")
    ),
    tag = "Checkout"
)]
pub async fn payment_confirmed(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<ApiResponse<WebhookAck>>> {
    let resp = webhook_service::handle(&state, &headers, &body).await?;
    Ok(Json(resp))
}
