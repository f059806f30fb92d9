use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderDetail, OrderList, TrackingView},
    error::AppResult,
    middleware::{auth::AuthUser, tracking_rate_limiter},
    response::ApiResponse,
    routes::params::Pagination,
    services::{order_service, tracking_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/my", get(list_my_orders))
        .route("/{id}", get(get_my_order))
}

pub fn tracking_router(trust_proxy_headers: bool) -> anyhow::Result<Router<AppState>> {
    Ok(Router::new()
        .route("/{tracking_id}", get(track_order))
        .layer(tracking_rate_limiter(trust_proxy_headers)?))
}

#[utoipa::path(
    get,
    path = "/api/orders/my",
    params(Pagination),
    responses(
        (status = 200, description = "The caller's orders, newest first", body = ApiResponse<OrderList>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_my_orders(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its timeline", body = ApiResponse<OrderDetail>),
        (status = 403, description = "Order belongs to another account"),
        (status = 404, description = "Not Found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_my_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = order_service::get_my_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tracking/{tracking_id}",
    params(("tracking_id" = String, Path, description = "Ten-character tracking id, case-insensitive")),
    responses(
        (status = 200, description = "Public order view with its timeline", body = ApiResponse<TrackingView>),
        (status = 404, description = "Not Found"),
        (status = 429, description = "Too many lookups")
    ),
    tag = "Tracking"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> AppResult<Json<ApiResponse<TrackingView>>> {
    let resp = tracking_service::track(&state, &tracking_id).await?;
    Ok(Json(resp))
}
