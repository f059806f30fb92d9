use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::{
    domain::tracking_id,
    dto::orders::TrackingView,
    entity::orders::{Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    models::{Order, PublicOrder},
    response::{ApiResponse, Meta},
    services::order_service::{load_events, load_items},
    state::AppState,
};

/// Public lookup by tracking id. Identifiers that cannot exist and unknown
/// ones answer the same way.
pub async fn track(state: &AppState, raw_id: &str) -> AppResult<ApiResponse<TrackingView>> {
    let tracking_id = tracking_id::normalize(raw_id).ok_or(AppError::NotFound)?;

    let order = Orders::find()
        .filter(OrderCol::TrackingId.eq(tracking_id.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = load_items(&state.orm, order.id).await?;
    let events = load_events(&state.orm, order.id).await?;

    Ok(ApiResponse::success(
        "Tracking",
        TrackingView {
            order: PublicOrder::from(Order::from_parts(order, items)),
            events,
        },
        Some(Meta::empty()),
    ))
}
