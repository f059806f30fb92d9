use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    domain::OrderStatus,
    models::{Order, PublicOrder, TrackingEvent},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// An order with its timeline, oldest event first.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub events: Vec<TrackingEvent>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingView {
    pub order: PublicOrder,
    pub events: Vec<TrackingEvent>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AppendTrackingEventRequest {
    /// Need not match the order's current status.
    pub status: OrderStatus,
    pub message: String,
    pub location: Option<String>,
}
