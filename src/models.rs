use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::{OrderStatus, PaymentStatus, Role};
use crate::entity::{
    announcements, audit_logs, order_items, orders, products, tracking_events, users,
};

/// Account as shown to its owner and to staff. Credentials never leave the server.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub description: String,
    pub price: i64,
    pub images: Vec<String>,
    pub sizes: Vec<String>,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    pub size: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub items: Vec<OrderItem>,
    pub amount_total: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    pub tracking_id: String,
    pub customer_email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What an anonymous tracking lookup may see.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PublicOrder {
    pub tracking_id: String,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub amount_total: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TrackingEvent {
    pub id: Uuid,
    pub seq: i32,
    pub tracking_id: String,
    pub status: OrderStatus,
    pub message: String,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public staff directory entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Employee {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub action: String,
    pub resource: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            role: model.role,
            email_verified: model.email_verified,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<users::Model> for Employee {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            role: model.role,
        }
    }
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            brand: model.brand,
            category: model.category,
            description: model.description,
            price: model.price,
            images: model.images,
            sizes: model.sizes,
            stock: model.stock,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            product_id: model.product_id,
            name: model.name,
            image: model.image,
            size: model.size,
            unit_price: model.unit_price,
            quantity: model.quantity,
        }
    }
}

impl Order {
    pub fn from_parts(model: orders::Model, items: Vec<order_items::Model>) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            items: items.into_iter().map(OrderItem::from).collect(),
            amount_total: model.amount_total,
            currency: model.currency,
            payment_status: model.payment_status,
            status: model.status,
            tracking_id: model.tracking_id,
            customer_email: model.customer_email,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<Order> for PublicOrder {
    fn from(order: Order) -> Self {
        Self {
            tracking_id: order.tracking_id,
            status: order.status,
            items: order.items,
            amount_total: order.amount_total,
            currency: order.currency,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<tracking_events::Model> for TrackingEvent {
    fn from(model: tracking_events::Model) -> Self {
        Self {
            id: model.id,
            seq: model.seq,
            tracking_id: model.tracking_id,
            status: model.status,
            message: model.message,
            location: model.location,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<announcements::Model> for Announcement {
    fn from(model: announcements::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            message: model.message,
            active: model.active,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<audit_logs::Model> for AuditEntry {
    fn from(model: audit_logs::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            action: model.action,
            resource: model.resource,
            metadata: model.metadata,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
