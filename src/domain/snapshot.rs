use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub const MAX_QUANTITY: i32 = 20;

/// One cart line as submitted at checkout and echoed back by the payment processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RequestedItem {
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// The catalog facts copied into an order at confirmation time.
#[derive(Debug, Clone)]
pub struct ProductFacts {
    pub name: String,
    pub image: String,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSnapshot {
    pub product_id: Uuid,
    pub name: String,
    pub image: String,
    pub size: Option<String>,
    pub unit_price: i64,
    pub quantity: i32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("no items")]
    Empty,
    #[error("product {0} no longer exists")]
    MissingProduct(Uuid),
    #[error("invalid quantity for product {0}")]
    InvalidQuantity(Uuid),
    #[error("order total overflows")]
    Overflow,
}

pub fn validate_quantities(items: &[RequestedItem]) -> Result<(), SnapshotError> {
    if items.is_empty() {
        return Err(SnapshotError::Empty);
    }
    match items
        .iter()
        .find(|item| !(1..=MAX_QUANTITY).contains(&item.quantity))
    {
        Some(bad) => Err(SnapshotError::InvalidQuantity(bad.product_id)),
        None => Ok(()),
    }
}

/// Copy name/image/price for every requested line and total them.
pub fn snapshot_lines(
    items: &[RequestedItem],
    catalog: &HashMap<Uuid, ProductFacts>,
) -> Result<(Vec<LineSnapshot>, i64), SnapshotError> {
    validate_quantities(items)?;

    let mut lines = Vec::with_capacity(items.len());
    let mut total: i64 = 0;
    for item in items {
        let facts = catalog
            .get(&item.product_id)
            .ok_or(SnapshotError::MissingProduct(item.product_id))?;
        let line_total = facts
            .price
            .checked_mul(i64::from(item.quantity))
            .ok_or(SnapshotError::Overflow)?;
        total = total.checked_add(line_total).ok_or(SnapshotError::Overflow)?;
        lines.push(LineSnapshot {
            product_id: item.product_id,
            name: facts.name.clone(),
            image: facts.image.clone(),
            size: item.size.clone(),
            unit_price: facts.price,
            quantity: item.quantity,
        });
    }

    Ok((lines, total))
}
