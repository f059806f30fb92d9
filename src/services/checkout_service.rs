use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    domain::snapshot::{
        ProductFacts, RequestedItem, SnapshotError, snapshot_lines, validate_quantities,
    },
    dto::checkout::{CheckoutSessionResponse, CreateCheckoutSessionRequest},
    entity::products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    error::{AppError, AppResult},
    integrations::payments::{CheckoutLine, CheckoutSessionRequest},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const METADATA_USER_ID: &str = "user_id";
pub const METADATA_ITEMS: &str = "items";
/// Stripe caps each metadata value at 500 characters.
pub const METADATA_VALUE_LIMIT: usize = 500;

/// Current catalog rows for every product referenced by `items`.
pub async fn load_catalog<C: ConnectionTrait>(
    conn: &C,
    items: &[RequestedItem],
) -> AppResult<HashMap<Uuid, ProductModel>> {
    let ids: Vec<Uuid> = items.iter().map(|i| i.product_id).collect();
    let rows = Products::find()
        .filter(ProdCol::Id.is_in(ids))
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(|p| (p.id, p)).collect())
}

pub fn facts(catalog: &HashMap<Uuid, ProductModel>) -> HashMap<Uuid, ProductFacts> {
    catalog
        .iter()
        .map(|(id, p)| {
            (
                *id,
                ProductFacts {
                    name: p.name.clone(),
                    image: p.images.first().cloned().unwrap_or_default(),
                    price: p.price,
                },
            )
        })
        .collect()
}

fn check_stock(items: &[RequestedItem], catalog: &HashMap<Uuid, ProductModel>) -> AppResult<()> {
    let mut wanted: HashMap<Uuid, i64> = HashMap::new();
    for item in items {
        *wanted.entry(item.product_id).or_default() += i64::from(item.quantity);
    }
    for (id, quantity) in wanted {
        let Some(product) = catalog.get(&id) else {
            continue;
        };
        if i64::from(product.stock) < quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for {}",
                product.name
            )));
        }
    }
    Ok(())
}

fn snapshot_error(err: SnapshotError) -> AppError {
    match err {
        SnapshotError::MissingProduct(_) => AppError::BadRequest("Product not found".into()),
        SnapshotError::Overflow => AppError::BadRequest("Order total is too large".into()),
        SnapshotError::Empty | SnapshotError::InvalidQuantity(_) => {
            AppError::BadRequest("Invalid input".into())
        }
    }
}

pub async fn create_checkout_session(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCheckoutSessionRequest,
) -> AppResult<ApiResponse<CheckoutSessionResponse>> {
    validate_quantities(&payload.items).map_err(snapshot_error)?;

    let catalog = load_catalog(&state.orm, &payload.items).await?;
    let (lines, _total) = snapshot_lines(&payload.items, &facts(&catalog)).map_err(snapshot_error)?;
    check_stock(&payload.items, &catalog)?;

    let items_json = serde_json::to_string(&payload.items)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    if items_json.len() > METADATA_VALUE_LIMIT {
        return Err(AppError::BadRequest(
            "Too many different items for a single checkout".into(),
        ));
    }
    let client_url = &state.config.client_url;
    let request = CheckoutSessionRequest {
        currency: state.config.currency.clone(),
        lines: lines
            .into_iter()
            .map(|line| CheckoutLine {
                name: line.name,
                image: Some(line.image).filter(|s| !s.is_empty()),
                unit_amount: line.unit_price,
                quantity: line.quantity,
            })
            .collect(),
        success_url: format!("{client_url}/account/orders?success=1"),
        cancel_url: format!("{client_url}/cart?canceled=1"),
        customer_email: Some(user.email.clone()),
        metadata: vec![
            (METADATA_USER_ID.to_string(), user.user_id.to_string()),
            (METADATA_ITEMS.to_string(), items_json),
        ],
    };

    let session = state
        .payments
        .create_checkout_session(request)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    let url = session.url.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("checkout session {} has no url", session.id))
    })?;

    tracing::info!(user_id = %user.user_id, session_id = %session.id, "checkout session created");
    Ok(ApiResponse::success(
        "Checkout session created",
        CheckoutSessionResponse {
            session_id: session.id,
            url,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn product(stock: i32) -> ProductModel {
        ProductModel {
            id: Uuid::new_v4(),
            name: "Court Classic".into(),
            brand: "Exporium".into(),
            category: "lifestyle".into(),
            description: "Leather low-top".into(),
            price: 9_900,
            images: vec!["https://img.example/court.jpg".into()],
            sizes: vec!["41".into(), "42".into()],
            stock,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn item(id: Uuid, quantity: i32) -> RequestedItem {
        RequestedItem {
            product_id: id,
            quantity,
            size: Some("42".into()),
        }
    }

    #[test]
    fn stock_is_summed_across_lines_of_the_same_product() {
        let p = product(3);
        let id = p.id;
        let catalog = HashMap::from([(id, p)]);
        assert!(check_stock(&[item(id, 2), item(id, 1)], &catalog).is_ok());
        assert!(matches!(
            check_stock(&[item(id, 2), item(id, 2)], &catalog),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn facts_use_the_first_image() {
        let p = product(1);
        let id = p.id;
        let facts = facts(&HashMap::from([(id, p)]));
        assert_eq!(facts[&id].image, "https://img.example/court.jpg");
        assert_eq!(facts[&id].price, 9_900);
    }

    #[test]
    fn unknown_products_are_client_errors() {
        assert!(matches!(
            snapshot_error(SnapshotError::MissingProduct(Uuid::new_v4())),
            AppError::BadRequest(_)
        ));
    }
}
