use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    entity::products::{ActiveModel, Column, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSort},
    state::AppState,
};

struct ProductFields<'a> {
    name: &'a str,
    brand: &'a str,
    category: &'a str,
    description: &'a str,
    price: i64,
    images: &'a [String],
    sizes: &'a [String],
    stock: i32,
}

fn validate(fields: &ProductFields<'_>) -> AppResult<()> {
    let blank = |s: &str| s.trim().is_empty();
    if blank(fields.name)
        || blank(fields.brand)
        || blank(fields.category)
        || blank(fields.description)
    {
        return Err(AppError::BadRequest("Invalid input".into()));
    }
    if fields.price < 0 || fields.stock < 0 {
        return Err(AppError::BadRequest("Price and stock must not be negative".into()));
    }
    if fields.images.iter().all(|s| blank(s)) || fields.sizes.iter().all(|s| blank(s)) {
        return Err(AppError::BadRequest(
            "At least one image and one size are required".into(),
        ));
    }
    Ok(())
}

fn clean(list: Vec<String>) -> Vec<String> {
    list.into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Name).ilike(format!("%{search}%")));
    }
    if let Some(category) = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(Column::Category.eq(category));
    }

    let mut finder = Products::find().filter(condition);
    finder = match query.sort.unwrap_or_default() {
        ProductSort::PriceAsc => finder.order_by_asc(Column::Price),
        ProductSort::PriceDesc => finder.order_by_desc(Column::Price),
        ProductSort::Newest => finder.order_by_desc(Column::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

/// Same listing as the storefront, behind the staff gate.
pub async fn list_products_admin(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_staff(user)?;
    list_products(state, query).await
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(Product::from)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    let images = clean(payload.images);
    let sizes = clean(payload.sizes);
    validate(&ProductFields {
        name: &payload.name,
        brand: &payload.brand,
        category: &payload.category,
        description: &payload.description,
        price: payload.price,
        images: &images,
        sizes: &sizes,
        stock: payload.stock,
    })?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        brand: Set(payload.brand.trim().to_string()),
        category: Set(payload.category.trim().to_string()),
        description: Set(payload.description.trim().to_string()),
        price: Set(payload.price),
        images: Set(images),
        sizes: Set(sizes),
        stock: Set(payload.stock),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let name = payload.name.unwrap_or_else(|| existing.name.clone());
    let brand = payload.brand.unwrap_or_else(|| existing.brand.clone());
    let category = payload.category.unwrap_or_else(|| existing.category.clone());
    let description = payload.description.unwrap_or_else(|| existing.description.clone());
    let price = payload.price.unwrap_or(existing.price);
    let images = clean(payload.images.unwrap_or_else(|| existing.images.clone()));
    let sizes = clean(payload.sizes.unwrap_or_else(|| existing.sizes.clone()));
    let stock = payload.stock.unwrap_or(existing.stock);
    validate(&ProductFields {
        name: &name,
        brand: &brand,
        category: &category,
        description: &description,
        price,
        images: &images,
        sizes: &sizes,
        stock,
    })?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(name.trim().to_string());
    active.brand = Set(brand.trim().to_string());
    active.category = Set(category.trim().to_string());
    active.description = Set(description.trim().to_string());
    active.price = Set(price);
    active.images = Set(images);
    active.sizes = Set(sizes);
    active.stock = Set(stock);
    active.updated_at = Set(Utc::now().into());
    let product = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}
