use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set,
};
use uuid::Uuid;

use crate::{
    dto::wishlist::WishlistProducts,
    entity::{
        products::{self, Entity as Products},
        wishlist_items::{ActiveModel as WishlistActive, Column as WishCol, Entity as WishlistItems},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

async fn current_list(state: &AppState, user_id: Uuid) -> AppResult<WishlistProducts> {
    let items = Products::find()
        .join(JoinType::InnerJoin, products::Relation::WishlistItems.def())
        .filter(WishCol::UserId.eq(user_id))
        .order_by_desc(WishCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();
    Ok(WishlistProducts { items })
}

pub async fn list_wishlist(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<WishlistProducts>> {
    let data = current_list(state, user.user_id).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Adding a product twice leaves a single entry.
pub async fn add_to_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<WishlistProducts>> {
    if Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound);
    }

    let item = WishlistActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(product_id),
        created_at: NotSet,
    };
    WishlistItems::insert(item)
        .on_conflict(
            OnConflict::columns([WishCol::UserId, WishCol::ProductId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&state.orm)
        .await?;

    let data = current_list(state, user.user_id).await?;
    Ok(ApiResponse::success("Added to wishlist", data, Some(Meta::empty())))
}

pub async fn remove_from_wishlist(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<WishlistProducts>> {
    WishlistItems::delete_many()
        .filter(WishCol::UserId.eq(user.user_id))
        .filter(WishCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    let data = current_list(state, user.user_id).await?;
    Ok(ApiResponse::success("Removed from wishlist", data, Some(Meta::empty())))
}
