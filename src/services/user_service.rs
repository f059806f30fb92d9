use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::Role,
    dto::admin::{ChangeRoleRequest, EmployeeList, UserList},
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_bootstrap},
    models::{Employee, User},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Roles the owner may hand out. `admin` is only reached by demotion of a
/// replaced owner or by seeding.
pub fn is_assignable(role: Role) -> bool {
    role != Role::Admin
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_owner_or_bootstrap(state, user).await?;
    let (page, limit, offset) = pagination.normalize();
    let finder = Users::find().order_by_desc(UserCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

/// Change a user's role.
///
/// Promoting someone to owner demotes every current owner one rank in the same
/// transaction, so the store never has two owners. The owner cannot be demoted
/// directly; ownership moves by promoting the successor.
pub async fn change_role(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: ChangeRoleRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_owner_or_bootstrap(state, user).await?;
    if !is_assignable(payload.role) {
        return Err(AppError::BadRequest("Invalid role".into()));
    }

    let txn = state.orm.begin().await?;
    let target = Users::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;
    let previous = target.role;

    if previous == Role::Owner && payload.role != Role::Owner {
        return Err(AppError::BadRequest(
            "Transfer ownership by promoting another user".into(),
        ));
    }

    let mut demoted = 0;
    if payload.role == Role::Owner && previous != Role::Owner {
        let result = Users::update_many()
            .col_expr(UserCol::Role, Expr::value(Role::Owner.demoted()))
            .col_expr(UserCol::UpdatedAt, Expr::value(Utc::now()))
            .filter(UserCol::Role.eq(Role::Owner))
            .filter(UserCol::Id.ne(id))
            .exec(&txn)
            .await?;
        demoted = result.rows_affected;
    }

    let mut active: UserActive = target.into();
    active.role = Set(payload.role);
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        target_id = %id,
        from = %previous,
        to = %payload.role,
        demoted_owners = demoted,
        by = %user.user_id,
        "role changed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "user_role_change",
        "users",
        serde_json::json!({ "user_id": id, "from": previous, "to": payload.role }),
    )
    .await;

    Ok(ApiResponse::success(
        "Role updated",
        User::from(updated),
        Some(Meta::empty()),
    ))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_owner_or_bootstrap(state, user).await?;
    if id == user.user_id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".into(),
        ));
    }

    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if target.role == Role::Owner {
        return Err(AppError::BadRequest("The owner cannot be deleted".into()));
    }

    Users::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "user_delete",
        "users",
        serde_json::json!({ "user_id": id, "email": target.email }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Public staff directory, highest rank first.
pub async fn list_employees(state: &AppState) -> AppResult<ApiResponse<EmployeeList>> {
    let mut items: Vec<Employee> = Users::find()
        .filter(UserCol::Role.ne(Role::Customer))
        .order_by_asc(UserCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Employee::from)
        .collect();
    // Role is stored as text, so rank ordering happens here.
    items.sort_by(|a, b| b.role.cmp(&a.role));

    Ok(ApiResponse::success(
        "Employees",
        EmployeeList { items },
        Some(Meta::empty()),
    ))
}
