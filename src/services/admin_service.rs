use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{Role, order_status::status_change_message},
    dto::{
        admin::{AuditList, DashboardCounts, UserList},
        orders::{AppendTrackingEventRequest, OrderDetail, OrderList, UpdateOrderStatusRequest},
    },
    entity::{
        audit_logs::{Column as AuditCol, Entity as AuditLogs},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::Entity as Products,
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_role, ensure_staff},
    models::{AuditEntry, TrackingEvent, User},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination},
    services::order_service::{append_event, load_detail, with_items},
    state::AppState,
};

pub const MAX_LOCATION_LEN: usize = 200;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_items(&state.orm, orders).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_staff(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let detail = load_detail(&state.orm, order).await?;
    Ok(ApiResponse::success("Order found", detail, Some(Meta::empty())))
}

/// Move an order to `payload.status` and record the change on its timeline.
///
/// Whether the move is allowed is decided by the configured transition policy.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_staff(user)?;
    let txn = state.orm.begin().await?;

    let existing = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let from = existing.status;
    state
        .config
        .transition_policy
        .check(from, payload.status)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    append_event(
        &txn,
        &order,
        payload.status,
        status_change_message(payload.status),
        None,
    )
    .await?;

    let detail = load_detail(&txn, order).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %id,
        %from,
        to = %payload.status,
        by = %user.user_id,
        "order status changed"
    );
    audit::record(
        &state.pool,
        user.user_id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": id, "from": from, "to": payload.status }),
    )
    .await;

    Ok(ApiResponse::success("Order updated", detail, Some(Meta::empty())))
}

/// Add a free-standing note to an order's timeline. The order itself is untouched.
pub async fn append_tracking_event(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AppendTrackingEventRequest,
) -> AppResult<ApiResponse<TrackingEvent>> {
    ensure_staff(user)?;
    let message = payload.message.trim().to_string();
    if message.is_empty() {
        return Err(AppError::BadRequest("Invalid input".into()));
    }
    let location = payload
        .location
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());
    if location.as_ref().is_some_and(|l| l.chars().count() > MAX_LOCATION_LEN) {
        return Err(AppError::BadRequest("Location is too long".into()));
    }

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let event = append_event(&txn, &order, payload.status, message, location).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        "tracking_event_append",
        "orders",
        serde_json::json!({ "order_id": id, "event_id": event.id, "status": event.status }),
    )
    .await;

    Ok(ApiResponse::success(
        "Tracking event added",
        TrackingEvent::from(event),
        Some(Meta::empty()),
    ))
}

pub async fn dashboard(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DashboardCounts>> {
    ensure_staff(user)?;
    let products = Products::find().count(&state.orm).await? as i64;
    let orders = Orders::find().count(&state.orm).await? as i64;
    let customers = Users::find()
        .filter(UserCol::Role.eq(Role::Customer))
        .count(&state.orm)
        .await? as i64;

    Ok(ApiResponse::success(
        "Dashboard",
        DashboardCounts {
            products,
            orders,
            customers,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_customers(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = pagination.normalize();
    let finder = Users::find()
        .filter(UserCol::Role.eq(Role::Customer))
        .order_by_desc(UserCol::CreatedAt);

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
    Ok(ApiResponse::success("Customers", UserList { items }, Some(meta)))
}

/// Recent staff mutations, newest first. Admins and the owner only.
pub async fn list_audit_logs(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<AuditList>> {
    ensure_role(user, Role::Admin)?;
    let (page, limit, offset) = pagination.normalize();
    let finder = AuditLogs::find().order_by_desc(AuditCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(AuditEntry::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Audit log", AuditList { items }, Some(meta)))
}
