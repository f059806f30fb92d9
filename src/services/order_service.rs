use std::collections::HashMap;

use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    domain::{
        OrderStatus, PaymentStatus,
        order_status::{CONFIRMATION_LOCATION, CONFIRMATION_MESSAGE},
        snapshot::{RequestedItem, snapshot_lines},
        tracking_id::{TRACKING_ID_ATTEMPTS, generate_tracking_id},
    },
    dto::orders::{OrderDetail, OrderList},
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        products::{Column as ProdCol, Entity as Products},
        tracking_events::{
            ActiveModel as EventActive, Column as EventCol, Entity as TrackingEvents,
            Model as EventModel,
        },
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, TrackingEvent},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::checkout_service::{facts, load_catalog},
    state::AppState,
};

const TRACKING_ID_CONSTRAINT: &str = "orders_tracking_id_unique";
const PAYMENT_SESSION_CONSTRAINT: &str = "orders_payment_session_unique";

/// A paid checkout, as reported by the payment processor.
#[derive(Debug, Clone)]
pub struct ConfirmPayment {
    pub payment_session_id: String,
    pub user_id: Uuid,
    pub items: Vec<RequestedItem>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
}

#[derive(Debug)]
pub enum ConfirmOutcome {
    Created(Order),
    /// The payment session already produced an order; nothing was written.
    AlreadyRecorded { order_id: Option<Uuid> },
}

fn violated_constraint(err: &DbErr) -> Option<String> {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => Some(detail),
        _ => None,
    }
}

async fn find_by_payment_session<C: ConnectionTrait>(
    conn: &C,
    session_id: &str,
) -> AppResult<Option<OrderModel>> {
    Ok(Orders::find()
        .filter(OrderCol::PaymentSessionId.eq(session_id))
        .one(conn)
        .await?)
}

/// Create the order for a paid checkout together with its first tracking event.
///
/// Line items are snapshotted from the current catalog. A product that has
/// disappeared since checkout fails the whole confirmation.
pub async fn confirm_order(state: &AppState, input: ConfirmPayment) -> AppResult<ConfirmOutcome> {
    confirm_order_with(state, input, generate_tracking_id).await
}

/// [`confirm_order`] drawing tracking ids from `next_tracking_id`. Each
/// collision with an existing order costs one of [`TRACKING_ID_ATTEMPTS`].
pub async fn confirm_order_with<F>(
    state: &AppState,
    input: ConfirmPayment,
    mut next_tracking_id: F,
) -> AppResult<ConfirmOutcome>
where
    F: FnMut() -> String,
{
    if let Some(existing) = find_by_payment_session(&state.orm, &input.payment_session_id).await? {
        return Ok(ConfirmOutcome::AlreadyRecorded {
            order_id: Some(existing.id),
        });
    }

    let owner = Users::find_by_id(input.user_id).one(&state.orm).await?;
    if owner.is_none() {
        tracing::warn!(
            user_id = %input.user_id,
            "paying user no longer exists; order kept without owner"
        );
    }

    let txn = state.orm.begin().await?;

    let catalog = load_catalog(&txn, &input.items).await?;
    let (lines, amount_total) = snapshot_lines(&input.items, &facts(&catalog))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let currency = input
        .currency
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| state.config.currency.clone());

    let mut created: Option<OrderModel> = None;
    for attempt in 1..=TRACKING_ID_ATTEMPTS {
        let tracking_id = next_tracking_id();
        let savepoint = txn.begin().await?;
        let insert = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner.as_ref().map(|u| u.id)),
            amount_total: Set(amount_total),
            currency: Set(currency.clone()),
            payment_status: Set(PaymentStatus::Paid),
            status: Set(OrderStatus::Confirmed),
            tracking_id: Set(tracking_id),
            payment_session_id: Set(Some(input.payment_session_id.clone())),
            customer_email: Set(input.customer_email.clone()),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&savepoint)
        .await;

        match insert {
            Ok(order) => {
                savepoint.commit().await?;
                created = Some(order);
                break;
            }
            Err(err) => {
                let constraint = violated_constraint(&err);
                savepoint.rollback().await?;
                match constraint {
                    Some(c) if c.contains(TRACKING_ID_CONSTRAINT) => {
                        tracing::debug!(attempt, "tracking id collision; regenerating");
                    }
                    // A concurrent delivery of the same event won the race.
                    Some(c) if c.contains(PAYMENT_SESSION_CONSTRAINT) => {
                        txn.rollback().await?;
                        let existing =
                            find_by_payment_session(&state.orm, &input.payment_session_id).await?;
                        return Ok(ConfirmOutcome::AlreadyRecorded {
                            order_id: existing.map(|o| o.id),
                        });
                    }
                    _ => return Err(err.into()),
                }
            }
        }
    }
    let order = created.ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!(
            "no unique tracking id after {TRACKING_ID_ATTEMPTS} attempts"
        ))
    })?;

    let items: Vec<OrderItemActive> = lines
        .iter()
        .enumerate()
        .map(|(position, line)| OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            position: Set(position as i32),
            name: Set(line.name.clone()),
            image: Set(line.image.clone()),
            size: Set(line.size.clone()),
            unit_price: Set(line.unit_price),
            quantity: Set(line.quantity),
            created_at: NotSet,
        })
        .collect();
    OrderItems::insert_many(items).exec(&txn).await?;

    for line in &lines {
        Products::update_many()
            .col_expr(
                ProdCol::Stock,
                Func::greatest([
                    Expr::col(ProdCol::Stock).sub(line.quantity),
                    Expr::val(0).into(),
                ])
                .into(),
            )
            .filter(ProdCol::Id.eq(line.product_id))
            .exec(&txn)
            .await?;
    }

    append_event(
        &txn,
        &order,
        OrderStatus::Confirmed,
        CONFIRMATION_MESSAGE.to_string(),
        Some(CONFIRMATION_LOCATION.to_string()),
    )
    .await?;

    let item_models = load_items(&txn, order.id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        tracking_id = %order.tracking_id,
        amount_total = order.amount_total,
        "order confirmed"
    );
    Ok(ConfirmOutcome::Created(Order::from_parts(order, item_models)))
}

/// Append the next timeline entry for `order`.
///
/// Callers must hold the order row lock (or have just inserted the order in
/// the same transaction) so that concurrent appends get distinct `seq`s.
pub async fn append_event<C: ConnectionTrait>(
    conn: &C,
    order: &OrderModel,
    status: OrderStatus,
    message: String,
    location: Option<String>,
) -> AppResult<EventModel> {
    let last: Option<Option<i32>> = TrackingEvents::find()
        .select_only()
        .column_as(Expr::col(EventCol::Seq).max(), "max_seq")
        .filter(EventCol::OrderId.eq(order.id))
        .into_tuple()
        .one(conn)
        .await?;
    let seq = last.flatten().unwrap_or(0) + 1;

    let event = EventActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        tracking_id: Set(order.tracking_id.clone()),
        seq: Set(seq),
        status: Set(status),
        message: Set(message),
        location: Set(location),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(event)
}

pub async fn load_items<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<OrderItemModel>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::Position)
        .all(conn)
        .await?)
}

pub async fn load_events<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> AppResult<Vec<TrackingEvent>> {
    Ok(TrackingEvents::find()
        .filter(EventCol::OrderId.eq(order_id))
        .order_by_asc(EventCol::Seq)
        .all(conn)
        .await?
        .into_iter()
        .map(TrackingEvent::from)
        .collect())
}

pub async fn load_detail<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
) -> AppResult<OrderDetail> {
    let items = load_items(conn, order.id).await?;
    let events = load_events(conn, order.id).await?;
    Ok(OrderDetail {
        order: Order::from_parts(order, items),
        events,
    })
}

/// Attach line items to a page of orders with one extra query.
pub async fn with_items<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<Order>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut grouped: HashMap<Uuid, Vec<OrderItemModel>> = HashMap::new();
    if !ids.is_empty() {
        let rows = OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(ids))
            .order_by_asc(OrderItemCol::Position)
            .all(conn)
            .await?;
        for row in rows {
            grouped.entry(row.order_id).or_default().push(row);
        }
    }
    Ok(orders
        .into_iter()
        .map(|order| {
            let items = grouped.remove(&order.id).unwrap_or_default();
            Order::from_parts(order, items)
        })
        .collect())
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_items(&state.orm, orders).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Ok", OrderList { items }, Some(meta)))
}

/// A customer's own order with its timeline. Orders of other accounts are forbidden.
pub async fn get_my_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.user_id != Some(user.user_id) {
        return Err(AppError::Forbidden);
    }

    let detail = load_detail(&state.orm, order).await?;
    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}
