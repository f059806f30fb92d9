mod common;

use std::sync::Arc;

use axum::http::{HeaderMap, HeaderValue};
use exporium_api::{
    domain::{
        OrderStatus, PaymentStatus, Role, SessionMode, TransitionPolicy, snapshot::RequestedItem,
        tracking_id::{TRACKING_ID_ATTEMPTS, generate_tracking_id},
    },
    dto::{
        checkout::CreateCheckoutSessionRequest,
        orders::{AppendTrackingEventRequest, UpdateOrderStatusRequest},
    },
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        products::Entity as Products,
        tracking_events::{Column as EventCol, Entity as TrackingEvents},
    },
    error::AppError,
    integrations::webhook::{SIGNATURE_HEADER, sign},
    routes::params::Pagination,
    services::{
        admin_service, checkout_service,
        order_service::{self, ConfirmOutcome, ConfirmPayment},
        tracking_service, webhook_service,
    },
    state::AppState,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use uuid::Uuid;

fn completed_event(session_id: &str, user_id: Uuid, items: &[RequestedItem]) -> Vec<u8> {
    json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "checkout.session.completed",
        "data": {
            "object": {
                "id": session_id,
                "currency": "usd",
                "metadata": {
                    "user_id": user_id.to_string(),
                    "items": serde_json::to_string(items).unwrap(),
                },
                "customer_details": { "email": "buyer@example.com" }
            }
        }
    })
    .to_string()
    .into_bytes()
}

fn payment(session_id: &str, user_id: Uuid, items: &[RequestedItem]) -> ConfirmPayment {
    ConfirmPayment {
        payment_session_id: session_id.to_string(),
        user_id,
        items: items.to_vec(),
        currency: Some("usd".into()),
        customer_email: None,
    }
}

fn session_id() -> String {
    format!("cs_test_{}", Uuid::new_v4().simple())
}

async fn orders_for(state: &AppState, session_id: &str) -> anyhow::Result<u64> {
    Ok(Orders::find()
        .filter(OrderCol::PaymentSessionId.eq(session_id))
        .count(&state.orm)
        .await?)
}

async fn deliver(state: &AppState, body: &[u8]) -> Result<(), AppError> {
    let header = sign(body, "whsec_test", chrono::Utc::now().timestamp()).unwrap();
    let mut headers = HeaderMap::new();
    headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(&header).unwrap());
    let ack = webhook_service::handle(state, &headers, body).await?;
    assert!(ack.data.unwrap().received);
    Ok(())
}

#[tokio::test]
async fn paid_checkout_becomes_a_tracked_order() -> anyhow::Result<()> {
    let Some(app) = common::db_app().await? else {
        return Ok(());
    };
    let state = &app.state;
    let customer = common::create_user(state, "buyer", Role::Customer).await?;
    let product_id = common::create_product(state, 5_000, 10).await?;
    let items = vec![RequestedItem {
        product_id,
        quantity: 2,
        size: Some("42".into()),
    }];

    // Checkout hands the cart to the payment processor.
    let session = checkout_service::create_checkout_session(
        state,
        &customer,
        CreateCheckoutSessionRequest {
            items: items.clone(),
        },
    )
    .await?
    .data
    .unwrap();
    {
        let requests = app.gateway.requests.lock().unwrap();
        let sent = requests.last().unwrap();
        assert_eq!(sent.lines[0].unit_amount, 5_000);
        assert_eq!(sent.lines[0].quantity, 2);
        assert_eq!(sent.customer_email.as_deref(), Some(customer.email.as_str()));
    }

    let body = completed_event(&session.session_id, customer.user_id, &items);
    deliver(state, &body).await?;
    // Redelivery of the same notification.
    deliver(state, &body).await?;

    let orders = Orders::find()
        .filter(OrderCol::PaymentSessionId.eq(session.session_id.as_str()))
        .all(&state.orm)
        .await?;
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.amount_total, 10_000);
    assert_eq!(order.status, OrderStatus::Confirmed);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert_eq!(order.user_id, Some(customer.user_id));
    assert_eq!(order.customer_email.as_deref(), Some("buyer@example.com"));
    assert_eq!(order.tracking_id.len(), 10);

    let stock = Products::find_by_id(product_id).one(&state.orm).await?.unwrap().stock;
    assert_eq!(stock, 8);

    // Public tracking, typed in lowercase.
    let view = tracking_service::track(state, &order.tracking_id.to_lowercase())
        .await?
        .data
        .unwrap();
    assert_eq!(view.order.tracking_id, order.tracking_id);
    assert_eq!(view.order.items.len(), 1);
    assert_eq!(view.order.items[0].unit_price, 5_000);
    assert_eq!(view.events.len(), 1);
    assert_eq!(view.events[0].status, OrderStatus::Confirmed);
    assert_eq!(view.events[0].location.as_deref(), Some("China"));

    // Staff move the order along; the change lands on the timeline.
    let staff = common::create_user(state, "manager", Role::Manager).await?;
    let detail = admin_service::update_order_status(
        state,
        &staff,
        order.id,
        UpdateOrderStatusRequest {
            status: OrderStatus::ShippedFromOrigin,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(detail.order.status, OrderStatus::ShippedFromOrigin);
    assert_eq!(detail.events.len(), 2);
    let newest = detail.events.last().unwrap();
    assert_eq!(newest.seq, 2);
    assert_eq!(newest.status, OrderStatus::ShippedFromOrigin);
    assert_eq!(newest.message, "Status updated to SHIPPED_CHINA");

    // A free-form note does not touch the order status.
    let note = admin_service::append_tracking_event(
        state,
        &staff,
        order.id,
        AppendTrackingEventRequest {
            status: OrderStatus::InTransit,
            message: "  Departed origin hub  ".into(),
            location: Some("   ".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(note.seq, 3);
    assert_eq!(note.message, "Departed origin hub");
    assert_eq!(note.location, None);

    let view = tracking_service::track(state, &order.tracking_id).await?.data.unwrap();
    assert_eq!(view.order.status, OrderStatus::ShippedFromOrigin);
    let seqs: Vec<i32> = view.events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);

    let mine = order_service::list_my_orders(state, &customer, Pagination::default())
        .await?
        .data
        .unwrap();
    assert_eq!(mine.items.len(), 1);
    assert_eq!(mine.items[0].id, order.id);
    Ok(())
}

#[tokio::test]
async fn customers_only_see_their_own_orders() -> anyhow::Result<()> {
    let Some(app) = common::db_app().await? else {
        return Ok(());
    };
    let state = &app.state;
    let owner = common::create_user(state, "owner-of-order", Role::Customer).await?;
    let stranger = common::create_user(state, "stranger", Role::Customer).await?;
    let product_id = common::create_product(state, 7_500, 5).await?;
    let items = vec![RequestedItem {
        product_id,
        quantity: 1,
        size: None,
    }];

    let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
    deliver(state, &completed_event(&session_id, owner.user_id, &items)).await?;
    let order = Orders::find()
        .filter(OrderCol::PaymentSessionId.eq(session_id.as_str()))
        .one(&state.orm)
        .await?
        .unwrap();

    let detail = order_service::get_my_order(state, &owner, order.id).await?.data.unwrap();
    assert_eq!(detail.order.id, order.id);
    assert_eq!(detail.events.len(), 1);

    let denied = order_service::get_my_order(state, &stranger, order.id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let missing = order_service::get_my_order(state, &owner, Uuid::new_v4()).await;
    assert!(matches!(missing, Err(AppError::NotFound)));

    let theirs = order_service::list_my_orders(state, &stranger, Pagination::default())
        .await?
        .data
        .unwrap();
    assert!(theirs.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn staff_endpoints_need_an_admin_mode_session() -> anyhow::Result<()> {
    let Some(app) = common::db_app().await? else {
        return Ok(());
    };
    let state = &app.state;
    let mut admin = common::create_user(state, "admin-in-shop", Role::Admin).await?;
    admin.session_mode = SessionMode::Customer;
    let customer = common::create_user(state, "plain", Role::Customer).await?;

    assert!(matches!(
        admin_service::dashboard(state, &admin).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        admin_service::dashboard(state, &customer).await,
        Err(AppError::Forbidden)
    ));

    admin.session_mode = SessionMode::Admin;
    let counts = admin_service::dashboard(state, &admin).await?.data.unwrap();
    assert!(counts.customers >= 1);
    Ok(())
}

#[tokio::test]
async fn stale_or_unknown_products_do_not_create_orders() -> anyhow::Result<()> {
    let Some(app) = common::db_app().await? else {
        return Ok(());
    };
    let state = &app.state;
    let customer = common::create_user(state, "late", Role::Customer).await?;
    let items = vec![RequestedItem {
        product_id: Uuid::new_v4(),
        quantity: 1,
        size: None,
    }];

    let session_id = format!("cs_test_{}", Uuid::new_v4().simple());
    // Acknowledged so the processor stops retrying, but nothing is written.
    deliver(state, &completed_event(&session_id, customer.user_id, &items)).await?;
    let count = Orders::find()
        .filter(OrderCol::PaymentSessionId.eq(session_id.as_str()))
        .count(&state.orm)
        .await?;
    assert_eq!(count, 0);

    let rejected = checkout_service::create_checkout_session(
        state,
        &customer,
        CreateCheckoutSessionRequest { items },
    )
    .await;
    assert!(matches!(rejected, Err(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn tracking_id_collisions_are_regenerated() -> anyhow::Result<()> {
    let Some(app) = common::db_app().await? else {
        return Ok(());
    };
    let state = &app.state;
    let customer = common::create_user(state, "collider", Role::Customer).await?;
    let product_id = common::create_product(state, 1_000, 50).await?;
    let items = vec![RequestedItem {
        product_id,
        quantity: 1,
        size: None,
    }];

    let first = payment(&session_id(), customer.user_id, &items);
    let first = match order_service::confirm_order(state, first).await? {
        ConfirmOutcome::Created(order) => order,
        other => panic!("expected a new order, got {other:?}"),
    };

    // The first draw repeats an existing id; the second is fresh.
    let taken = first.tracking_id.clone();
    let mut draws = vec![generate_tracking_id(), taken.clone()];
    let second = order_service::confirm_order_with(
        state,
        payment(&session_id(), customer.user_id, &items),
        || draws.pop().unwrap_or_else(generate_tracking_id),
    )
    .await?;
    match second {
        ConfirmOutcome::Created(order) => {
            assert_ne!(order.tracking_id, taken);
            let events = TrackingEvents::find()
                .filter(EventCol::OrderId.eq(order.id))
                .count(&state.orm)
                .await?;
            assert_eq!(events, 1);
        }
        other => panic!("expected a new order, got {other:?}"),
    }

    // Every draw collides: the confirmation gives up and writes nothing.
    let doomed = session_id();
    let mut calls = 0;
    let exhausted = order_service::confirm_order_with(
        state,
        payment(&doomed, customer.user_id, &items),
        || {
            calls += 1;
            taken.clone()
        },
    )
    .await;
    assert!(matches!(exhausted, Err(AppError::Internal(_))));
    assert_eq!(calls, TRACKING_ID_ATTEMPTS);
    assert_eq!(orders_for(state, &doomed).await?, 0);
    Ok(())
}

#[tokio::test]
async fn concurrent_confirmations_record_one_order() -> anyhow::Result<()> {
    let Some(app) = common::db_app().await? else {
        return Ok(());
    };
    let state = &app.state;
    let customer = common::create_user(state, "double-click", Role::Customer).await?;
    let product_id = common::create_product(state, 2_500, 10).await?;
    let items = vec![RequestedItem {
        product_id,
        quantity: 1,
        size: None,
    }];
    let session = session_id();

    let (a, b) = tokio::join!(
        order_service::confirm_order(state, payment(&session, customer.user_id, &items)),
        order_service::confirm_order(state, payment(&session, customer.user_id, &items)),
    );
    let outcomes = [a?, b?];
    let created = outcomes
        .iter()
        .filter(|o| matches!(o, ConfirmOutcome::Created(_)))
        .count();
    assert_eq!(created, 1);
    assert_eq!(orders_for(state, &session).await?, 1);

    let product = Products::find_by_id(product_id).one(&state.orm).await?.unwrap();
    assert_eq!(product.stock, 9);
    Ok(())
}

#[tokio::test]
async fn forward_only_policy_rejects_regressions() -> anyhow::Result<()> {
    let Some(app) = common::db_app().await? else {
        return Ok(());
    };
    let mut state = app.state.clone();
    Arc::make_mut(&mut state.config).transition_policy = TransitionPolicy::ForwardOnly;
    let customer = common::create_user(&state, "strict-buyer", Role::Customer).await?;
    let staff = common::create_user(&state, "strict-staff", Role::Manager).await?;
    let product_id = common::create_product(&state, 3_000, 5).await?;
    let items = vec![RequestedItem {
        product_id,
        quantity: 1,
        size: None,
    }];

    let paid = payment(&session_id(), customer.user_id, &items);
    let order = match order_service::confirm_order(&state, paid).await? {
        ConfirmOutcome::Created(order) => order,
        other => panic!("expected a new order, got {other:?}"),
    };
    let to = |status| UpdateOrderStatusRequest { status };

    admin_service::update_order_status(&state, &staff, order.id, to(OrderStatus::Delivered))
        .await?;

    let backwards = to(OrderStatus::Processing);
    let rejected = admin_service::update_order_status(&state, &staff, order.id, backwards).await;
    match rejected {
        Err(AppError::BadRequest(message)) => {
            assert!(message.contains("DELIVERED"));
            assert!(message.contains("allowed next: none"));
        }
        other => panic!("expected a 400, got {other:?}"),
    }

    let view = tracking_service::track(&state, &order.tracking_id).await?.data.unwrap();
    assert_eq!(view.order.status, OrderStatus::Delivered);
    let seqs: Vec<i32> = view.events.iter().map(|e| e.seq).collect();
    assert_eq!(seqs, vec![1, 2]);
    Ok(())
}
