mod common;

use exporium_api::{
    domain::Role,
    dto::{admin::ChangeRoleRequest, announcements::CreateAnnouncementRequest},
    entity::users::{Column as UserCol, Entity as Users},
    error::AppError,
    routes::params::Pagination,
    services::{announcement_service, user_service},
};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

// The whole owner lifecycle lives in one test: it depends on there being no
// owner when it starts.
#[tokio::test]
async fn ownership_moves_by_promotion() -> anyhow::Result<()> {
    let Some(app) = common::db_app().await? else {
        return Ok(());
    };
    let state = &app.state;
    Users::update_many()
        .col_expr(UserCol::Role, Expr::value(Role::Admin))
        .filter(UserCol::Role.eq(Role::Owner))
        .exec(&state.orm)
        .await?;

    let mut a = common::create_user(state, "first-admin", Role::Admin).await?;
    let mut b = common::create_user(state, "successor", Role::Manager).await?;
    let customer = common::create_user(state, "shopper", Role::Customer).await?;

    // No owner yet: an admin may appoint one, and may not hand out `admin`.
    let invalid = user_service::change_role(
        state,
        &a,
        customer.user_id,
        ChangeRoleRequest { role: Role::Admin },
    )
    .await;
    assert!(matches!(invalid, Err(AppError::BadRequest(_))));

    let promoted = user_service::change_role(
        state,
        &a,
        a.user_id,
        ChangeRoleRequest { role: Role::Owner },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(promoted.role, Role::Owner);
    a.role = Role::Owner;

    // The bootstrap window is closed now.
    let other_admin = common::create_user(state, "other-admin", Role::Admin).await?;
    let denied = user_service::list_users(state, &other_admin, Pagination::default()).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    // The owner cannot simply step down.
    let step_down = user_service::change_role(
        state,
        &a,
        a.user_id,
        ChangeRoleRequest { role: Role::Editor },
    )
    .await;
    assert!(matches!(step_down, Err(AppError::BadRequest(_))));

    // Promoting B demotes A one rank.
    user_service::change_role(
        state,
        &a,
        b.user_id,
        ChangeRoleRequest { role: Role::Owner },
    )
    .await?;
    b.role = Role::Owner;

    let a_now = Users::find_by_id(a.user_id).one(&state.orm).await?.unwrap();
    assert_eq!(a_now.role, Role::Admin);
    a.role = a_now.role;
    let owners = Users::find()
        .filter(UserCol::Role.eq(Role::Owner))
        .count(&state.orm)
        .await?;
    assert_eq!(owners, 1);

    // A is an ordinary admin from here on.
    let denied = user_service::list_users(state, &a, Pagination::default()).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let self_delete = user_service::delete_user(state, &b, b.user_id).await;
    assert!(matches!(self_delete, Err(AppError::BadRequest(_))));
    user_service::delete_user(state, &b, customer.user_id).await?;
    assert!(Users::find_by_id(customer.user_id).one(&state.orm).await?.is_none());

    let created = announcement_service::create_announcement(
        state,
        &b,
        CreateAnnouncementRequest {
            title: "Summer drop".into(),
            message: "New colorways land Friday.".into(),
            active: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert!(created.active);
    let public = announcement_service::list_active(state).await?.data.unwrap();
    assert!(public.items.iter().any(|n| n.id == created.id));

    let directory = user_service::list_employees(state).await?.data.unwrap();
    assert_eq!(directory.items.first().map(|e| e.role), Some(Role::Owner));
    assert!(directory.items.iter().all(|e| e.role != Role::Customer));
    Ok(())
}
