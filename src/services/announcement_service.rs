use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::announcements::{
        AnnouncementList, CreateAnnouncementRequest, MAX_MESSAGE_LEN, MAX_TITLE_LEN,
        UpdateAnnouncementRequest,
    },
    entity::announcements::{ActiveModel, Column, Entity as Announcements},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_owner_or_bootstrap},
    models::Announcement,
    response::{ApiResponse, Meta},
    state::AppState,
};

const PUBLIC_LIMIT: u64 = 50;
const ADMIN_LIMIT: u64 = 200;

fn checked(value: &str, max: usize, field: &str) -> AppResult<String> {
    let value = value.trim();
    let len = value.chars().count();
    if len == 0 || len > max {
        return Err(AppError::BadRequest(format!(
            "{field} must be between 1 and {max} characters"
        )));
    }
    Ok(value.to_string())
}

pub async fn list_active(state: &AppState) -> AppResult<ApiResponse<AnnouncementList>> {
    let items = Announcements::find()
        .filter(Column::Active.eq(true))
        .order_by_desc(Column::CreatedAt)
        .limit(PUBLIC_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Announcement::from)
        .collect();
    Ok(ApiResponse::success(
        "Announcements",
        AnnouncementList { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_all(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AnnouncementList>> {
    ensure_owner_or_bootstrap(state, user).await?;
    let items = Announcements::find()
        .order_by_desc(Column::CreatedAt)
        .limit(ADMIN_LIMIT)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Announcement::from)
        .collect();
    Ok(ApiResponse::success(
        "Announcements",
        AnnouncementList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_announcement(
    state: &AppState,
    user: &AuthUser,
    payload: CreateAnnouncementRequest,
) -> AppResult<ApiResponse<Announcement>> {
    ensure_owner_or_bootstrap(state, user).await?;
    let title = checked(&payload.title, MAX_TITLE_LEN, "Title")?;
    let message = checked(&payload.message, MAX_MESSAGE_LEN, "Message")?;

    let announcement = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(title),
        message: Set(message),
        active: Set(payload.active.unwrap_or(true)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        &state.pool,
        user.user_id,
        "announcement_create",
        "announcements",
        serde_json::json!({ "announcement_id": announcement.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Announcement created",
        Announcement::from(announcement),
        Some(Meta::empty()),
    ))
}

pub async fn update_announcement(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateAnnouncementRequest,
) -> AppResult<ApiResponse<Announcement>> {
    ensure_owner_or_bootstrap(state, user).await?;
    let existing = Announcements::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title.as_deref() {
        active.title = Set(checked(title, MAX_TITLE_LEN, "Title")?);
    }
    if let Some(message) = payload.message.as_deref() {
        active.message = Set(checked(message, MAX_MESSAGE_LEN, "Message")?);
    }
    if let Some(flag) = payload.active {
        active.active = Set(flag);
    }
    active.updated_at = Set(Utc::now().into());
    let announcement = active.update(&state.orm).await?;

    audit::record(
        &state.pool,
        user.user_id,
        "announcement_update",
        "announcements",
        serde_json::json!({ "announcement_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        Announcement::from(announcement),
        Some(Meta::empty()),
    ))
}

pub async fn delete_announcement(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_owner_or_bootstrap(state, user).await?;
    let result = Announcements::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        &state.pool,
        user.user_id,
        "announcement_delete",
        "announcements",
        serde_json::json!({ "announcement_id": id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_are_counted_in_characters() {
        let title = "ü".repeat(MAX_TITLE_LEN);
        assert_eq!(checked(&title, MAX_TITLE_LEN, "Title").unwrap(), title);
        assert!(checked(&format!("{title}x"), MAX_TITLE_LEN, "Title").is_err());
    }

    #[test]
    fn blank_text_is_rejected_after_trimming() {
        assert!(checked("   ", MAX_MESSAGE_LEN, "Message").is_err());
        assert_eq!(checked("  Drop day  ", MAX_TITLE_LEN, "Title").unwrap(), "Drop day");
    }
}
