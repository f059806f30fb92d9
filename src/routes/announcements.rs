use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::{admin::EmployeeList, announcements::AnnouncementList},
    error::AppResult,
    response::ApiResponse,
    services::{announcement_service, user_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_announcements))
}

pub fn employees_router() -> Router<AppState> {
    Router::new().route("/", get(list_employees))
}

#[utoipa::path(
    get,
    path = "/api/announcements",
    responses(
        (status = 200, description = "Active announcements, newest first", body = ApiResponse<AnnouncementList>)
    ),
    tag = "Store"
)]
pub async fn list_announcements(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<AnnouncementList>>> {
    let resp = announcement_service::list_active(&state).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "Staff directory", body = ApiResponse<EmployeeList>)
    ),
    tag = "Store"
)]
pub async fn list_employees(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<EmployeeList>>> {
    let resp = user_service::list_employees(&state).await?;
    Ok(Json(resp))
}
