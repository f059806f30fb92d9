use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Announcement;

pub const MAX_TITLE_LEN: usize = 120;
pub const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub message: String,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAnnouncementRequest {
    pub title: Option<String>,
    pub message: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct AnnouncementList {
    #[schema(value_type = Vec<Announcement>)]
    pub items: Vec<Announcement>,
}
