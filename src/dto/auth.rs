use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{domain::SessionMode, models::User};

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// `admin` asks for a staff session; defaults to `customer`.
    #[serde(default, alias = "sessionMode")]
    pub session_mode: SessionMode,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub session_mode: SessionMode,
    pub user: User,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct TokenRequest {
    pub token: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: User,
    pub session_mode: SessionMode,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub session_mode: SessionMode,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub email: String,
}
