use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use password_hash::rand_core::OsRng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, SqlErr, ActiveValue::NotSet,
};
use uuid::Uuid;

use crate::{
    domain::{
        Role, SessionMode,
        token::{MIN_TOKEN_LEN, OneTimeToken, RESET_TTL_HOURS, VERIFICATION_TTL_HOURS, hash_token},
    },
    dto::auth::{
        EmailRequest, LoginRequest, LoginResponse, MeResponse, RegisterRequest, RegisterResponse,
        ResetPasswordRequest, TokenRequest,
    },
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    integrations::mailer::{dispatch, password_reset_email, verification_email},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub const MIN_PASSWORD_LEN: usize = 8;

const RESEND_MESSAGE: &str = "If an account exists, a verification email has been sent";
const FORGOT_MESSAGE: &str = "If an account exists, a reset email has been sent";

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<RegisterResponse>> {
    let name = payload.name.trim().to_string();
    let email = normalize_email(&payload.email);
    if name.is_empty() || !is_valid_email(&email) || payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Invalid input".into()));
    }

    let exist = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::Conflict("Email already in use".into()));
    }

    let password_hash = hash_password(&payload.password)?;
    let token = OneTimeToken::issue(Duration::hours(VERIFICATION_TTL_HOURS));

    let active = UserActive {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        email: Set(email.clone()),
        password_hash: Set(password_hash),
        role: Set(Role::Customer),
        email_verified: Set(false),
        email_verification_token_hash: Set(Some(token.hash.clone())),
        email_verification_expires_at: Set(Some(token.expires_at.into())),
        password_reset_token_hash: Set(None),
        password_reset_expires_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    };
    let user = match active.insert(&state.orm).await {
        Ok(user) => user,
        // Lost a race with a concurrent registration for the same address.
        Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Conflict("Email already in use".into()));
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!(user_id = %user.id, "user registered");
    dispatch(
        state.mailer.clone(),
        verification_email(&user.email, &state.config.client_url, &token.raw, true),
        state.config.outbound_timeout,
    );

    Ok(ApiResponse::success(
        "Verification email sent",
        RegisterResponse { email: user.email },
        Some(Meta::empty()),
    ))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest {
        email,
        password,
        session_mode,
    } = payload;
    let email = normalize_email(&email);
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest("Invalid input".into()));
    }

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    // Only customers must verify their address before signing in.
    if !user.email_verified && user.role == Role::Customer {
        return Err(AppError::EmailNotVerified { email: user.email });
    }
    if session_mode == SessionMode::Admin && !user.role.is_staff() {
        return Err(AppError::NotStaff);
    }

    let token = state.sessions.issue(user.id, session_mode)?;
    tracing::info!(user_id = %user.id, ?session_mode, "user logged in");

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token,
            session_mode,
            user: User::from(user),
        },
        Some(Meta::empty()),
    ))
}

pub async fn verify_email(
    state: &AppState,
    payload: TokenRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let invalid = || AppError::BadRequest("Invalid or expired verification link".into());
    if payload.token.trim().len() < MIN_TOKEN_LEN {
        return Err(AppError::BadRequest("Invalid input".into()));
    }

    let user = Users::find()
        .filter(UserCol::EmailVerificationTokenHash.eq(hash_token(payload.token.trim())))
        .filter(UserCol::EmailVerificationExpiresAt.gt(Utc::now()))
        .one(&state.orm)
        .await?
        .ok_or_else(invalid)?;

    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.email_verified = Set(true);
    active.email_verification_token_hash = Set(None);
    active.email_verification_expires_at = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    tracing::info!(user_id = %user_id, "email verified");
    Ok(ApiResponse::message_only("Email verified"))
}

pub async fn resend_verification(
    state: &AppState,
    payload: EmailRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid input".into()));
    }

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    let Some(user) = user.filter(|u| !u.email_verified) else {
        return Ok(ApiResponse::message_only(RESEND_MESSAGE));
    };

    let token = OneTimeToken::issue(Duration::hours(VERIFICATION_TTL_HOURS));
    let to = user.email.clone();
    let mut active: UserActive = user.into();
    active.email_verification_token_hash = Set(Some(token.hash));
    active.email_verification_expires_at = Set(Some(token.expires_at.into()));
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    dispatch(
        state.mailer.clone(),
        verification_email(&to, &state.config.client_url, &token.raw, false),
        state.config.outbound_timeout,
    );
    Ok(ApiResponse::message_only(RESEND_MESSAGE))
}

pub async fn forgot_password(
    state: &AppState,
    payload: EmailRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let email = normalize_email(&payload.email);
    if !is_valid_email(&email) {
        return Err(AppError::BadRequest("Invalid input".into()));
    }

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    if let Some(user) = user {
        let token = OneTimeToken::issue(Duration::hours(RESET_TTL_HOURS));
        let to = user.email.clone();
        let mut active: UserActive = user.into();
        active.password_reset_token_hash = Set(Some(token.hash));
        active.password_reset_expires_at = Set(Some(token.expires_at.into()));
        active.updated_at = Set(Utc::now().into());
        active.update(&state.orm).await?;

        dispatch(
            state.mailer.clone(),
            password_reset_email(&to, &state.config.client_url, &token.raw),
            state.config.outbound_timeout,
        );
    }

    Ok(ApiResponse::message_only(FORGOT_MESSAGE))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.token.trim().len() < MIN_TOKEN_LEN || payload.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Invalid input".into()));
    }

    let user = Users::find()
        .filter(UserCol::PasswordResetTokenHash.eq(hash_token(payload.token.trim())))
        .filter(UserCol::PasswordResetExpiresAt.gt(Utc::now()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset link".into()))?;

    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.password_hash = Set(hash_password(&payload.password)?);
    active.password_reset_token_hash = Set(None);
    active.password_reset_expires_at = Set(None);
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    tracing::info!(user_id = %user_id, "password reset");
    Ok(ApiResponse::message_only("Password updated"))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<MeResponse>> {
    let record = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::Unauthorized)?;
    Ok(ApiResponse::success(
        "Ok",
        MeResponse {
            user: User::from(record),
            session_mode: user.session_mode,
        },
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("alice@example.com"));
        assert!(is_valid_email("a.b+c@shop.co.uk"));
        assert!(!is_valid_email("alice"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("alice@localhost"));
        assert!(!is_valid_email("al ice@example.com"));
        assert!(!is_valid_email("a@b@example.com"));
    }

    #[test]
    fn emails_are_case_insensitive() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
    }
}
