use axum::{extract::FromRequestParts, http::header};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    domain::{Role, SessionMode},
    entity::users::{Column as UserCol, Entity as Users},
    error::{AppError, AppResult},
    state::AppState,
};

/// The caller behind a verified bearer credential, resolved against the live
/// user record so role changes and deletions take effect immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub session_mode: SessionMode,
}

/// Staff-only operations need an admin-mode session held by a staff account.
pub fn ensure_staff(user: &AuthUser) -> AppResult<()> {
    if user.session_mode != SessionMode::Admin || !user.role.is_staff() {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_role(user: &AuthUser, min: Role) -> AppResult<()> {
    ensure_staff(user)?;
    if !user.role.at_least(min) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

/// Owner-only gate. While nobody owns the store an admin may act as owner,
/// which is how the first owner gets appointed.
pub fn owner_gate(user: &AuthUser, owner_exists: bool) -> AppResult<()> {
    ensure_staff(user)?;
    match user.role {
        Role::Owner => Ok(()),
        Role::Admin if !owner_exists => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

pub async fn ensure_owner_or_bootstrap(state: &AppState, user: &AuthUser) -> AppResult<()> {
    ensure_staff(user)?;
    if user.role == Role::Owner {
        return Ok(());
    }
    let owners = Users::find()
        .filter(UserCol::Role.eq(Role::Owner))
        .count(&state.orm)
        .await?;
    owner_gate(user, owners > 0)
}

fn bearer_token(parts: &axum::http::request::Parts) -> AppResult<&str> {
    let auth_str = parts
        .headers
        .get(header::AUTHORIZATION)
        .ok_or(AppError::Unauthorized)?
        .to_str()
        .map_err(|_| AppError::Unauthorized)?;

    let token = auth_str
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AppError::Unauthorized)?;
    Ok(token)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let claims = state.sessions.verify(token)?;

        let user = Users::find_by_id(claims.user_id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser {
            user_id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            session_mode: claims.session_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, session_mode: SessionMode) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            role,
            session_mode,
        }
    }

    #[test]
    fn customer_mode_sessions_never_pass_staff_checks() {
        for role in [Role::Editor, Role::Manager, Role::Admin, Role::Owner] {
            let u = user(role, SessionMode::Customer);
            assert!(matches!(ensure_staff(&u), Err(AppError::Forbidden)));
            assert!(matches!(owner_gate(&u, false), Err(AppError::Forbidden)));
        }
    }

    #[test]
    fn customers_are_not_staff_even_in_admin_mode() {
        let u = user(Role::Customer, SessionMode::Admin);
        assert!(ensure_staff(&u).is_err());
        assert!(ensure_staff(&user(Role::Editor, SessionMode::Admin)).is_ok());
    }

    #[test]
    fn role_minimum_is_enforced() {
        let editor = user(Role::Editor, SessionMode::Admin);
        assert!(ensure_role(&editor, Role::Editor).is_ok());
        assert!(ensure_role(&editor, Role::Manager).is_err());
        let owner = user(Role::Owner, SessionMode::Admin);
        assert!(ensure_role(&owner, Role::Admin).is_ok());
    }

    #[test]
    fn bootstrap_exception_closes_once_an_owner_exists() {
        let admin = user(Role::Admin, SessionMode::Admin);
        assert!(owner_gate(&admin, false).is_ok());
        assert!(matches!(owner_gate(&admin, true), Err(AppError::Forbidden)));

        let manager = user(Role::Manager, SessionMode::Admin);
        assert!(owner_gate(&manager, false).is_err());

        let owner = user(Role::Owner, SessionMode::Admin);
        assert!(owner_gate(&owner, true).is_ok());
    }
}
