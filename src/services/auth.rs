use sqlx::SqlitePool;

use super::users::{fetch_user, fetch_user_by_email};
use crate::authz::Actor;
use crate::errors::{AppError, AppResult};
use crate::jwt::JwtConfig;
use crate::models::user::{AuthResponse, ChangePasswordRequest, LoginRequest, ProfileUpdateRequest, User};
use crate::utils::{hash_password, utc_now, verify_password};

/// Unknown email, inactive account and wrong password are indistinguishable to the caller.
pub async fn login(pool: &SqlitePool, jwt: &JwtConfig, payload: &LoginRequest) -> AppResult<AuthResponse> {
    let email = payload.email.trim().to_lowercase();
    let Some(db_user) = fetch_user_by_email(pool, &email).await? else {
        return Err(AppError::InvalidCredentials);
    };

    if !db_user.is_active || !verify_password(&payload.password, &db_user.password_hash)? {
        tracing::info!(user_id = %db_user.id, "login rejected");
        return Err(AppError::InvalidCredentials);
    }

    let token = jwt.encode(db_user.id, db_user.role)?;
    Ok(AuthResponse {
        token,
        user: db_user.into(),
    })
}

pub async fn profile(pool: &SqlitePool, actor: &Actor) -> AppResult<User> {
    Ok(fetch_user(pool, actor.user_id).await?.into())
}

pub async fn update_profile(pool: &SqlitePool, actor: &Actor, payload: &ProfileUpdateRequest) -> AppResult<User> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }

    sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(utc_now())
        .bind(actor.user_id)
        .execute(pool)
        .await?;

    profile(pool, actor).await
}

pub async fn change_password(pool: &SqlitePool, actor: &Actor, payload: &ChangePasswordRequest) -> AppResult<()> {
    let db_user = fetch_user(pool, actor.user_id).await?;
    if !verify_password(&payload.current_password, &db_user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    let password_hash = hash_password(&payload.new_password)?;
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(utc_now())
        .bind(actor.user_id)
        .execute(pool)
        .await?;

    tracing::info!(user_id = %actor.user_id, "password changed");
    Ok(())
}
