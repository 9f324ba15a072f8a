use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::extract::AppJson;
use crate::jwt::AuthUser;
use crate::models::user::{
    AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse, ProfileUpdateRequest, User,
};
use crate::services;

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let response = services::auth::login(&state.pool, &state.jwt, &payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "Auth",
    responses((status = 200, description = "Current user", body = User))
)]
pub async fn profile(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<User>> {
    let user = services::auth::profile(&state.pool, &auth.actor).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/auth/profile",
    tag = "Auth",
    request_body = ProfileUpdateRequest,
    responses((status = 200, description = "Profile updated", body = User))
)]
pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<ProfileUpdateRequest>,
) -> AppResult<Json<User>> {
    let user = services::auth::update_profile(&state.pool, &auth.actor, &payload).await?;
    Ok(Json(user))
}

#[utoipa::path(
    put,
    path = "/api/auth/change-password",
    tag = "Auth",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "Current password is wrong")
    )
)]
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    services::auth::change_password(&state.pool, &auth.actor, &payload).await?;
    Ok(Json(MessageResponse::new("Password changed")))
}

/// Tokens are stateless; logout is an acknowledgement for the client.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses((status = 200, description = "Logout acknowledged", body = MessageResponse))
)]
pub async fn logout(auth: AuthUser) -> AppResult<Json<MessageResponse>> {
    tracing::info!(user_id = %auth.actor.user_id, "logout");
    Ok(Json(MessageResponse::new("Logged out")))
}
