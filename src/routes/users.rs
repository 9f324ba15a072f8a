use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::extract::AppJson;
use crate::jwt::AuthUser;
use crate::models::user::{
    MessageResponse, User, UserCreateRequest, UserCreatedResponse, UserListQuery, UserStats, UserUpdateRequest,
};
use crate::services;

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    params(UserListQuery),
    responses((status = 200, description = "Users visible to the caller", body = [User]))
)]
pub async fn list_users(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<Vec<User>>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::users::list(&ctx, &query).await?))
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "Users",
    request_body = UserCreateRequest,
    responses(
        (status = 201, description = "User created", body = UserCreatedResponse),
        (status = 403, description = "Role not creatable by the caller"),
        (status = 400, description = "Email already in use")
    )
)]
pub async fn create_user(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<UserCreateRequest>,
) -> AppResult<(StatusCode, Json<UserCreatedResponse>)> {
    let ctx = state.context(auth.actor);
    let created = services::users::create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/api/users/my-team",
    tag = "Users",
    responses((status = 200, description = "Direct subordinates", body = [User]))
)]
pub async fn my_team(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<User>>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::users::my_team(&ctx).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/stats",
    tag = "Users",
    responses((status = 200, description = "User counts", body = UserStats))
)]
pub async fn user_stats(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<UserStats>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::users::stats(&ctx).await?))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses((status = 200, description = "User detail", body = User))
)]
pub async fn get_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::users::get(&ctx, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserUpdateRequest,
    responses(
        (status = 200, description = "User updated", body = User),
        (status = 400, description = "Reporting cycle or invalid field")
    )
)]
pub async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UserUpdateRequest>,
) -> AppResult<Json<User>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::users::update(&ctx, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "Users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deleted", body = MessageResponse),
        (status = 400, description = "User still manages others or owns data")
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let ctx = state.context(auth.actor);
    services::users::delete(&ctx, id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}
