use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::extract::AppJson;
use crate::jwt::AuthUser;
use crate::models::project::{
    AddMemberRequest, Project, ProjectCreateRequest, ProjectListQuery, ProjectStats, ProjectUpdateRequest,
};
use crate::models::user::MessageResponse;
use crate::services;

#[utoipa::path(
    get,
    path = "/api/projects",
    tag = "Projects",
    params(ProjectListQuery),
    responses((status = 200, description = "Projects visible to the caller", body = [Project]))
)]
pub async fn list_projects(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ProjectListQuery>,
) -> AppResult<Json<Vec<Project>>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::projects::list(&ctx, &query).await?))
}

#[utoipa::path(
    post,
    path = "/api/projects",
    tag = "Projects",
    request_body = ProjectCreateRequest,
    responses(
        (status = 201, description = "Project created", body = Project),
        (status = 403, description = "Role may not create projects")
    )
)]
pub async fn create_project(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<ProjectCreateRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let ctx = state.context(auth.actor);
    let project = services::projects::create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Project detail", body = Project))
)]
pub async fn get_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Project>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::projects::get(&ctx, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = ProjectUpdateRequest,
    responses((status = 200, description = "Project updated", body = Project))
)]
pub async fn update_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<ProjectUpdateRequest>,
) -> AppResult<Json<Project>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::projects::update(&ctx, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Project and its tasks deleted", body = MessageResponse))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let ctx = state.context(auth.actor);
    services::projects::delete(&ctx, id).await?;
    Ok(Json(MessageResponse::new("Project deleted")))
}

#[utoipa::path(
    post,
    path = "/api/projects/{id}/members",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "Member added", body = Project),
        (status = 400, description = "Already a member")
    )
)]
pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<Project>)> {
    let ctx = state.context(auth.actor);
    let project = services::projects::add_member(&ctx, id, payload.user_id).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    delete,
    path = "/api/projects/{id}/members/{user_id}",
    tag = "Projects",
    params(
        ("id" = Uuid, Path, description = "Project id"),
        ("user_id" = Uuid, Path, description = "Member user id")
    ),
    responses(
        (status = 200, description = "Member removed", body = Project),
        (status = 400, description = "The creator cannot be removed")
    )
)]
pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Project>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::projects::remove_member(&ctx, id, user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/projects/{id}/stats",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, description = "Task counts for the project", body = ProjectStats))
)]
pub async fn project_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ProjectStats>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::projects::stats(&ctx, id).await?))
}
