use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::extract::AppJson;
use crate::jwt::AuthUser;
use crate::models::comment::{Comment, CommentCreateRequest};
use crate::models::task::{
    Task, TaskCreateRequest, TaskDetail, TaskListQuery, TaskStats, TaskStatsQuery, TaskStatusRequest,
    TaskUpdateRequest,
};
use crate::models::user::MessageResponse;
use crate::services;

#[utoipa::path(
    get,
    path = "/api/tasks",
    tag = "Tasks",
    params(TaskListQuery),
    responses((status = 200, description = "Tasks visible to the caller", body = [Task]))
)]
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TaskListQuery>,
) -> AppResult<Json<Vec<Task>>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::tasks::list(&ctx, &query).await?))
}

#[utoipa::path(
    post,
    path = "/api/tasks",
    tag = "Tasks",
    request_body = TaskCreateRequest,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 403, description = "Caller is not a member of the project"),
        (status = 404, description = "Project not found")
    )
)]
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(payload): AppJson<TaskCreateRequest>,
) -> AppResult<(StatusCode, Json<Task>)> {
    let ctx = state.context(auth.actor);
    let task = services::tasks::create(&ctx, payload).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/api/tasks/my-tasks",
    tag = "Tasks",
    responses((status = 200, description = "Tasks created by or assigned to the caller", body = [Task]))
)]
pub async fn my_tasks(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<Task>>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::tasks::my_tasks(&ctx).await?))
}

#[utoipa::path(
    get,
    path = "/api/tasks/stats",
    tag = "Tasks",
    params(TaskStatsQuery),
    responses((status = 200, description = "Task counts", body = TaskStats))
)]
pub async fn task_stats(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<TaskStatsQuery>,
) -> AppResult<Json<TaskStats>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::tasks::stats(&ctx, &query).await?))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses((status = 200, description = "Task with its comments", body = TaskDetail))
)]
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<TaskDetail>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::tasks::get(&ctx, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskUpdateRequest,
    responses((status = 200, description = "Task updated", body = Task))
)]
pub async fn update_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<TaskUpdateRequest>,
) -> AppResult<Json<Task>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::tasks::update(&ctx, id, payload).await?))
}

#[utoipa::path(
    patch,
    path = "/api/tasks/{id}/status",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = TaskStatusRequest,
    responses((status = 200, description = "Status changed", body = Task))
)]
pub async fn update_task_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<TaskStatusRequest>,
) -> AppResult<Json<Task>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::tasks::change_status(&ctx, id, payload.status).await?))
}

#[utoipa::path(
    delete,
    path = "/api/tasks/{id}",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 403, description = "Only the creator may delete a task")
    )
)]
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    let ctx = state.context(auth.actor);
    services::tasks::delete(&ctx, id).await?;
    Ok(Json(MessageResponse::new("Task deleted")))
}

#[utoipa::path(
    get,
    path = "/api/tasks/{id}/comments",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    responses((status = 200, description = "Comments, oldest first", body = [Comment]))
)]
pub async fn list_comments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<Comment>>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::tasks::list_comments(&ctx, id).await?))
}

#[utoipa::path(
    post,
    path = "/api/tasks/{id}/comments",
    tag = "Tasks",
    params(("id" = Uuid, Path, description = "Task id")),
    request_body = CommentCreateRequest,
    responses((status = 201, description = "Comment added", body = Comment))
)]
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<CommentCreateRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let ctx = state.context(auth.actor);
    let comment = services::tasks::add_comment(&ctx, id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}
