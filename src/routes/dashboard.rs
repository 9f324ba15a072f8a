use axum::extract::{Query, State};
use axum::Json;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::jwt::AuthUser;
use crate::models::dashboard::{ActivityEntry, ActivityQuery, Dashboard, DashboardStats, FilteredTasksQuery};
use crate::models::task::Task;
use crate::services;

#[utoipa::path(
    get,
    path = "/api/dashboard",
    tag = "Dashboard",
    responses((status = 200, description = "Counts and recent work visible to the caller", body = Dashboard))
)]
pub async fn dashboard(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Dashboard>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::dashboard::summary(&ctx).await?))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/stats",
    tag = "Dashboard",
    responses((status = 200, description = "Project and task totals visible to the caller", body = DashboardStats))
)]
pub async fn dashboard_stats(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<DashboardStats>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::dashboard::stats(&ctx).await?))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/activity",
    tag = "Dashboard",
    params(ActivityQuery),
    responses((status = 200, description = "Latest task updates, newest first", body = [ActivityEntry]))
)]
pub async fn recent_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ActivityQuery>,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::dashboard::recent_activity(&ctx, query.limit).await?))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/tasks/filtered",
    tag = "Dashboard",
    params(FilteredTasksQuery),
    responses(
        (status = 200, description = "Visible tasks matching the filters", body = [Task]),
        (status = 400, description = "date_from is after date_to")
    )
)]
pub async fn filtered_tasks(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<FilteredTasksQuery>,
) -> AppResult<Json<Vec<Task>>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::dashboard::filtered_tasks(&ctx, &query).await?))
}
