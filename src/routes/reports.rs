use axum::extract::{Query, State};
use axum::Json;

use crate::app::AppState;
use crate::errors::AppResult;
use crate::jwt::AuthUser;
use crate::models::report::{AvailableMonth, MonthlyReport, ReportPreview, ReportQuery};
use crate::services;

#[utoipa::path(
    get,
    path = "/api/reports/monthly",
    tag = "Reports",
    params(ReportQuery),
    responses(
        (status = 200, description = "Full monthly report", body = MonthlyReport),
        (status = 400, description = "Year or month out of range"),
        (status = 403, description = "Department heads only")
    )
)]
pub async fn monthly_report(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<MonthlyReport>> {
    let ctx = state.context(auth.actor);
    let report = services::reports::monthly(&ctx, query.year, query.month).await?;
    tracing::info!(
        actor_id = %auth.actor.user_id,
        year = query.year,
        month = query.month,
        tasks = report.summary.total_tasks,
        "monthly report generated"
    );
    Ok(Json(report))
}

#[utoipa::path(
    get,
    path = "/api/reports/preview",
    tag = "Reports",
    params(ReportQuery),
    responses((status = 200, description = "Summary only", body = ReportPreview))
)]
pub async fn report_preview(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ReportPreview>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::reports::preview(&ctx, query.year, query.month).await?))
}

#[utoipa::path(
    get,
    path = "/api/reports/available-months",
    tag = "Reports",
    responses((status = 200, description = "Last twelve months, oldest first", body = [AvailableMonth]))
)]
pub async fn available_months(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<Vec<AvailableMonth>>> {
    let ctx = state.context(auth.actor);
    Ok(Json(services::reports::available(&ctx)?))
}
