use chrono::Days;
use sqlx::{QueryBuilder, Sqlite};

use super::tasks::{grouped_counts, push_task_criteria, with_assignees, TASK_COLUMNS};
use super::{projects, Context};
use crate::authz::Collection;
use crate::errors::{AppError, AppResult};
use crate::models::dashboard::{ActivityEntry, Dashboard, DashboardStats, FilteredTasksQuery};
use crate::models::stats::{PriorityCounts, ProjectStatusCounts, TaskStatusCounts};
use crate::models::task::{DbTask, Task};
use crate::utils::day_start;

const RECENT_TASKS: i64 = 10;
const RECENT_ACTIVITY: i64 = 15;
const MAX_ACTIVITY: i64 = 100;

async fn recent_tasks(ctx: &Context<'_>) -> AppResult<Vec<Task>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE "));
    ctx.filter(Collection::Tasks).push_sql(&mut qb);
    qb.push(" ORDER BY t.updated_at DESC LIMIT ").push_bind(RECENT_TASKS);

    let tasks = qb.build_query_as::<DbTask>().fetch_all(ctx.pool).await?;
    with_assignees(ctx.pool, tasks).await
}

/// Latest task touches, attributed to the first assignee or else the creator.
pub async fn recent_activity(ctx: &Context<'_>, limit: Option<i64>) -> AppResult<Vec<ActivityEntry>> {
    let limit = limit.unwrap_or(RECENT_ACTIVITY).clamp(1, MAX_ACTIVITY);
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT t.id AS task_id, t.title, p.name AS project_name, \
         COALESCE((SELECT u.name FROM task_assignees ta JOIN users u ON u.id = ta.user_id \
                   WHERE ta.task_id = t.id ORDER BY ta.assigned_at ASC, ta.rowid ASC LIMIT 1), c.name) AS user_name, \
         t.status, t.priority, t.updated_at AS at \
         FROM tasks t JOIN projects p ON p.id = t.project_id LEFT JOIN users c ON c.id = t.created_by WHERE ",
    );
    ctx.filter(Collection::Tasks).push_sql(&mut qb);
    qb.push(" ORDER BY t.updated_at DESC LIMIT ").push_bind(limit);

    Ok(qb.build_query_as::<ActivityEntry>().fetch_all(ctx.pool).await?)
}

pub async fn summary(ctx: &Context<'_>) -> AppResult<Dashboard> {
    let project_rows = projects::status_counts(ctx).await?;
    let task_rows = grouped_counts(ctx, None).await?;

    Ok(Dashboard {
        projects: project_rows.into_iter().collect::<ProjectStatusCounts>(),
        tasks_by_status: task_rows.iter().map(|(status, _, count)| (*status, *count)).collect::<TaskStatusCounts>(),
        tasks_by_priority: task_rows.iter().map(|(_, priority, count)| (*priority, *count)).collect::<PriorityCounts>(),
        recent_tasks: recent_tasks(ctx).await?,
        recent_activity: recent_activity(ctx, None).await?,
    })
}

pub async fn stats(ctx: &Context<'_>) -> AppResult<DashboardStats> {
    let projects: ProjectStatusCounts = projects::status_counts(ctx).await?.into_iter().collect();
    let tasks: TaskStatusCounts = grouped_counts(ctx, None)
        .await?
        .into_iter()
        .map(|(status, _, count)| (status, count))
        .collect();
    Ok(DashboardStats::from_counts(&projects, &tasks))
}

/// Tasks the caller may list, narrowed by the query, most recently touched first.
pub async fn filtered_tasks(ctx: &Context<'_>, query: &FilteredTasksQuery) -> AppResult<Vec<Task>> {
    if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
        if from > to {
            return Err(AppError::validation("date_from must not be after date_to"));
        }
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE "));
    ctx.filter(Collection::Tasks).push_sql(&mut qb);
    push_task_criteria(&mut qb, query.project_id, query.status, query.priority, query.assigned_to);
    if let Some(from) = query.date_from {
        qb.push(" AND t.created_at >= ").push_bind(day_start(from));
    }
    if let Some(to) = query.date_to {
        let next_day = to
            .checked_add_days(Days::new(1))
            .ok_or_else(|| AppError::validation("date_to is out of range"))?;
        qb.push(" AND t.created_at < ").push_bind(day_start(next_day));
    }
    qb.push(" ORDER BY t.updated_at DESC");

    let tasks = qb.build_query_as::<DbTask>().fetch_all(ctx.pool).await?;
    with_assignees(ctx.pool, tasks).await
}
