use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::projects::load_facts as load_project_facts;
use super::{dedup_ids, insert_concurrently, push_search, Context};
use crate::authz::{area_for_task, AccessRequest, Collection, ProjectAction, TaskAction, TaskFacts};
use crate::errors::{AppError, AppResult};
use crate::models::comment::{Comment, CommentCreateRequest};
use crate::models::project::Priority;
use crate::models::stats::{PriorityCounts, TaskStatusCounts};
use crate::models::task::{
    DbTask, Task, TaskAssignee, TaskCreateRequest, TaskDetail, TaskListQuery, TaskStats, TaskStatsQuery, TaskStatus,
    TaskUpdateRequest,
};
use crate::utils::utc_now;

pub(crate) const TASK_COLUMNS: &str = "t.id, t.title, t.description, t.status, t.priority, t.estimated_date, t.completed_date, t.project_id, t.created_by, t.area, t.created_at, t.updated_at";

/// Completion timestamp after moving a task to `next`.
///
/// Entering `completed` stamps `now`, staying `completed` keeps the existing
/// stamp and any other status clears it.
pub fn next_completed_date(
    current: Option<DateTime<Utc>>,
    next: TaskStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match next {
        TaskStatus::Completed => current.or(Some(now)),
        TaskStatus::Pending | TaskStatus::InProgress => None,
    }
}

async fn fetch_task(pool: &SqlitePool, task_id: Uuid) -> AppResult<DbTask> {
    sqlx::query_as::<_, DbTask>(&format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?"))
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("task not found"))
}

async fn load_facts(pool: &SqlitePool, task_id: Uuid) -> AppResult<(DbTask, TaskFacts)> {
    let task = fetch_task(pool, task_id).await?;
    let (_, project) = load_project_facts(pool, task.project_id).await?;
    let assignee_ids = sqlx::query_scalar(
        "SELECT user_id FROM task_assignees WHERE task_id = ? ORDER BY assigned_at ASC, rowid ASC",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;
    let facts = task.facts(assignee_ids, project);
    Ok((task, facts))
}

/// Assignees of every listed task, ordered by assignment time.
pub(crate) async fn assignees_by_task(pool: &SqlitePool, task_ids: &[Uuid]) -> AppResult<HashMap<Uuid, Vec<TaskAssignee>>> {
    let mut grouped: HashMap<Uuid, Vec<TaskAssignee>> = HashMap::new();
    if task_ids.is_empty() {
        return Ok(grouped);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT ta.task_id, ta.user_id, u.name, ta.assigned_at FROM task_assignees ta \
         JOIN users u ON u.id = ta.user_id WHERE ta.task_id IN (",
    );
    let mut ids = qb.separated(", ");
    for id in task_ids {
        ids.push_bind(*id);
    }
    ids.push_unseparated(") ORDER BY ta.assigned_at ASC, ta.rowid ASC");

    for assignee in qb.build_query_as::<TaskAssignee>().fetch_all(pool).await? {
        grouped.entry(assignee.task_id).or_default().push(assignee);
    }
    Ok(grouped)
}

pub(crate) async fn with_assignees(pool: &SqlitePool, tasks: Vec<DbTask>) -> AppResult<Vec<Task>> {
    let ids: Vec<Uuid> = tasks.iter().map(|task| task.id).collect();
    let mut assignees = assignees_by_task(pool, &ids).await?;
    Ok(tasks
        .into_iter()
        .map(|task| {
            let list = assignees.remove(&task.id).unwrap_or_default();
            task.into_task(list)
        })
        .collect())
}

async fn hydrate(pool: &SqlitePool, task_id: Uuid) -> AppResult<Task> {
    let task = fetch_task(pool, task_id).await?;
    let mut list = with_assignees(pool, vec![task]).await?;
    list.pop().ok_or_else(|| AppError::not_found("task not found"))
}

/// Inserts each known user as an assignee; unknown ids are logged and skipped.
async fn assign(pool: &SqlitePool, task_id: Uuid, user_ids: Vec<Uuid>) -> AppResult<()> {
    let batch_pool = pool.clone();
    let skipped = insert_concurrently(user_ids, move |user_id| {
        let pool = batch_pool.clone();
        async move {
            let inserted = sqlx::query(
                "INSERT OR IGNORE INTO task_assignees (task_id, user_id, assigned_at) \
                 SELECT ?, id, ? FROM users WHERE id = ?",
            )
            .bind(task_id)
            .bind(utc_now())
            .bind(user_id)
            .execute(&pool)
            .await?;
            let known: bool = inserted.rows_affected() > 0
                || sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ?")
                    .bind(user_id)
                    .fetch_one(&pool)
                    .await?
                    > 0;
            Ok(known)
        }
    })
    .await?;

    for user_id in skipped {
        tracing::warn!(task_id = %task_id, user_id = %user_id, "skipping unknown assignee");
    }
    Ok(())
}

fn required_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    Ok(title.to_string())
}

pub async fn create(ctx: &Context<'_>, payload: TaskCreateRequest) -> AppResult<Task> {
    let (_, project) = load_project_facts(ctx.pool, payload.project_id).await?;
    ctx.authorize(&AccessRequest::Project(ProjectAction::CreateTask, &project))?;

    let title = required_title(&payload.title)?;
    let status = payload.status.unwrap_or_default();
    let now = utc_now();
    let completed_date = next_completed_date(None, status, now);
    let area = area_for_task(&project);
    let task_id = Uuid::new_v4();

    sqlx::query(
        "INSERT INTO tasks (id, title, description, status, priority, estimated_date, completed_date, project_id, created_by, area, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(task_id)
    .bind(&title)
    .bind(&payload.description)
    .bind(status)
    .bind(payload.priority.unwrap_or_default())
    .bind(payload.estimated_date)
    .bind(completed_date)
    .bind(project.id)
    .bind(ctx.actor.user_id)
    .bind(area)
    .bind(now)
    .bind(now)
    .execute(ctx.pool)
    .await?;

    assign(ctx.pool, task_id, dedup_ids(&payload.assignee_ids(), None)).await?;

    tracing::info!(actor_id = %ctx.actor.user_id, task_id = %task_id, project_id = %project.id, "task created");
    hydrate(ctx.pool, task_id).await
}

/// Equality filters shared by the task list and the dashboard's filtered view.
pub(crate) fn push_task_criteria(
    qb: &mut QueryBuilder<'_, Sqlite>,
    project_id: Option<Uuid>,
    status: Option<TaskStatus>,
    priority: Option<Priority>,
    assigned_to: Option<Uuid>,
) {
    if let Some(project_id) = project_id {
        qb.push(" AND t.project_id = ").push_bind(project_id);
    }
    if let Some(status) = status {
        qb.push(" AND t.status = ").push_bind(status);
    }
    if let Some(priority) = priority {
        qb.push(" AND t.priority = ").push_bind(priority);
    }
    if let Some(user_id) = assigned_to {
        qb.push(" AND EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

pub async fn list(ctx: &Context<'_>, query: &TaskListQuery) -> AppResult<Vec<Task>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE "));
    ctx.filter(Collection::Tasks).push_sql(&mut qb);
    push_task_criteria(&mut qb, query.project_id, query.status, query.priority, query.assigned_to);
    push_search(&mut qb, &["t.title", "t.description"], query.search.as_deref());
    qb.push(" ORDER BY t.created_at DESC");

    let tasks = qb.build_query_as::<DbTask>().fetch_all(ctx.pool).await?;
    with_assignees(ctx.pool, tasks).await
}

/// Tasks the caller created or is assigned to, within their own area.
pub async fn my_tasks(ctx: &Context<'_>) -> AppResult<Vec<Task>> {
    let me = ctx.actor.user_id;
    let tasks = sqlx::query_as::<_, DbTask>(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks t WHERE t.area = ? AND (t.created_by = ? \
         OR EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = ?)) \
         ORDER BY t.updated_at DESC"
    ))
    .bind(ctx.actor.area())
    .bind(me)
    .bind(me)
    .fetch_all(ctx.pool)
    .await?;
    with_assignees(ctx.pool, tasks).await
}

pub async fn get(ctx: &Context<'_>, task_id: Uuid) -> AppResult<TaskDetail> {
    let (_, facts) = load_facts(ctx.pool, task_id).await?;
    ctx.authorize(&AccessRequest::Task(TaskAction::Read, &facts))?;

    let task = hydrate(ctx.pool, task_id).await?;
    let comments = fetch_comments(ctx.pool, task_id).await?;
    Ok(TaskDetail { task, comments })
}

pub async fn update(ctx: &Context<'_>, task_id: Uuid, payload: TaskUpdateRequest) -> AppResult<Task> {
    let (mut task, facts) = load_facts(ctx.pool, task_id).await?;
    ctx.authorize(&AccessRequest::Task(TaskAction::Update, &facts))?;

    if let Some(status) = payload.status {
        if status != task.status {
            ctx.authorize(&AccessRequest::Task(TaskAction::ChangeStatus, &facts))?;
        }
        task.completed_date = next_completed_date(task.completed_date, status, utc_now());
        task.status = status;
    }
    if let Some(title) = payload.title.as_deref() {
        task.title = required_title(title)?;
    }
    if payload.description.is_some() {
        task.description = payload.description.clone();
    }
    if let Some(priority) = payload.priority {
        task.priority = priority;
    }
    if payload.estimated_date.is_some() {
        task.estimated_date = payload.estimated_date;
    }

    sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, status = ?, priority = ?, estimated_date = ?, completed_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.status)
    .bind(task.priority)
    .bind(task.estimated_date)
    .bind(task.completed_date)
    .bind(utc_now())
    .bind(task_id)
    .execute(ctx.pool)
    .await?;

    if let Some(assignees) = payload.assignee_ids() {
        sqlx::query("DELETE FROM task_assignees WHERE task_id = ?")
            .bind(task_id)
            .execute(ctx.pool)
            .await?;
        assign(ctx.pool, task_id, dedup_ids(&assignees, None)).await?;
    }

    tracing::info!(actor_id = %ctx.actor.user_id, task_id = %task_id, "task updated");
    hydrate(ctx.pool, task_id).await
}

pub async fn change_status(ctx: &Context<'_>, task_id: Uuid, status: TaskStatus) -> AppResult<Task> {
    let (task, facts) = load_facts(ctx.pool, task_id).await?;
    ctx.authorize(&AccessRequest::Task(TaskAction::ChangeStatus, &facts))?;

    let completed_date = next_completed_date(task.completed_date, status, utc_now());
    sqlx::query("UPDATE tasks SET status = ?, completed_date = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(completed_date)
        .bind(utc_now())
        .bind(task_id)
        .execute(ctx.pool)
        .await?;

    tracing::info!(actor_id = %ctx.actor.user_id, task_id = %task_id, from = ?task.status, to = ?status, "task status changed");
    hydrate(ctx.pool, task_id).await
}

pub async fn delete(ctx: &Context<'_>, task_id: Uuid) -> AppResult<()> {
    let (_, facts) = load_facts(ctx.pool, task_id).await?;
    ctx.authorize(&AccessRequest::Task(TaskAction::Delete, &facts))?;

    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task_id)
        .execute(ctx.pool)
        .await?;

    tracing::info!(actor_id = %ctx.actor.user_id, task_id = %task_id, "task deleted");
    Ok(())
}

async fn fetch_comments(pool: &SqlitePool, task_id: Uuid) -> AppResult<Vec<Comment>> {
    let comments = sqlx::query_as::<_, Comment>(
        "SELECT c.id, c.task_id, c.user_id, u.name AS user_name, c.comment, c.created_at \
         FROM task_comments c JOIN users u ON u.id = c.user_id \
         WHERE c.task_id = ? ORDER BY c.created_at ASC, c.rowid ASC",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}

pub async fn add_comment(ctx: &Context<'_>, task_id: Uuid, payload: CommentCreateRequest) -> AppResult<Comment> {
    let (_, facts) = load_facts(ctx.pool, task_id).await?;
    ctx.authorize(&AccessRequest::Task(TaskAction::Comment, &facts))?;

    let text = payload.comment.trim();
    if text.is_empty() {
        return Err(AppError::validation("comment must not be empty"));
    }

    let comment_id = Uuid::new_v4();
    sqlx::query("INSERT INTO task_comments (id, task_id, user_id, comment, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(comment_id)
        .bind(task_id)
        .bind(ctx.actor.user_id)
        .bind(text)
        .bind(utc_now())
        .execute(ctx.pool)
        .await?;

    let comment = sqlx::query_as::<_, Comment>(
        "SELECT c.id, c.task_id, c.user_id, u.name AS user_name, c.comment, c.created_at \
         FROM task_comments c JOIN users u ON u.id = c.user_id WHERE c.id = ?",
    )
    .bind(comment_id)
    .fetch_one(ctx.pool)
    .await?;
    Ok(comment)
}

pub async fn list_comments(ctx: &Context<'_>, task_id: Uuid) -> AppResult<Vec<Comment>> {
    let (_, facts) = load_facts(ctx.pool, task_id).await?;
    ctx.authorize(&AccessRequest::Task(TaskAction::Read, &facts))?;
    fetch_comments(ctx.pool, task_id).await
}

pub(crate) async fn grouped_counts(ctx: &Context<'_>, project_id: Option<Uuid>) -> AppResult<Vec<(TaskStatus, Priority, i64)>> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT t.status, t.priority, COUNT(*) FROM tasks t WHERE ");
    ctx.filter(Collection::Tasks).push_sql(&mut qb);
    if let Some(project_id) = project_id {
        qb.push(" AND t.project_id = ").push_bind(project_id);
    }
    qb.push(" GROUP BY t.status, t.priority");
    Ok(qb.build_query_as().fetch_all(ctx.pool).await?)
}

pub async fn stats(ctx: &Context<'_>, query: &TaskStatsQuery) -> AppResult<TaskStats> {
    let rows = grouped_counts(ctx, query.project_id).await?;
    let by_status: TaskStatusCounts = rows.iter().map(|(status, _, count)| (*status, *count)).collect();
    let by_priority: PriorityCounts = rows.iter().map(|(_, priority, count)| (*priority, *count)).collect();
    Ok(TaskStats {
        completion_rate: by_status.completion_rate(),
        by_status,
        by_priority,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invariant_holds(status: TaskStatus, completed: Option<DateTime<Utc>>) -> bool {
        (status == TaskStatus::Completed) == completed.is_some()
    }

    #[test]
    fn test_completion_stamp_follows_status() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::minutes(5);

        let stamp = next_completed_date(None, TaskStatus::Completed, t0);
        assert_eq!(stamp, Some(t0));
        assert_eq!(next_completed_date(stamp, TaskStatus::Completed, t1), Some(t0));
        assert_eq!(next_completed_date(stamp, TaskStatus::Pending, t1), None);
        assert_eq!(next_completed_date(None, TaskStatus::InProgress, t1), None);
    }

    #[test]
    fn test_invariant_over_transition_sequences() {
        let statuses = [TaskStatus::Pending, TaskStatus::InProgress, TaskStatus::Completed];
        let mut now = Utc::now();
        for first in statuses {
            for second in statuses {
                for third in statuses {
                    let mut stamp = next_completed_date(None, first, now);
                    assert!(invariant_holds(first, stamp));
                    for next in [second, third] {
                        now += Duration::seconds(1);
                        stamp = next_completed_date(stamp, next, now);
                        assert!(invariant_holds(next, stamp));
                    }
                }
            }
        }
    }
}
