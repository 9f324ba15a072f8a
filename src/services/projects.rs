use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{dedup_ids, insert_concurrently, push_search, Context};
use crate::authz::{area_for_role, member_role_for, AccessRequest, Collection, ProjectAction, ProjectFacts, Role};
use crate::errors::{AppError, AppResult};
use crate::models::project::{
    DbProject, Priority, Project, ProjectCreateRequest, ProjectListQuery, ProjectMember, ProjectStats,
    ProjectStatus, ProjectUpdateRequest,
};
use crate::models::stats::{PriorityCounts, TaskStatusCounts};
use crate::models::task::TaskStatus;
use crate::utils::utc_now;

pub(crate) const PROJECT_COLUMNS: &str = "p.id, p.name, p.description, p.status, p.priority, p.area, p.created_by, p.start_date, p.end_date, p.created_at, p.updated_at";

pub(crate) async fn fetch_project(pool: &SqlitePool, project_id: Uuid) -> AppResult<DbProject> {
    sqlx::query_as::<_, DbProject>(&format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?"))
        .bind(project_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("project not found"))
}

pub(crate) async fn member_ids(pool: &SqlitePool, project_id: Uuid) -> AppResult<Vec<Uuid>> {
    let ids = sqlx::query_scalar("SELECT user_id FROM project_members WHERE project_id = ? ORDER BY joined_at, rowid")
        .bind(project_id)
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// The project row together with the facts the policy engine decides on.
pub(crate) async fn load_facts(pool: &SqlitePool, project_id: Uuid) -> AppResult<(DbProject, ProjectFacts)> {
    let project = fetch_project(pool, project_id).await?;
    let members = member_ids(pool, project_id).await?;
    let facts = project.facts(members);
    Ok((project, facts))
}

/// Members of every listed project, creator first, then by join time.
pub(crate) async fn members_by_project(pool: &SqlitePool, projects: &[DbProject]) -> AppResult<HashMap<Uuid, Vec<ProjectMember>>> {
    let mut grouped: HashMap<Uuid, Vec<ProjectMember>> = HashMap::new();
    if projects.is_empty() {
        return Ok(grouped);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT pm.project_id, pm.user_id, u.name, u.email, pm.role, pm.joined_at, (pm.user_id = p.created_by) AS is_creator \
         FROM project_members pm \
         JOIN users u ON u.id = pm.user_id \
         JOIN projects p ON p.id = pm.project_id \
         WHERE pm.project_id IN (",
    );
    let mut ids = qb.separated(", ");
    for project in projects {
        ids.push_bind(project.id);
    }
    ids.push_unseparated(") ORDER BY is_creator DESC, pm.joined_at ASC, pm.rowid ASC");

    #[derive(sqlx::FromRow)]
    struct MemberRow {
        project_id: Uuid,
        #[sqlx(flatten)]
        member: ProjectMember,
    }

    let rows = qb.build_query_as::<MemberRow>().fetch_all(pool).await?;
    for row in rows {
        grouped.entry(row.project_id).or_default().push(row.member);
    }
    Ok(grouped)
}

pub(crate) async fn with_members(pool: &SqlitePool, projects: Vec<DbProject>) -> AppResult<Vec<Project>> {
    let mut members = members_by_project(pool, &projects).await?;
    Ok(projects
        .into_iter()
        .map(|project| {
            let list = members.remove(&project.id).unwrap_or_default();
            project.into_project(list)
        })
        .collect())
}

async fn hydrate(pool: &SqlitePool, project_id: Uuid) -> AppResult<Project> {
    let project = fetch_project(pool, project_id).await?;
    let mut list = with_members(pool, vec![project]).await?;
    list.pop().ok_or_else(|| AppError::not_found("project not found"))
}

fn validate_dates(start: Option<NaiveDate>, end: Option<NaiveDate>) -> AppResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(AppError::validation("end_date must not be before start_date")),
        _ => Ok(()),
    }
}

async fn user_role(conn: &mut SqliteConnection, user_id: Uuid) -> AppResult<Option<Role>> {
    let role = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(role)
}

/// Inserts a membership unless it exists. `false` when the user is unknown.
async fn insert_member(conn: &mut SqliteConnection, project_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> AppResult<bool> {
    let Some(role) = user_role(&mut *conn, user_id).await? else {
        return Ok(false);
    };

    sqlx::query("INSERT OR IGNORE INTO project_members (project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
        .bind(project_id)
        .bind(user_id)
        .bind(member_role_for(role))
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(true)
}

fn log_skipped(project_id: Uuid, skipped: &[Uuid]) {
    for user_id in skipped {
        tracing::warn!(project_id = %project_id, user_id = %user_id, "skipping unknown member");
    }
}

pub async fn create(ctx: &Context<'_>, payload: ProjectCreateRequest) -> AppResult<Project> {
    ctx.authorize(&AccessRequest::CreateProject)?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    validate_dates(payload.start_date, payload.end_date)?;

    let creator = ctx.actor;
    let area = area_for_role(creator.role);
    let now = utc_now();
    let project_id = Uuid::new_v4();

    let mut tx = ctx.pool.begin().await?;
    sqlx::query(
        "INSERT INTO projects (id, name, description, status, priority, area, created_by, start_date, end_date, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(project_id)
    .bind(name)
    .bind(&payload.description)
    .bind(payload.status.unwrap_or_default())
    .bind(payload.priority.unwrap_or_default())
    .bind(area)
    .bind(creator.user_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO project_members (project_id, user_id, role, joined_at) VALUES (?, ?, ?, ?)")
        .bind(project_id)
        .bind(creator.user_id)
        .bind(member_role_for(creator.role))
        .bind(now)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    let extra = dedup_ids(&payload.members, Some(creator.user_id));
    let pool = ctx.pool.clone();
    let skipped = insert_concurrently(extra, move |user_id| {
        let pool = pool.clone();
        async move {
            let mut conn = pool.acquire().await?;
            insert_member(&mut conn, project_id, user_id, utc_now()).await
        }
    })
    .await?;
    log_skipped(project_id, &skipped);

    tracing::info!(actor_id = %creator.user_id, project_id = %project_id, area = %area, "project created");
    hydrate(ctx.pool, project_id).await
}

pub async fn get(ctx: &Context<'_>, project_id: Uuid) -> AppResult<Project> {
    let (_, facts) = load_facts(ctx.pool, project_id).await?;
    ctx.authorize(&AccessRequest::Project(ProjectAction::Read, &facts))?;
    hydrate(ctx.pool, project_id).await
}

pub async fn list(ctx: &Context<'_>, query: &ProjectListQuery) -> AppResult<Vec<Project>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE "));
    ctx.filter(Collection::Projects).push_sql(&mut qb);
    if let Some(status) = query.status {
        qb.push(" AND p.status = ").push_bind(status);
    }
    if let Some(priority) = query.priority {
        qb.push(" AND p.priority = ").push_bind(priority);
    }
    push_search(&mut qb, &["p.name", "p.description"], query.search.as_deref());
    qb.push(" ORDER BY p.created_at DESC");

    let projects = qb.build_query_as::<DbProject>().fetch_all(ctx.pool).await?;
    with_members(ctx.pool, projects).await
}

pub async fn update(ctx: &Context<'_>, project_id: Uuid, payload: ProjectUpdateRequest) -> AppResult<Project> {
    let (mut project, facts) = load_facts(ctx.pool, project_id).await?;
    ctx.authorize(&AccessRequest::Project(ProjectAction::Update, &facts))?;

    if let Some(name) = payload.name.as_deref() {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        project.name = name.to_string();
    }
    if payload.description.is_some() {
        project.description = payload.description;
    }
    if let Some(status) = payload.status {
        project.status = status;
    }
    if let Some(priority) = payload.priority {
        project.priority = priority;
    }
    if payload.start_date.is_some() {
        project.start_date = payload.start_date;
    }
    if payload.end_date.is_some() {
        project.end_date = payload.end_date;
    }
    validate_dates(project.start_date, project.end_date)?;

    let now = utc_now();
    let mut tx = ctx.pool.begin().await?;
    sqlx::query(
        "UPDATE projects SET name = ?, description = ?, status = ?, priority = ?, start_date = ?, end_date = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&project.name)
    .bind(&project.description)
    .bind(project.status)
    .bind(project.priority)
    .bind(project.start_date)
    .bind(project.end_date)
    .bind(now)
    .bind(project_id)
    .execute(&mut *tx)
    .await?;

    if let Some(members) = payload.members.as_deref() {
        sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id != ?")
            .bind(project_id)
            .bind(project.created_by)
            .execute(&mut *tx)
            .await?;

        let mut skipped = Vec::new();
        for user_id in dedup_ids(members, Some(project.created_by)) {
            if !insert_member(&mut tx, project_id, user_id, now).await? {
                skipped.push(user_id);
            }
        }
        log_skipped(project_id, &skipped);
    }
    tx.commit().await?;

    tracing::info!(actor_id = %ctx.actor.user_id, project_id = %project_id, "project updated");
    hydrate(ctx.pool, project_id).await
}

pub async fn delete(ctx: &Context<'_>, project_id: Uuid) -> AppResult<()> {
    let (_, facts) = load_facts(ctx.pool, project_id).await?;
    ctx.authorize(&AccessRequest::Project(ProjectAction::Delete, &facts))?;

    // Tasks, their comments and assignees, and memberships go with it.
    sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(project_id)
        .execute(ctx.pool)
        .await?;

    tracing::info!(actor_id = %ctx.actor.user_id, project_id = %project_id, "project deleted");
    Ok(())
}

pub async fn add_member(ctx: &Context<'_>, project_id: Uuid, user_id: Uuid) -> AppResult<Project> {
    let (_, facts) = load_facts(ctx.pool, project_id).await?;
    ctx.authorize(&AccessRequest::Project(ProjectAction::AddMember, &facts))?;

    if facts.is_member(user_id) {
        return Err(AppError::conflict("user is already a member of this project"));
    }

    let mut conn = ctx.pool.acquire().await?;
    if !insert_member(&mut conn, project_id, user_id, utc_now()).await? {
        return Err(AppError::not_found("user not found"));
    }

    tracing::info!(actor_id = %ctx.actor.user_id, project_id = %project_id, user_id = %user_id, "member added");
    hydrate(ctx.pool, project_id).await
}

pub async fn remove_member(ctx: &Context<'_>, project_id: Uuid, user_id: Uuid) -> AppResult<Project> {
    let (_, facts) = load_facts(ctx.pool, project_id).await?;
    ctx.authorize(&AccessRequest::Project(ProjectAction::RemoveMember, &facts))?;

    if facts.is_creator(user_id) {
        return Err(AppError::conflict("the project creator cannot be removed"));
    }

    let removed = sqlx::query("DELETE FROM project_members WHERE project_id = ? AND user_id = ?")
        .bind(project_id)
        .bind(user_id)
        .execute(ctx.pool)
        .await?
        .rows_affected();
    if removed == 0 {
        return Err(AppError::not_found("user is not a member of this project"));
    }

    tracing::info!(actor_id = %ctx.actor.user_id, project_id = %project_id, user_id = %user_id, "member removed");
    hydrate(ctx.pool, project_id).await
}

pub async fn stats(ctx: &Context<'_>, project_id: Uuid) -> AppResult<ProjectStats> {
    let (_, facts) = load_facts(ctx.pool, project_id).await?;
    ctx.authorize(&AccessRequest::Project(ProjectAction::Read, &facts))?;

    let rows: Vec<(TaskStatus, Priority, i64)> =
        sqlx::query_as("SELECT status, priority, COUNT(*) FROM tasks WHERE project_id = ? GROUP BY status, priority")
            .bind(project_id)
            .fetch_all(ctx.pool)
            .await?;

    let tasks_by_status: TaskStatusCounts = rows.iter().map(|(status, _, count)| (*status, *count)).collect();
    let tasks_by_priority: PriorityCounts = rows.iter().map(|(_, priority, count)| (*priority, *count)).collect();

    Ok(ProjectStats {
        project_id,
        completion_rate: tasks_by_status.completion_rate(),
        tasks_by_status,
        tasks_by_priority,
    })
}

pub(crate) async fn status_counts(ctx: &Context<'_>) -> AppResult<Vec<(ProjectStatus, i64)>> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT p.status, COUNT(*) FROM projects p WHERE ");
    ctx.filter(Collection::Projects).push_sql(&mut qb);
    qb.push(" GROUP BY p.status");
    Ok(qb.build_query_as().fetch_all(ctx.pool).await?)
}
