use std::collections::BTreeMap;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::{push_search, Context};
use crate::authz::{AccessRequest, Collection, ManagerForest, Role, UserAction};
use crate::errors::{AppError, AppResult};
use crate::models::user::{
    DbUser, RoleCount, User, UserCreateRequest, UserCreatedResponse, UserListQuery, UserStats, UserUpdateRequest,
};
use crate::utils::{generate_temporary_password, hash_password, utc_now};

pub(crate) const USER_COLUMNS: &str =
    "u.id, u.name, u.email, u.password_hash, u.role, u.manager_id, u.is_active, u.created_at, u.updated_at";

pub(crate) async fn fetch_user(pool: &SqlitePool, user_id: Uuid) -> AppResult<DbUser> {
    sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("user not found"))
}

pub(crate) async fn fetch_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(&format!("SELECT {USER_COLUMNS} FROM users u WHERE u.email = ?"))
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

async fn ensure_email_available(pool: &SqlitePool, email: &str, except: Option<Uuid>) -> AppResult<()> {
    match fetch_user_by_email(pool, email).await? {
        Some(existing) if Some(existing.id) != except => Err(AppError::conflict("email already in use")),
        _ => Ok(()),
    }
}

async fn load_forest(pool: &SqlitePool) -> AppResult<ManagerForest> {
    let edges: Vec<(Uuid, Option<Uuid>)> = sqlx::query_as("SELECT id, manager_id FROM users")
        .fetch_all(pool)
        .await?;
    Ok(ManagerForest::from_edges(edges))
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::validation("email must be a valid address")),
    }
}

fn required_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name must not be empty"));
    }
    Ok(name.to_string())
}

pub async fn list(ctx: &Context<'_>, query: &UserListQuery) -> AppResult<Vec<User>> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE "));
    ctx.filter(Collection::Users).push_sql(&mut qb);
    if let Some(role) = query.role {
        qb.push(" AND u.role = ").push_bind(role);
    }
    if let Some(is_active) = query.is_active {
        qb.push(" AND u.is_active = ").push_bind(is_active);
    }
    if let Some(manager_id) = query.manager_id {
        qb.push(" AND u.manager_id = ").push_bind(manager_id);
    }
    push_search(&mut qb, &["u.name", "u.email"], query.search.as_deref());
    qb.push(" ORDER BY u.name ASC");

    let users = qb.build_query_as::<DbUser>().fetch_all(ctx.pool).await?;
    Ok(users.into_iter().map(User::from).collect())
}

pub async fn get(ctx: &Context<'_>, user_id: Uuid) -> AppResult<User> {
    let target = fetch_user(ctx.pool, user_id).await?;
    ctx.authorize(&AccessRequest::User(UserAction::Read, &target.facts()))?;
    Ok(target.into())
}

pub async fn create(ctx: &Context<'_>, payload: UserCreateRequest) -> AppResult<UserCreatedResponse> {
    ctx.authorize(&AccessRequest::CreateUser(payload.role))?;

    let name = required_name(&payload.name)?;
    let email = normalize_email(&payload.email)?;
    ensure_email_available(ctx.pool, &email, None).await?;

    let (password, temporary_password) = match payload.password {
        Some(password) => (password, None),
        None => {
            let generated = generate_temporary_password();
            (generated.clone(), Some(generated))
        }
    };
    let password_hash = hash_password(&password)?;

    let now = utc_now();
    let user_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, manager_id, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)",
    )
    .bind(user_id)
    .bind(&name)
    .bind(&email)
    .bind(password_hash)
    .bind(payload.role)
    .bind(ctx.actor.user_id)
    .bind(now)
    .bind(now)
    .execute(ctx.pool)
    .await?;

    tracing::info!(actor_id = %ctx.actor.user_id, user_id = %user_id, role = %payload.role, "user created");

    let user = fetch_user(ctx.pool, user_id).await?;
    Ok(UserCreatedResponse {
        user: user.into(),
        temporary_password,
    })
}

pub async fn update(ctx: &Context<'_>, user_id: Uuid, payload: UserUpdateRequest) -> AppResult<User> {
    let mut target = fetch_user(ctx.pool, user_id).await?;
    let facts = target.facts();
    ctx.authorize(&AccessRequest::User(UserAction::Update, &facts))?;

    if let Some(role) = payload.role {
        ctx.authorize(&AccessRequest::AssignRole(&facts, role))?;
        target.role = role;
    }

    if let Some(name) = payload.name.as_deref() {
        target.name = required_name(name)?;
    }

    if let Some(email) = payload.email.as_deref() {
        let email = normalize_email(email)?;
        ensure_email_available(ctx.pool, &email, Some(target.id)).await?;
        target.email = email;
    }

    if let Some(is_active) = payload.is_active {
        if !is_active && target.id == ctx.actor.user_id {
            return Err(AppError::validation("you cannot deactivate your own account"));
        }
        target.is_active = is_active;
    }

    match payload.manager_id {
        Some(manager_id) if ctx.actor.is_department_head() => {
            if target.manager_id != Some(manager_id) {
                match fetch_user(ctx.pool, manager_id).await {
                    Ok(_) => {}
                    Err(AppError::NotFound(_)) => return Err(AppError::not_found("manager not found")),
                    Err(err) => return Err(err),
                }
                if load_forest(ctx.pool).await?.would_create_cycle(target.id, manager_id) {
                    return Err(AppError::conflict("manager assignment would create a reporting cycle"));
                }
                target.manager_id = Some(manager_id);
            }
        }
        Some(_) => {
            tracing::debug!(actor_id = %ctx.actor.user_id, user_id = %user_id, "manager change ignored for non-head");
        }
        None => {}
    }

    sqlx::query(
        "UPDATE users SET name = ?, email = ?, role = ?, manager_id = ?, is_active = ?, updated_at = ? WHERE id = ?",
    )
    .bind(&target.name)
    .bind(&target.email)
    .bind(target.role)
    .bind(target.manager_id)
    .bind(target.is_active)
    .bind(utc_now())
    .bind(target.id)
    .execute(ctx.pool)
    .await?;

    tracing::info!(actor_id = %ctx.actor.user_id, user_id = %user_id, "user updated");

    Ok(fetch_user(ctx.pool, user_id).await?.into())
}

pub async fn delete(ctx: &Context<'_>, user_id: Uuid) -> AppResult<()> {
    let target = fetch_user(ctx.pool, user_id).await?;
    ctx.authorize(&AccessRequest::User(UserAction::Delete, &target.facts()))?;

    let subordinates: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE manager_id = ?")
        .bind(user_id)
        .fetch_one(ctx.pool)
        .await?;
    if subordinates > 0 {
        return Err(AppError::conflict(format!(
            "user still manages {subordinates} user(s); reassign them first"
        )));
    }

    let owned: i64 = sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM projects WHERE created_by = ?1) + (SELECT COUNT(*) FROM tasks WHERE created_by = ?1)",
    )
    .bind(user_id)
    .fetch_one(ctx.pool)
    .await?;
    if owned > 0 {
        return Err(AppError::conflict("user still owns projects or tasks"));
    }

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user_id)
        .execute(ctx.pool)
        .await?;

    tracing::info!(actor_id = %ctx.actor.user_id, user_id = %user_id, "user deleted");
    Ok(())
}

pub async fn my_team(ctx: &Context<'_>) -> AppResult<Vec<User>> {
    let users = sqlx::query_as::<_, DbUser>(&format!(
        "SELECT {USER_COLUMNS} FROM users u WHERE u.manager_id = ? ORDER BY u.name ASC"
    ))
    .bind(ctx.actor.user_id)
    .fetch_all(ctx.pool)
    .await?;
    Ok(users.into_iter().map(User::from).collect())
}

pub async fn stats(ctx: &Context<'_>) -> AppResult<UserStats> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT u.role, u.is_active, COUNT(*) FROM users u WHERE ");
    ctx.filter(Collection::Users).push_sql(&mut qb);
    qb.push(" GROUP BY u.role, u.is_active");

    let rows: Vec<(Role, bool, i64)> = qb.build_query_as().fetch_all(ctx.pool).await?;
    Ok(summarize(&rows))
}

fn summarize(rows: &[(Role, bool, i64)]) -> UserStats {
    let mut by_role: BTreeMap<&'static str, RoleCount> = BTreeMap::new();
    let (mut active, mut inactive) = (0, 0);
    for (role, is_active, count) in rows {
        if *is_active {
            active += count;
        } else {
            inactive += count;
        }
        by_role
            .entry(role.as_str())
            .or_insert(RoleCount { role: *role, count: 0 })
            .count += count;
    }

    UserStats {
        total: active + inactive,
        active,
        inactive,
        by_role: by_role.into_values().collect(),
    }
}

/// Creates a department head without an acting user. Only reachable from the CLI.
pub async fn bootstrap_head(pool: &SqlitePool, name: &str, email: &str, password: &str, role: Role) -> AppResult<User> {
    if !role.is_department_head() {
        return Err(AppError::validation("bootstrap accounts must be department heads"));
    }

    let name = required_name(name)?;
    let email = normalize_email(email)?;
    ensure_email_available(pool, &email, None).await?;
    let password_hash = hash_password(password)?;

    let now = utc_now();
    let user_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO users (id, name, email, password_hash, role, manager_id, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, NULL, 1, ?, ?)",
    )
    .bind(user_id)
    .bind(&name)
    .bind(&email)
    .bind(password_hash)
    .bind(role)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, role = %role, "department head bootstrapped");
    Ok(fetch_user(pool, user_id).await?.into())
}
