//! Monthly reporting for department heads.
//!
//! Loading and aggregation are split: [`load`] selects the rows the caller
//! may see inside the month window, [`MonthlyReport::build`] turns them into
//! the report without touching the database.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use super::projects::{with_members, PROJECT_COLUMNS};
use super::tasks::{with_assignees, TASK_COLUMNS};
use super::users::USER_COLUMNS;
use super::Context;
use crate::authz::{Area, Collection};
use crate::errors::{AppError, AppResult};
use crate::models::project::{DbProject, Project, ProjectStatus};
use crate::models::report::{
    AreaMetrics, AvailableMonth, MonthlyReport, ProjectRollup, ReportPeriod, ReportPreview, ReportSummary,
    TaskReportRow, TimelineEvent, TimelineEventKind, WorkerStats,
};
use crate::models::stats::{percentage, TaskStatusCounts};
use crate::models::task::{DbTask, Task};
use crate::models::user::{DbUser, User};
use crate::utils::{month_window, recent_months, utc_now};

const FIRST_REPORT_YEAR: i32 = 2020;
const AVAILABLE_MONTHS: usize = 12;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn month_name(month: u32) -> &'static str {
    MONTH_NAMES
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("Unknown")
}

/// Accepts years from 2020 through next year and months 1..=12.
pub fn validate_period(year: i32, month: u32, now: DateTime<Utc>) -> AppResult<ReportPeriod> {
    if !(FIRST_REPORT_YEAR..=now.year() + 1).contains(&year) {
        return Err(AppError::validation(format!(
            "year must be between {FIRST_REPORT_YEAR} and {}",
            now.year() + 1
        )));
    }
    if !(1..=12).contains(&month) {
        return Err(AppError::validation("month must be between 1 and 12"));
    }

    let (start, end) = month_window(year, month)?;
    Ok(ReportPeriod {
        year,
        month,
        month_name: month_name(month).to_string(),
        start_date: start.date_naive(),
        end_date: (end - Duration::days(1)).date_naive(),
    })
}

/// Rows visible to the caller that fall inside one month window.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub period: ReportPeriod,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub users: Vec<User>,
    pub projects: Vec<Project>,
    pub tasks: Vec<Task>,
    /// Names of every creator referenced by `projects` and `tasks`.
    pub names: HashMap<Uuid, String>,
    /// Names of every project a task in `tasks` belongs to.
    pub project_names: HashMap<Uuid, String>,
}

impl ReportData {
    fn in_window(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }

    fn name_of(&self, user_id: Uuid) -> Option<String> {
        self.names.get(&user_id).cloned()
    }
}

impl ReportSummary {
    pub fn build(data: &ReportData) -> Self {
        let counts: TaskStatusCounts = data.tasks.iter().map(|task| (task.status, 1)).collect();
        ReportSummary {
            total_tasks: counts.total,
            completed_tasks: counts.completed,
            in_progress_tasks: counts.in_progress,
            pending_tasks: counts.pending,
            total_projects: data.projects.len() as i64,
            active_projects: data
                .projects
                .iter()
                .filter(|project| project.status == ProjectStatus::Active)
                .count() as i64,
            total_workers: data.users.iter().filter(|user| user.is_active).count() as i64,
            completion_rate: counts.completion_rate(),
        }
    }
}

impl MonthlyReport {
    pub fn build(data: &ReportData) -> Self {
        MonthlyReport {
            period: data.period.clone(),
            summary: ReportSummary::build(data),
            workers: worker_stats(data),
            projects: project_rollups(data),
            areas: [Area::Dev, Area::Workforce]
                .into_iter()
                .map(|area| area_metrics(data, area))
                .collect(),
            timeline: timeline(data),
            tasks: task_rows(data),
        }
    }
}

fn worker_stats(data: &ReportData) -> Vec<WorkerStats> {
    data.users
        .iter()
        .map(|user| {
            let assigned: Vec<&Task> = data
                .tasks
                .iter()
                .filter(|task| task.assignees.iter().any(|a| a.user_id == user.id))
                .collect();
            let counts: TaskStatusCounts = assigned.iter().map(|task| (task.status, 1)).collect();
            let projects = data
                .projects
                .iter()
                .filter(|project| project.created_by == user.id || project.members.iter().any(|m| m.user_id == user.id))
                .count() as i64;

            WorkerStats {
                user_id: user.id,
                name: user.name.clone(),
                role: user.role,
                area: user.area,
                total_tasks: counts.total,
                completed_tasks: counts.completed,
                in_progress_tasks: counts.in_progress,
                pending_tasks: counts.pending,
                completion_rate: counts.completion_rate(),
                projects,
                last_activity: assigned.iter().map(|task| task.updated_at).max(),
            }
        })
        .collect()
}

fn project_rollups(data: &ReportData) -> Vec<ProjectRollup> {
    data.projects
        .iter()
        .map(|project| {
            let counts: TaskStatusCounts = data
                .tasks
                .iter()
                .filter(|task| task.project_id == project.id)
                .map(|task| (task.status, 1))
                .collect();

            ProjectRollup {
                project_id: project.id,
                name: project.name.clone(),
                status: project.status,
                priority: project.priority,
                area: project.area,
                creator_name: data.name_of(project.created_by),
                member_names: project.members.iter().map(|m| m.name.clone()).collect(),
                total_tasks: counts.total,
                completed_tasks: counts.completed,
                in_progress_tasks: counts.in_progress,
                created_at: project.created_at,
                updated_at: project.updated_at,
            }
        })
        .collect()
}

fn area_metrics(data: &ReportData, area: Area) -> AreaMetrics {
    let counts: TaskStatusCounts = data
        .tasks
        .iter()
        .filter(|task| task.area == area)
        .map(|task| (task.status, 1))
        .collect();

    AreaMetrics {
        area,
        workers: data.users.iter().filter(|user| user.area == area).count() as i64,
        total_tasks: counts.total,
        completed_tasks: counts.completed,
        in_progress_tasks: counts.in_progress,
        completion_rate: percentage(counts.completed, counts.total),
    }
}

fn timeline(data: &ReportData) -> Vec<TimelineEvent> {
    let mut events = Vec::new();

    for task in &data.tasks {
        if data.in_window(task.created_at) {
            events.push(TimelineEvent {
                at: task.created_at,
                kind: TimelineEventKind::TaskCreated,
                subject_id: task.id,
                subject: task.title.clone(),
                user_name: data.name_of(task.created_by),
            });
        }
        if let Some(completed) = task.completed_date.filter(|at| data.in_window(*at)) {
            let completed_by = task
                .assignees
                .first()
                .map(|a| a.name.clone())
                .or_else(|| data.name_of(task.created_by));
            events.push(TimelineEvent {
                at: completed,
                kind: TimelineEventKind::TaskCompleted,
                subject_id: task.id,
                subject: task.title.clone(),
                user_name: completed_by,
            });
        }
    }

    for project in data.projects.iter().filter(|p| data.in_window(p.created_at)) {
        events.push(TimelineEvent {
            at: project.created_at,
            kind: TimelineEventKind::ProjectCreated,
            subject_id: project.id,
            subject: project.name.clone(),
            user_name: data.name_of(project.created_by),
        });
    }

    events.sort_by_key(|event| event.at);
    events
}

fn days_open(task: &Task, period_end: DateTime<Utc>) -> i64 {
    let until = task.completed_date.unwrap_or(period_end).min(period_end);
    let seconds = (until - task.created_at).num_seconds().max(0);
    (seconds + 86_399) / 86_400
}

fn task_rows(data: &ReportData) -> Vec<TaskReportRow> {
    let mut rows: Vec<TaskReportRow> = data
        .tasks
        .iter()
        .map(|task| TaskReportRow {
            task_id: task.id,
            title: task.title.clone(),
            description: task.description.clone(),
            project_name: data.project_names.get(&task.project_id).cloned(),
            assignee_names: task.assignees.iter().map(|a| a.name.clone()).collect(),
            creator_name: data.name_of(task.created_by),
            status: task.status,
            priority: task.priority,
            estimated_date: task.estimated_date,
            completed_date: task.completed_date,
            created_at: task.created_at,
            days_open: days_open(task, data.end),
        })
        .collect();
    rows.sort_by_key(|row| row.created_at);
    rows
}

/// The last twelve months, oldest first, with the current one flagged.
pub fn available_months(now: DateTime<Utc>) -> Vec<AvailableMonth> {
    let mut months: Vec<AvailableMonth> = recent_months(now, AVAILABLE_MONTHS)
        .into_iter()
        .map(|(year, month)| AvailableMonth {
            year,
            month,
            month_name: month_name(month).to_string(),
            label: format!("{} {year}", month_name(month)),
            is_current: year == now.year() && month == now.month(),
        })
        .collect();
    months.reverse();
    months
}

fn require_head(ctx: &Context<'_>) -> AppResult<Area> {
    ctx.actor
        .head_area()
        .ok_or_else(|| AppError::forbidden("only department heads can view reports"))
}

/// `id -> name` for the given ids of `table` (`users` or `projects`).
async fn names_by_id(pool: &SqlitePool, table: &str, ids: HashSet<Uuid>) -> AppResult<HashMap<Uuid, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT id, name FROM {table} WHERE id IN ("));
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(id);
    }
    list.push_unseparated(")");

    let rows: Vec<(Uuid, String)> = qb.build_query_as().fetch_all(pool).await?;
    Ok(rows.into_iter().collect())
}

/// Selects the caller's report slice for `year`/`month`.
pub async fn load(ctx: &Context<'_>, year: i32, month: u32) -> AppResult<ReportData> {
    let area = require_head(ctx)?;
    let period = validate_period(year, month, utc_now())?;
    let (start, end) = month_window(year, month)?;
    tracing::debug!(actor_id = %ctx.actor.user_id, area = %area, year, month, "loading report data");

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users u WHERE "));
    ctx.filter(Collection::Users).push_sql(&mut qb);
    qb.push(" ORDER BY u.name ASC");
    let users: Vec<User> = qb
        .build_query_as::<DbUser>()
        .fetch_all(ctx.pool)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE "));
    ctx.filter(Collection::Tasks).push_sql(&mut qb);
    qb.push(" AND ((t.created_at >= ").push_bind(start).push(" AND t.created_at < ").push_bind(end);
    qb.push(") OR (t.updated_at >= ").push_bind(start).push(" AND t.updated_at < ").push_bind(end);
    qb.push(") OR (t.completed_date >= ").push_bind(start).push(" AND t.completed_date < ").push_bind(end);
    qb.push(")) ORDER BY t.created_at ASC");
    let tasks = qb.build_query_as::<DbTask>().fetch_all(ctx.pool).await?;
    let tasks = with_assignees(ctx.pool, tasks).await?;

    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE "));
    ctx.filter(Collection::Projects).push_sql(&mut qb);
    qb.push(" AND ((p.created_at >= ").push_bind(start).push(" AND p.created_at < ").push_bind(end);
    qb.push(") OR (p.updated_at >= ").push_bind(start).push(" AND p.updated_at < ").push_bind(end);
    qb.push(") OR p.status = ").push_bind(ProjectStatus::Active);
    qb.push(") ORDER BY p.created_at ASC");
    let projects = qb.build_query_as::<DbProject>().fetch_all(ctx.pool).await?;
    let projects = with_members(ctx.pool, projects).await?;

    let creators = projects
        .iter()
        .map(|p| p.created_by)
        .chain(tasks.iter().map(|t| t.created_by))
        .collect();
    let names = names_by_id(ctx.pool, "users", creators).await?;
    let project_ids = tasks.iter().map(|t| t.project_id).collect();
    let project_names = names_by_id(ctx.pool, "projects", project_ids).await?;

    Ok(ReportData {
        period,
        start,
        end,
        users,
        projects,
        tasks,
        names,
        project_names,
    })
}

pub async fn monthly(ctx: &Context<'_>, year: i32, month: u32) -> AppResult<MonthlyReport> {
    let data = load(ctx, year, month).await?;
    Ok(MonthlyReport::build(&data))
}

pub async fn preview(ctx: &Context<'_>, year: i32, month: u32) -> AppResult<ReportPreview> {
    let data = load(ctx, year, month).await?;
    Ok(ReportPreview {
        summary: ReportSummary::build(&data),
        period: data.period,
    })
}

pub fn available(ctx: &Context<'_>) -> AppResult<Vec<AvailableMonth>> {
    require_head(ctx)?;
    Ok(available_months(utc_now()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{ProjectRole, Role};
    use crate::models::project::{Priority, ProjectMember};
    use crate::models::task::{TaskAssignee, TaskStatus};
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, day, hour, 0, 0).unwrap()
    }

    fn user(name: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
            area: role.area(),
            manager_id: None,
            is_active: true,
            created_at: at(1, 0),
            updated_at: at(1, 0),
        }
    }

    fn project(name: &str, creator: &User, members: &[&User], created_at: DateTime<Utc>) -> Project {
        Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            status: ProjectStatus::Active,
            priority: Priority::High,
            area: creator.area,
            created_by: creator.id,
            start_date: None,
            end_date: None,
            created_at,
            updated_at: created_at,
            members: members
                .iter()
                .map(|m| ProjectMember {
                    user_id: m.id,
                    name: m.name.clone(),
                    email: m.email.clone(),
                    role: ProjectRole::Developer,
                    joined_at: created_at,
                })
                .collect(),
        }
    }

    fn task(title: &str, project: &Project, assignee: &User, status: TaskStatus, created_at: DateTime<Utc>) -> Task {
        let completed_date = (status == TaskStatus::Completed).then(|| created_at + Duration::hours(2));
        Task {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            status,
            priority: Priority::Medium,
            estimated_date: None,
            completed_date,
            project_id: project.id,
            created_by: project.created_by,
            area: project.area,
            assigned_to: Some(assignee.id),
            assignees: vec![TaskAssignee {
                task_id: Uuid::nil(),
                user_id: assignee.id,
                name: assignee.name.clone(),
                assigned_at: created_at,
            }],
            created_at,
            updated_at: completed_date.unwrap_or(created_at),
        }
    }

    fn sample() -> ReportData {
        let head = user("Hana", Role::DeptHeadDev);
        let ada = user("Ada", Role::Developer);
        let linus = user("Linus", Role::Developer);
        let billing = project("Billing", &head, &[&head, &ada, &linus], at(2, 9));
        let tasks = vec![
            task("Schema", &billing, &ada, TaskStatus::Completed, at(3, 10)),
            task("Exporter", &billing, &ada, TaskStatus::InProgress, at(4, 10)),
            task("Docs", &billing, &linus, TaskStatus::Pending, at(5, 10)),
        ];
        let (start, end) = month_window(2025, 3).unwrap();
        ReportData {
            period: validate_period(2025, 3, at(20, 0)).unwrap(),
            start,
            end,
            names: HashMap::from([(head.id, head.name.clone())]),
            project_names: HashMap::from([(billing.id, billing.name.clone())]),
            users: vec![ada, head, linus],
            projects: vec![billing],
            tasks,
        }
    }

    #[test]
    fn test_period_validation() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let period = validate_period(2024, 2, now).unwrap();
        assert_eq!(period.month_name, "February");
        assert_eq!(period.end_date.to_string(), "2024-02-29");

        assert!(matches!(validate_period(2019, 5, now), Err(AppError::Validation(_))));
        assert!(matches!(validate_period(2027, 5, now), Err(AppError::Validation(_))));
        assert!(matches!(validate_period(2025, 13, now), Err(AppError::Validation(_))));
        assert!(validate_period(2026, 12, now).is_ok());
    }

    #[test]
    fn test_summary_and_workers() {
        let report = MonthlyReport::build(&sample());
        assert_eq!(report.summary.total_tasks, 3);
        assert_eq!(report.summary.completed_tasks, 1);
        assert_eq!(report.summary.active_projects, 1);
        assert_eq!(report.summary.total_workers, 3);
        assert_eq!(report.summary.completion_rate, 33.3);

        let ada = report.workers.iter().find(|w| w.name == "Ada").unwrap();
        assert_eq!(ada.total_tasks, 2);
        assert_eq!(ada.completion_rate, 50.0);
        assert_eq!(ada.projects, 1);
        assert_eq!(ada.last_activity, Some(at(4, 10)));

        let hana = report.workers.iter().find(|w| w.name == "Hana").unwrap();
        assert_eq!(hana.total_tasks, 0);
        assert_eq!(hana.last_activity, None);
    }

    #[test]
    fn test_project_rollup_and_areas() {
        let report = MonthlyReport::build(&sample());
        let rollup = &report.projects[0];
        assert_eq!(rollup.creator_name.as_deref(), Some("Hana"));
        assert_eq!(rollup.member_names, vec!["Hana", "Ada", "Linus"]);
        assert_eq!((rollup.total_tasks, rollup.completed_tasks, rollup.in_progress_tasks), (3, 1, 1));

        assert_eq!(report.areas.len(), 2);
        assert_eq!(report.areas[0].area, Area::Dev);
        assert_eq!(report.areas[0].workers, 3);
        assert_eq!(report.areas[1].total_tasks, 0);
        assert_eq!(report.areas[1].completion_rate, 0.0);
    }

    #[test]
    fn test_timeline_is_chronological() {
        let mut data = sample();
        let early = task("Outside", &data.projects[0], &data.users[0], TaskStatus::Pending, at(1, 0) - Duration::days(3));
        data.tasks.push(early);

        let timeline = MonthlyReport::build(&data).timeline;
        let kinds: Vec<TimelineEventKind> = timeline.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TimelineEventKind::ProjectCreated,
                TimelineEventKind::TaskCreated,
                TimelineEventKind::TaskCompleted,
                TimelineEventKind::TaskCreated,
                TimelineEventKind::TaskCreated,
            ]
        );
        assert!(timeline.windows(2).all(|pair| pair[0].at <= pair[1].at));
        assert_eq!(timeline[2].user_name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_available_months_window() {
        let now = Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).unwrap();
        let months = available_months(now);
        assert_eq!(months.len(), 12);
        assert_eq!((months[0].year, months[0].month), (2024, 3));
        let last = months.last().unwrap();
        assert_eq!((last.year, last.month), (2025, 2));
        assert!(last.is_current);
        assert_eq!(last.label, "February 2025");
        assert_eq!(months.iter().filter(|m| m.is_current).count(), 1);
    }

    #[test]
    fn test_task_rows_carry_names_and_days_open() {
        let mut data = sample();
        let mut stray = task("Orphan", &data.projects[0], &data.users[0], TaskStatus::Pending, at(30, 12));
        stray.project_id = Uuid::new_v4();
        stray.assignees.clear();
        data.tasks.push(stray);

        let rows = MonthlyReport::build(&data).tasks;
        let titles: Vec<&str> = rows.iter().map(|row| row.title.as_str()).collect();
        assert_eq!(titles, vec!["Schema", "Exporter", "Docs", "Orphan"]);

        let schema = &rows[0];
        assert_eq!(schema.project_name.as_deref(), Some("Billing"));
        assert_eq!(schema.creator_name.as_deref(), Some("Hana"));
        assert_eq!(schema.assignee_names, vec!["Ada"]);
        assert_eq!(schema.days_open, 1, "completed two hours after creation");

        // Open tasks count up to the first instant after March.
        assert_eq!(rows[1].days_open, 28);
        assert_eq!(rows[1].completed_date, None);

        let orphan = &rows[3];
        assert_eq!(orphan.project_name, None);
        assert!(orphan.assignee_names.is_empty());
        assert_eq!(orphan.days_open, 2);
    }
}
