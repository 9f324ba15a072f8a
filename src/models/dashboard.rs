use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::project::Priority;
use super::stats::{PriorityCounts, ProjectStatusCounts, TaskStatusCounts};
use super::task::{Task, TaskStatus};

#[derive(Debug, Serialize, ToSchema, FromRow)]
pub struct ActivityEntry {
    pub task_id: Uuid,
    pub title: String,
    pub project_name: String,
    pub user_name: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub at: DateTime<Utc>,
}

/// Everything on the landing page, bounded by what the caller may list.
#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub projects: ProjectStatusCounts,
    pub tasks_by_status: TaskStatusCounts,
    pub tasks_by_priority: PriorityCounts,
    pub recent_tasks: Vec<Task>,
    pub recent_activity: Vec<ActivityEntry>,
}

/// Headline numbers shown above the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_projects: i64,
    pub active_projects: i64,
    pub total_tasks: i64,
    pub pending_tasks: i64,
    pub in_progress_tasks: i64,
    pub completed_tasks: i64,
}

impl DashboardStats {
    pub fn from_counts(projects: &ProjectStatusCounts, tasks: &TaskStatusCounts) -> Self {
        Self {
            total_projects: projects.total,
            active_projects: projects.active,
            total_tasks: tasks.total,
            pending_tasks: tasks.pending,
            in_progress_tasks: tasks.in_progress,
            completed_tasks: tasks.completed,
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilteredTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub project_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    /// First creation day included.
    #[param(example = "2025-03-01")]
    pub date_from: Option<NaiveDate>,
    /// Last creation day included.
    #[param(example = "2025-03-31")]
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    /// Defaults to 15, capped at 100.
    pub limit: Option<i64>,
}
