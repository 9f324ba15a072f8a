use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::project::{Priority, ProjectStatus};
use super::task::TaskStatus;
use crate::authz::{Area, Role};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportQuery {
    #[param(example = 2025)]
    pub year: i32,
    #[param(example = 10)]
    pub month: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ReportPeriod {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub start_date: NaiveDate,
    /// Last day of the month, inclusive.
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportSummary {
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub in_progress_tasks: i64,
    pub pending_tasks: i64,
    pub total_projects: i64,
    pub active_projects: i64,
    pub total_workers: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct WorkerStats {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
    pub area: Area,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub in_progress_tasks: i64,
    pub pending_tasks: i64,
    pub completion_rate: f64,
    pub projects: i64,
    /// Latest update among the worker's tasks in the period.
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProjectRollup {
    pub project_id: Uuid,
    pub name: String,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub area: Area,
    pub creator_name: Option<String>,
    pub member_names: Vec<String>,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub in_progress_tasks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AreaMetrics {
    pub area: Area,
    pub workers: i64,
    pub total_tasks: i64,
    pub completed_tasks: i64,
    pub in_progress_tasks: i64,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    TaskCreated,
    TaskCompleted,
    ProjectCreated,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TimelineEvent {
    pub at: DateTime<Utc>,
    pub kind: TimelineEventKind,
    pub subject_id: Uuid,
    pub subject: String,
    pub user_name: Option<String>,
}

/// One line of the detailed task listing.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TaskReportRow {
    pub task_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub project_name: Option<String>,
    /// In assignment order.
    pub assignee_names: Vec<String>,
    pub creator_name: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub estimated_date: Option<NaiveDate>,
    pub completed_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Whole days from creation to completion, or to the end of the period while open.
    pub days_open: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MonthlyReport {
    pub period: ReportPeriod,
    pub summary: ReportSummary,
    pub workers: Vec<WorkerStats>,
    pub projects: Vec<ProjectRollup>,
    /// Dev first, then workforce.
    pub areas: Vec<AreaMetrics>,
    /// Oldest first.
    pub timeline: Vec<TimelineEvent>,
    /// Oldest first.
    pub tasks: Vec<TaskReportRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReportPreview {
    pub period: ReportPeriod,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AvailableMonth {
    pub year: i32,
    pub month: u32,
    pub month_name: String,
    pub label: String,
    pub is_current: bool,
}
