use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::comment::Comment;
use super::project::Priority;
use super::stats::{PriorityCounts, TaskStatusCounts};
use crate::authz::{Area, ProjectFacts, TaskFacts};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct TaskAssignee {
    #[serde(skip)]
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub assigned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    #[schema(example = "2025-10-15")]
    pub estimated_date: Option<NaiveDate>,
    /// Set exactly when `status` is `completed`.
    pub completed_date: Option<DateTime<Utc>>,
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub area: Area,
    /// Earliest assignee, kept for clients that expect a single assignee.
    pub assigned_to: Option<Uuid>,
    pub assignees: Vec<TaskAssignee>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub estimated_date: Option<NaiveDate>,
    pub completed_date: Option<DateTime<Utc>>,
    pub project_id: Uuid,
    pub created_by: Uuid,
    pub area: Area,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbTask {
    /// `assignees` must be ordered by assignment time.
    pub fn into_task(self, assignees: Vec<TaskAssignee>) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            estimated_date: self.estimated_date,
            completed_date: self.completed_date,
            project_id: self.project_id,
            created_by: self.created_by,
            area: self.area,
            assigned_to: assignees.first().map(|assignee| assignee.user_id),
            assignees,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn facts(&self, assignee_ids: Vec<Uuid>, project: ProjectFacts) -> TaskFacts {
        TaskFacts {
            id: self.id,
            area: self.area,
            created_by: self.created_by,
            assignee_ids,
            project,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskDetail {
    #[serde(flatten)]
    pub task: Task,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskCreateRequest {
    #[schema(example = "Wire the invoice exporter")]
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub estimated_date: Option<NaiveDate>,
    pub project_id: Uuid,
    /// Takes precedence over `assigned_to` when both are given.
    pub assignees: Option<Vec<Uuid>>,
    pub assigned_to: Option<Uuid>,
}

impl TaskCreateRequest {
    pub fn assignee_ids(&self) -> Vec<Uuid> {
        requested_assignees(self.assignees.as_ref(), self.assigned_to).unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub estimated_date: Option<NaiveDate>,
    /// Full replace of the assignee set when present.
    pub assignees: Option<Vec<Uuid>>,
    pub assigned_to: Option<Uuid>,
}

impl TaskUpdateRequest {
    /// `None` leaves the current assignees untouched.
    pub fn assignee_ids(&self) -> Option<Vec<Uuid>> {
        requested_assignees(self.assignees.as_ref(), self.assigned_to)
    }
}

fn requested_assignees(list: Option<&Vec<Uuid>>, legacy: Option<Uuid>) -> Option<Vec<Uuid>> {
    match (list, legacy) {
        (Some(list), _) => Some(list.clone()),
        (None, Some(single)) => Some(vec![single]),
        (None, None) => None,
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TaskStatusRequest {
    pub status: TaskStatus,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskListQuery {
    pub project_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// Matches any assignee, not only the first.
    pub assigned_to: Option<Uuid>,
    /// Substring of the title or description.
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TaskStatsQuery {
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TaskStats {
    pub by_status: TaskStatusCounts,
    pub by_priority: PriorityCounts,
    pub completion_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignee_list_wins_over_legacy_field() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(requested_assignees(Some(&vec![a]), Some(b)), Some(vec![a]));
        assert_eq!(requested_assignees(None, Some(b)), Some(vec![b]));
        assert_eq!(requested_assignees(Some(&vec![]), None), Some(vec![]));
        assert_eq!(requested_assignees(None, None), None);
    }
}
