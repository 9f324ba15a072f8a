use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::stats::{PriorityCounts, TaskStatusCounts};
use crate::authz::{Area, ProjectFacts, ProjectRole};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct ProjectMember {
    pub user_id: Uuid,
    pub name: String,
    pub email: String,
    pub role: ProjectRole,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub area: Area,
    pub created_by: Uuid,
    #[schema(example = "2025-10-01")]
    pub start_date: Option<NaiveDate>,
    #[schema(example = "2025-12-31")]
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Creator first, then the others by join time.
    pub members: Vec<ProjectMember>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProject {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub priority: Priority,
    pub area: Area,
    pub created_by: Uuid,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbProject {
    pub fn into_project(self, members: Vec<ProjectMember>) -> Project {
        Project {
            id: self.id,
            name: self.name,
            description: self.description,
            status: self.status,
            priority: self.priority,
            area: self.area,
            created_by: self.created_by,
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
            members,
        }
    }

    pub fn facts(&self, member_ids: Vec<Uuid>) -> ProjectFacts {
        ProjectFacts {
            id: self.id,
            area: self.area,
            created_by: self.created_by,
            member_ids,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectCreateRequest {
    #[schema(example = "Billing revamp")]
    pub name: String,
    #[schema(example = "Replace the legacy invoicing flow.")]
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Extra members besides the creator. Unknown ids are skipped.
    #[serde(default)]
    pub members: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProjectUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Replaces every membership except the creator's when present.
    pub members: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub user_id: Uuid,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectListQuery {
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    /// Substring of the name or description.
    pub search: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProjectStats {
    pub project_id: Uuid,
    pub tasks_by_status: TaskStatusCounts,
    pub tasks_by_priority: PriorityCounts,
    pub completion_rate: f64,
}
