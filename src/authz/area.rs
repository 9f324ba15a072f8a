use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::principal::{ProjectFacts, Role};

/// Department partition that bounds visibility of projects, tasks and users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Area {
    Dev,
    Workforce,
    /// Legacy classification. No role resolves to it; it only exists on rows
    /// edited directly in the database.
    Tech,
}

impl Area {
    pub fn as_str(&self) -> &'static str {
        match self {
            Area::Dev => "dev",
            Area::Workforce => "workforce",
            Area::Tech => "tech",
        }
    }

    /// Roles whose resolved area is `self`.
    pub fn roles(&self) -> Vec<Role> {
        Role::ALL
            .iter()
            .copied()
            .filter(|role| area_for_role(*role) == *self)
            .collect()
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Area {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Area::Dev),
            "workforce" => Ok(Area::Workforce),
            "tech" => Ok(Area::Tech),
            other => Err(format!("unknown area: {other}")),
        }
    }
}

/// Role a user holds inside a project they are a member of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProjectRole {
    Developer,
    WorkforceWorker,
}

impl ProjectRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectRole::Developer => "developer",
            ProjectRole::WorkforceWorker => "workforce_worker",
        }
    }
}

impl FromStr for ProjectRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "developer" => Ok(ProjectRole::Developer),
            "workforce_worker" => Ok(ProjectRole::WorkforceWorker),
            other => Err(format!("unknown project role: {other}")),
        }
    }
}

pub fn area_for_role(role: Role) -> Area {
    match role {
        Role::DeptHeadDev | Role::Developer | Role::Designer => Area::Dev,
        Role::DeptHeadWorkforce | Role::WorkforceWorker => Area::Workforce,
    }
}

/// A task takes its project's area once, at creation. It is never recomputed.
pub fn area_for_task(project: &ProjectFacts) -> Area {
    project.area
}

pub fn member_role_for(role: Role) -> ProjectRole {
    match area_for_role(role) {
        Area::Workforce => ProjectRole::WorkforceWorker,
        Area::Dev | Area::Tech => ProjectRole::Developer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_roles_resolve_to_their_department() {
        assert_eq!(area_for_role(Role::DeptHeadDev), Area::Dev);
        assert_eq!(area_for_role(Role::Developer), Area::Dev);
        assert_eq!(area_for_role(Role::Designer), Area::Dev);
        assert_eq!(area_for_role(Role::DeptHeadWorkforce), Area::Workforce);
        assert_eq!(area_for_role(Role::WorkforceWorker), Area::Workforce);
    }

    #[test]
    fn test_no_role_resolves_to_tech() {
        assert!(Area::Tech.roles().is_empty());
        assert_eq!(Role::head_of(Area::Tech), None);
        assert_eq!(Role::head_of(Area::Workforce), Some(Role::DeptHeadWorkforce));
        assert_eq!(Area::Dev.roles(), vec![Role::DeptHeadDev, Role::Developer, Role::Designer]);
    }

    #[test]
    fn test_task_area_follows_project() {
        let project = ProjectFacts {
            id: Uuid::new_v4(),
            area: Area::Tech,
            created_by: Uuid::new_v4(),
            member_ids: vec![],
        };
        assert_eq!(area_for_task(&project), Area::Tech);
    }

    #[test]
    fn test_member_role_mapping() {
        assert_eq!(member_role_for(Role::DeptHeadWorkforce), ProjectRole::WorkforceWorker);
        assert_eq!(member_role_for(Role::WorkforceWorker), ProjectRole::WorkforceWorker);
        assert_eq!(member_role_for(Role::Designer), ProjectRole::Developer);
        assert_eq!(member_role_for(Role::DeptHeadDev), ProjectRole::Developer);
    }

    #[test]
    fn test_area_parse_roundtrip_rejects_unknown() {
        assert_eq!("workforce".parse::<Area>(), Ok(Area::Workforce));
        assert!("desarrollo".parse::<Area>().is_err());
    }
}
