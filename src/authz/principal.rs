use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::area::{area_for_role, Area};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    DeptHeadDev,
    DeptHeadWorkforce,
    Developer,
    WorkforceWorker,
    Designer,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::DeptHeadDev,
        Role::DeptHeadWorkforce,
        Role::Developer,
        Role::WorkforceWorker,
        Role::Designer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::DeptHeadDev => "dept_head_dev",
            Role::DeptHeadWorkforce => "dept_head_workforce",
            Role::Developer => "developer",
            Role::WorkforceWorker => "workforce_worker",
            Role::Designer => "designer",
        }
    }

    pub fn is_department_head(&self) -> bool {
        matches!(self, Role::DeptHeadDev | Role::DeptHeadWorkforce)
    }

    pub fn area(&self) -> Area {
        area_for_role(*self)
    }

    /// The department head role of `area`. The legacy `tech` area has none.
    pub fn head_of(area: Area) -> Option<Role> {
        match area {
            Area::Dev => Some(Role::DeptHeadDev),
            Area::Workforce => Some(Role::DeptHeadWorkforce),
            Area::Tech => None,
        }
    }

    /// Roles this role may create or assign to someone else.
    pub fn creatable_roles(&self) -> &'static [Role] {
        match self {
            Role::DeptHeadDev => &[Role::Developer, Role::Designer],
            Role::DeptHeadWorkforce => &[Role::WorkforceWorker],
            Role::Developer | Role::WorkforceWorker | Role::Designer => &[],
        }
    }

    pub fn can_create(&self, role: Role) -> bool {
        self.creatable_roles().contains(&role)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn area(&self) -> Area {
        self.role.area()
    }

    pub fn is_department_head(&self) -> bool {
        self.role.is_department_head()
    }

    /// The area a department head has authority over, `None` for everyone else.
    pub fn head_area(&self) -> Option<Area> {
        self.is_department_head().then(|| self.area())
    }
}

/// What the policy engine needs to know about a project.
#[derive(Debug, Clone)]
pub struct ProjectFacts {
    pub id: Uuid,
    pub area: Area,
    pub created_by: Uuid,
    pub member_ids: Vec<Uuid>,
}

impl ProjectFacts {
    pub fn is_creator(&self, user_id: Uuid) -> bool {
        self.created_by == user_id
    }

    pub fn is_member(&self, user_id: Uuid) -> bool {
        self.member_ids.contains(&user_id)
    }
}

#[derive(Debug, Clone)]
pub struct TaskFacts {
    pub id: Uuid,
    pub area: Area,
    pub created_by: Uuid,
    /// Ordered by assignment time; the first entry is the legacy single assignee.
    pub assignee_ids: Vec<Uuid>,
    pub project: ProjectFacts,
}

impl TaskFacts {
    pub fn legacy_assignee(&self) -> Option<Uuid> {
        self.assignee_ids.first().copied()
    }

    pub fn is_assignee(&self, user_id: Uuid) -> bool {
        self.assignee_ids.contains(&user_id)
    }
}

#[derive(Debug, Clone)]
pub struct UserFacts {
    pub id: Uuid,
    pub role: Role,
    pub manager_id: Option<Uuid>,
}

impl UserFacts {
    pub fn area(&self) -> Area {
        self.role.area()
    }
}
