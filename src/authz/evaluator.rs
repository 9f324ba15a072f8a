use super::area::Area;
use super::filter::{Collection, Predicate, Scope};
use super::principal::{Actor, ProjectFacts, Role, TaskFacts, UserFacts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectAction {
    Read,
    Update,
    Delete,
    AddMember,
    RemoveMember,
    CreateTask,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Read,
    Update,
    ChangeStatus,
    Delete,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Read,
    Update,
    Delete,
}

/// An operation an actor wants to perform, together with the facts about its target.
#[derive(Debug, Clone, Copy)]
pub enum AccessRequest<'a> {
    Project(ProjectAction, &'a ProjectFacts),
    Task(TaskAction, &'a TaskFacts),
    User(UserAction, &'a UserFacts),
    CreateProject,
    CreateUser(Role),
    AssignRole(&'a UserFacts, Role),
}

impl AccessRequest<'_> {
    /// Area of the targeted resource, if it has one.
    fn area(&self) -> Option<Area> {
        match self {
            AccessRequest::Project(_, project) => Some(project.area),
            AccessRequest::Task(_, task) => Some(task.area),
            AccessRequest::User(_, user) | AccessRequest::AssignRole(user, _) => Some(user.area()),
            AccessRequest::CreateUser(role) => Some(role.area()),
            AccessRequest::CreateProject => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    fn allow_if(condition: bool, reason: &'static str) -> Self {
        if condition {
            Decision::Allow
        } else {
            Decision::Deny(reason)
        }
    }
}

/// Policy evaluator trait for pluggable authorization logic
pub trait PolicyEvaluator: Send + Sync {
    /// Decide whether `actor` may perform `request`.
    fn decide(&self, actor: &Actor, request: &AccessRequest<'_>) -> Decision;

    /// Predicate bounding what `actor` may list from `collection`.
    fn filter(&self, actor: &Actor, collection: Collection) -> Predicate;
}

/// Default area-segregated policy.
///
/// Evaluation order:
/// 1. department head acting outside their own area -> deny
/// 2. resource specific rules (first match wins)
/// 3. deny
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicyEvaluator;

impl DefaultPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }

    fn project(actor: &Actor, action: ProjectAction, project: &ProjectFacts) -> Decision {
        let me = actor.user_id;
        let head = actor.head_area() == Some(project.area);
        let creator = project.is_creator(me);
        let member = project.is_member(me);

        match action {
            ProjectAction::Read => Decision::allow_if(
                head || (actor.area() == project.area && (creator || member)),
                "not authorized to view this project",
            ),
            ProjectAction::Update | ProjectAction::Delete => {
                let workforce_manager = project.area == Area::Workforce && actor.role == Role::WorkforceWorker;
                Decision::allow_if(
                    head || creator || workforce_manager,
                    "only department heads or the project creator can modify this project",
                )
            }
            ProjectAction::AddMember => Decision::allow_if(
                head || creator || member,
                "only department heads, the project creator or project members can add members",
            ),
            ProjectAction::RemoveMember => Decision::allow_if(
                head || creator,
                "only department heads or the project creator can remove members",
            ),
            ProjectAction::CreateTask => Decision::allow_if(
                creator || member,
                "not authorized to create tasks in this project",
            ),
        }
    }

    fn task(actor: &Actor, action: TaskAction, task: &TaskFacts) -> Decision {
        let me = actor.user_id;
        let involved = task.legacy_assignee() == Some(me)
            || task.is_assignee(me)
            || task.created_by == me
            || task.project.is_member(me)
            || task.project.is_creator(me);
        let head = actor.head_area() == Some(task.area);

        match action {
            TaskAction::Delete => {
                Decision::allow_if(task.created_by == me, "only the task creator can delete the task")
            }
            TaskAction::Read | TaskAction::Comment => Decision::allow_if(
                head || (actor.area() == task.area && involved),
                "not authorized to view this task",
            ),
            TaskAction::Update | TaskAction::ChangeStatus => {
                Decision::allow_if(head || involved, "not authorized to update this task")
            }
        }
    }

    fn user(actor: &Actor, action: UserAction, target: &UserFacts) -> Decision {
        let me = actor.user_id;
        let head = actor.head_area() == Some(target.area());
        let manager = target.manager_id == Some(me);
        let itself = target.id == me;

        match action {
            UserAction::Read => Decision::allow_if(head || manager || itself, "not authorized to view this user"),
            UserAction::Update => Decision::allow_if(head || manager || itself, "not authorized to update this user"),
            UserAction::Delete if itself => Decision::Deny("you cannot delete yourself"),
            UserAction::Delete => Decision::allow_if(head || manager, "not authorized to delete this user"),
        }
    }
}

impl PolicyEvaluator for DefaultPolicyEvaluator {
    fn decide(&self, actor: &Actor, request: &AccessRequest<'_>) -> Decision {
        // 1. Heads have no authority outside their own area
        if let (Some(head_area), Some(area)) = (actor.head_area(), request.area()) {
            if head_area != area {
                tracing::debug!(
                    user_id = %actor.user_id,
                    head_area = %head_area,
                    resource_area = %area,
                    "cross-area request denied"
                );
                return Decision::Deny("resource belongs to another area");
            }
        }

        // 2. Resource rules
        let decision = match request {
            AccessRequest::Project(action, project) => Self::project(actor, *action, project),
            AccessRequest::Task(action, task) => Self::task(actor, *action, task),
            AccessRequest::User(action, target) => Self::user(actor, *action, target),
            AccessRequest::CreateProject => Decision::allow_if(
                actor.is_department_head() || actor.role == Role::Developer,
                "only department heads and developers can create projects",
            ),
            AccessRequest::CreateUser(role) => Decision::allow_if(
                actor.role.can_create(*role),
                "not authorized to create users with this role",
            ),
            AccessRequest::AssignRole(target, role) => {
                if target.role == *role {
                    Decision::Allow
                } else if target.id == actor.user_id {
                    Decision::Deny("you cannot change your own role")
                } else {
                    Decision::allow_if(actor.role.can_create(*role), "not authorized to assign this role")
                }
            }
        };

        tracing::debug!(
            user_id = %actor.user_id,
            role = %actor.role,
            request = ?request_kind(request),
            allowed = decision.is_allowed(),
            "policy decision"
        );
        decision
    }

    fn filter(&self, actor: &Actor, collection: Collection) -> Predicate {
        let scope = if actor.is_department_head() {
            Scope::WholeArea
        } else {
            Scope::Involving(actor.user_id)
        };

        Predicate {
            collection,
            area: actor.area(),
            scope,
        }
    }
}

fn request_kind(request: &AccessRequest<'_>) -> String {
    match request {
        AccessRequest::Project(action, project) => format!("project.{action:?}({})", project.id),
        AccessRequest::Task(action, task) => format!("task.{action:?}({})", task.id),
        AccessRequest::User(action, target) => format!("user.{action:?}({})", target.id),
        AccessRequest::CreateProject => "project.Create".to_string(),
        AccessRequest::CreateUser(role) => format!("user.Create({role})"),
        AccessRequest::AssignRole(target, role) => format!("user.AssignRole({}, {role})", target.id),
    }
}
