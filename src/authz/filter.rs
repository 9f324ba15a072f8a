use sqlx::{QueryBuilder, Sqlite};
use uuid::Uuid;

use super::area::Area;
use super::principal::{ProjectFacts, TaskFacts, UserFacts};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Projects,
    Tasks,
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Everything in the area (department heads).
    WholeArea,
    /// Only rows the given user created, is assigned to, or shares a project with.
    Involving(Uuid),
}

/// Row predicate bounding a listing.
///
/// The same value is interpreted twice: `push_sql` renders it into a query
/// and the `matches_*` functions evaluate it against in-memory facts. Both
/// must agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Predicate {
    pub collection: Collection,
    pub area: Area,
    pub scope: Scope,
}

impl Predicate {
    /// Appends the predicate as a parenthesised boolean expression.
    ///
    /// Expected aliases: `p` for projects, `t` for tasks, `u` for users.
    pub fn push_sql(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        qb.push("(");
        match self.collection {
            Collection::Projects => {
                qb.push("p.area = ").push_bind(self.area.as_str());
                if let Scope::Involving(me) = self.scope {
                    qb.push(" AND (p.created_by = ")
                        .push_bind(me)
                        .push(" OR EXISTS (SELECT 1 FROM project_members pm WHERE pm.project_id = p.id AND pm.user_id = ")
                        .push_bind(me)
                        .push("))");
                }
            }
            Collection::Tasks => {
                qb.push("t.area = ").push_bind(self.area.as_str());
                if let Scope::Involving(me) = self.scope {
                    qb.push(" AND (t.created_by = ")
                        .push_bind(me)
                        .push(" OR EXISTS (SELECT 1 FROM task_assignees ta WHERE ta.task_id = t.id AND ta.user_id = ")
                        .push_bind(me)
                        .push(") OR EXISTS (SELECT 1 FROM project_members pm WHERE pm.project_id = t.project_id AND pm.user_id = ")
                        .push_bind(me)
                        .push("))");
                }
            }
            Collection::Users => {
                qb.push("u.role IN (");
                let mut roles = qb.separated(", ");
                for role in self.area.roles() {
                    roles.push_bind(role.as_str());
                }
                if self.area.roles().is_empty() {
                    roles.push("NULL");
                }
                roles.push_unseparated(")");
                if let Scope::Involving(me) = self.scope {
                    qb.push(" AND (u.id = ")
                        .push_bind(me)
                        .push(" OR u.manager_id = ")
                        .push_bind(me)
                        .push(
                            " OR EXISTS (SELECT 1 FROM project_members theirs \
                             JOIN project_members mine ON mine.project_id = theirs.project_id \
                             WHERE theirs.user_id = u.id AND mine.user_id = ",
                        )
                        .push_bind(me)
                        .push("))");
                }
            }
        }
        qb.push(")");
    }

    pub fn matches_project(&self, project: &ProjectFacts) -> bool {
        if project.area != self.area {
            return false;
        }
        match self.scope {
            Scope::WholeArea => true,
            Scope::Involving(me) => project.is_creator(me) || project.is_member(me),
        }
    }

    pub fn matches_task(&self, task: &TaskFacts) -> bool {
        if task.area != self.area {
            return false;
        }
        match self.scope {
            Scope::WholeArea => true,
            Scope::Involving(me) => task.created_by == me || task.is_assignee(me) || task.project.is_member(me),
        }
    }

    /// `shares_project` tells whether the user is a co-member of one of the
    /// actor's projects; it cannot be derived from `UserFacts` alone.
    pub fn matches_user(&self, user: &UserFacts, shares_project: bool) -> bool {
        if user.area() != self.area {
            return false;
        }
        match self.scope {
            Scope::WholeArea => true,
            Scope::Involving(me) => user.id == me || user.manager_id == Some(me) || shares_project,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::principal::Role;

    fn involving(collection: Collection, area: Area, me: Uuid) -> Predicate {
        Predicate { collection, area, scope: Scope::Involving(me) }
    }

    #[test]
    fn test_project_predicate_bounds_area_and_standing() {
        let me = Uuid::new_v4();
        let p = involving(Collection::Projects, Area::Dev, me);

        let mine = ProjectFacts { id: Uuid::new_v4(), area: Area::Dev, created_by: me, member_ids: vec![me] };
        let joined = ProjectFacts { id: Uuid::new_v4(), area: Area::Dev, created_by: Uuid::new_v4(), member_ids: vec![me] };
        let foreign = ProjectFacts { id: Uuid::new_v4(), area: Area::Workforce, created_by: me, member_ids: vec![me] };
        let unrelated = ProjectFacts { id: Uuid::new_v4(), area: Area::Dev, created_by: Uuid::new_v4(), member_ids: vec![] };

        assert!(p.matches_project(&mine));
        assert!(p.matches_project(&joined));
        assert!(!p.matches_project(&foreign));
        assert!(!p.matches_project(&unrelated));
    }

    #[test]
    fn test_whole_area_still_bounds_area() {
        let p = Predicate { collection: Collection::Tasks, area: Area::Workforce, scope: Scope::WholeArea };
        let project = ProjectFacts { id: Uuid::new_v4(), area: Area::Dev, created_by: Uuid::new_v4(), member_ids: vec![] };
        let task = TaskFacts { id: Uuid::new_v4(), area: Area::Dev, created_by: Uuid::new_v4(), assignee_ids: vec![], project };
        assert!(!p.matches_task(&task));
    }

    #[test]
    fn test_task_predicate_accepts_assignees() {
        let me = Uuid::new_v4();
        let p = involving(Collection::Tasks, Area::Dev, me);
        let project = ProjectFacts { id: Uuid::new_v4(), area: Area::Dev, created_by: Uuid::new_v4(), member_ids: vec![] };
        let task = TaskFacts { id: Uuid::new_v4(), area: Area::Dev, created_by: Uuid::new_v4(), assignee_ids: vec![me], project };
        assert!(p.matches_task(&task));
    }

    #[test]
    fn test_user_predicate() {
        let me = Uuid::new_v4();
        let p = involving(Collection::Users, Area::Dev, me);
        let report = UserFacts { id: Uuid::new_v4(), role: Role::Designer, manager_id: Some(me) };
        let stranger = UserFacts { id: Uuid::new_v4(), role: Role::Developer, manager_id: None };
        let worker = UserFacts { id: Uuid::new_v4(), role: Role::WorkforceWorker, manager_id: Some(me) };

        assert!(p.matches_user(&report, false));
        assert!(!p.matches_user(&stranger, false));
        assert!(p.matches_user(&stranger, true));
        assert!(!p.matches_user(&worker, true));
    }

    #[test]
    fn test_sql_rendering_binds_scope() {
        let me = Uuid::new_v4();
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT p.id FROM projects p WHERE ");
        involving(Collection::Projects, Area::Dev, me).push_sql(&mut qb);
        let sql = qb.sql();
        assert!(sql.starts_with("SELECT p.id FROM projects p WHERE (p.area = ?"));
        assert!(sql.contains("pm.user_id = ?"));
        assert!(sql.ends_with("))"));

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT u.id FROM users u WHERE ");
        Predicate { collection: Collection::Users, area: Area::Workforce, scope: Scope::WholeArea }.push_sql(&mut qb);
        assert_eq!(qb.sql(), "SELECT u.id FROM users u WHERE (u.role IN (?, ?))");
    }
}
