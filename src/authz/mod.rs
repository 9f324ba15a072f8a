//! Authorization - area resolution, reporting hierarchy and the policy engine.
//!
//! The engine answers two questions:
//! - `decide`: may this actor perform this operation on this target?
//! - `filter`: which rows of a collection may this actor list?
//!
//! Both are pure functions over facts loaded by the services, so the whole
//! rule table is unit tested without a database.

mod area;
mod evaluator;
mod filter;
mod hierarchy;
mod principal;

pub use area::{area_for_role, area_for_task, member_role_for, Area, ProjectRole};
pub use evaluator::{
    AccessRequest, Decision, DefaultPolicyEvaluator, PolicyEvaluator, ProjectAction, TaskAction, UserAction,
};
pub use filter::{Collection, Predicate, Scope};
pub use hierarchy::ManagerForest;
pub use principal::{Actor, ProjectFacts, Role, TaskFacts, UserFacts};

use crate::errors::{AppError, AppResult};

/// Runs `decide` and turns a denial into `AppError::Forbidden`.
pub fn authorize(policy: &dyn PolicyEvaluator, actor: &Actor, request: &AccessRequest<'_>) -> AppResult<()> {
    match policy.decide(actor, request) {
        Decision::Allow => Ok(()),
        Decision::Deny(reason) => Err(AppError::forbidden(reason)),
    }
}
