//! Domain operations. Every function takes a [`Context`] carrying the caller,
//! consults the policy engine, then reads or writes SQLite.

use std::collections::HashSet;
use std::future::Future;

use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::authz::{authorize, AccessRequest, Actor, Collection, PolicyEvaluator, Predicate};
use crate::errors::{AppError, AppResult};

pub mod auth;
pub mod dashboard;
pub mod projects;
pub mod reports;
pub mod tasks;
pub mod users;

#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub pool: &'a SqlitePool,
    pub policy: &'a dyn PolicyEvaluator,
    pub actor: Actor,
}

impl<'a> Context<'a> {
    pub fn new(pool: &'a SqlitePool, policy: &'a dyn PolicyEvaluator, actor: Actor) -> Self {
        Self { pool, policy, actor }
    }

    pub fn authorize(&self, request: &AccessRequest<'_>) -> AppResult<()> {
        authorize(self.policy, &self.actor, request)
    }

    pub fn filter(&self, collection: Collection) -> Predicate {
        self.policy.filter(&self.actor, collection)
    }
}

/// Drops duplicates and `skip` while keeping first-seen order.
pub(crate) fn dedup_ids(ids: &[Uuid], skip: Option<Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter()
        .copied()
        .filter(|id| Some(*id) != skip && seen.insert(*id))
        .collect()
}

/// Spawns one `insert` per id on a `JoinSet` and waits for all of them.
///
/// `insert` resolves to `false` when the row was skipped (unknown user); those
/// ids are returned. Completion order is not defined, and rows written before
/// a failing insert stay written.
pub(crate) async fn insert_concurrently<F, Fut>(ids: Vec<Uuid>, insert: F) -> AppResult<Vec<Uuid>>
where
    F: Fn(Uuid) -> Fut,
    Fut: Future<Output = AppResult<bool>> + Send + 'static,
{
    let mut set = JoinSet::new();
    for id in ids {
        let fut = insert(id);
        set.spawn(async move { fut.await.map(|inserted| (id, inserted)) });
    }

    let mut skipped = Vec::new();
    while let Some(joined) = set.join_next().await {
        let (id, inserted) = joined.map_err(|err| AppError::internal(format!("batch insert task failed: {err}")))??;
        if !inserted {
            skipped.push(id);
        }
    }
    Ok(skipped)
}

/// Appends `AND (col LIKE ? OR ...)` for a non-blank `term`, matching it as a literal substring.
pub(crate) fn push_search(qb: &mut QueryBuilder<'_, Sqlite>, columns: &[&str], term: Option<&str>) {
    let Some(term) = term.map(str::trim).filter(|term| !term.is_empty()) else {
        return;
    };
    let pattern = like_pattern(term);

    qb.push(" AND (");
    for (idx, column) in columns.iter().enumerate() {
        if idx > 0 {
            qb.push(" OR ");
        }
        qb.push(*column).push(" LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'");
    }
    qb.push(")");
}

fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_order_and_drops_skip() {
        let (creator, a, b) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(dedup_ids(&[a, creator, b, a], Some(creator)), vec![a, b]);
        assert_eq!(dedup_ids(&[], None), Vec::<Uuid>::new());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_search_skips_blank_terms() {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT 1 FROM users u WHERE 1 = 1");
        push_search(&mut qb, &["u.name", "u.email"], Some("   "));
        assert_eq!(qb.sql(), "SELECT 1 FROM users u WHERE 1 = 1");

        push_search(&mut qb, &["u.name", "u.email"], Some(" ada "));
        assert_eq!(
            qb.sql(),
            "SELECT 1 FROM users u WHERE 1 = 1 AND (u.name LIKE ? ESCAPE '\\' OR u.email LIKE ? ESCAPE '\\')"
        );
    }
}
