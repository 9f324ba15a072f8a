use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// The reporting structure: every user points at zero or one manager.
///
/// Built from `(id, manager_id)` rows. Edges to unknown ids are kept, they
/// simply end a chain.
#[derive(Debug, Clone, Default)]
pub struct ManagerForest {
    managers: HashMap<Uuid, Uuid>,
}

impl ManagerForest {
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (Uuid, Option<Uuid>)>,
    {
        let managers = edges
            .into_iter()
            .filter_map(|(id, manager)| manager.map(|manager| (id, manager)))
            .collect();
        Self { managers }
    }

    pub fn manager_of(&self, user_id: Uuid) -> Option<Uuid> {
        self.managers.get(&user_id).copied()
    }

    /// Managers above `user_id`, nearest first. Stops at the first repeated id.
    pub fn ancestors(&self, user_id: Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::from([user_id]);
        let mut chain = Vec::new();
        let mut current = user_id;
        while let Some(manager) = self.manager_of(current) {
            if !seen.insert(manager) {
                break;
            }
            chain.push(manager);
            current = manager;
        }
        chain
    }

    /// Direct reports of `manager_id`.
    pub fn subordinates(&self, manager_id: Uuid) -> Vec<Uuid> {
        let mut reports: Vec<Uuid> = self
            .managers
            .iter()
            .filter(|(_, manager)| **manager == manager_id)
            .map(|(id, _)| *id)
            .collect();
        reports.sort();
        reports
    }

    /// Whether making `new_manager` the manager of `user_id` would close a loop.
    pub fn would_create_cycle(&self, user_id: Uuid, new_manager: Uuid) -> bool {
        new_manager == user_id || self.ancestors(new_manager).contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestors_walk_up_the_chain() {
        let (head, lead, dev) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let forest = ManagerForest::from_edges([(head, None), (lead, Some(head)), (dev, Some(lead))]);

        assert_eq!(forest.ancestors(dev), vec![lead, head]);
        assert!(forest.ancestors(head).is_empty());
        assert_eq!(forest.subordinates(head), vec![lead]);
    }

    #[test]
    fn test_cycle_detection() {
        let (head, lead, dev) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let forest = ManagerForest::from_edges([(head, None), (lead, Some(head)), (dev, Some(lead))]);

        assert!(forest.would_create_cycle(head, dev));
        assert!(forest.would_create_cycle(lead, lead));
        assert!(!forest.would_create_cycle(dev, head));
    }

    #[test]
    fn test_corrupt_loop_terminates() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let forest = ManagerForest::from_edges([(a, Some(b)), (b, Some(a))]);
        assert_eq!(forest.ancestors(a), vec![b]);
    }
}
