use serde::Serialize;
use utoipa::ToSchema;

use super::project::{Priority, ProjectStatus};
use super::task::TaskStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct TaskStatusCounts {
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub total: i64,
}

impl TaskStatusCounts {
    pub fn add(&mut self, status: TaskStatus, count: i64) {
        match status {
            TaskStatus::Pending => self.pending += count,
            TaskStatus::InProgress => self.in_progress += count,
            TaskStatus::Completed => self.completed += count,
        }
        self.total += count;
    }

    pub fn completion_rate(&self) -> f64 {
        percentage(self.completed, self.total)
    }
}

impl FromIterator<(TaskStatus, i64)> for TaskStatusCounts {
    fn from_iter<I: IntoIterator<Item = (TaskStatus, i64)>>(iter: I) -> Self {
        let mut counts = Self::default();
        for (status, count) in iter {
            counts.add(status, count);
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProjectStatusCounts {
    pub active: i64,
    pub paused: i64,
    pub finished: i64,
    pub total: i64,
}

impl FromIterator<(ProjectStatus, i64)> for ProjectStatusCounts {
    fn from_iter<I: IntoIterator<Item = (ProjectStatus, i64)>>(iter: I) -> Self {
        let mut counts = Self::default();
        for (status, count) in iter {
            match status {
                ProjectStatus::Active => counts.active += count,
                ProjectStatus::Paused => counts.paused += count,
                ProjectStatus::Finished => counts.finished += count,
            }
            counts.total += count;
        }
        counts
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct PriorityCounts {
    pub low: i64,
    pub medium: i64,
    pub high: i64,
    pub critical: i64,
}

impl FromIterator<(Priority, i64)> for PriorityCounts {
    fn from_iter<I: IntoIterator<Item = (Priority, i64)>>(iter: I) -> Self {
        let mut counts = Self::default();
        for (priority, count) in iter {
            match priority {
                Priority::Low => counts.low += count,
                Priority::Medium => counts.medium += count,
                Priority::High => counts.high += count,
                Priority::Critical => counts.critical += count,
            }
        }
        counts
    }
}

/// Share of `part` in `whole` as a percentage rounded to one decimal.
pub fn percentage(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / whole as f64).round() / 10.0
}
