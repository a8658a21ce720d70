use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::Task;

/// Task counts for one project.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalytics {
    pub total_tasks: u64,
    pub overdue_tasks: u64,
    pub completed_tasks: u64,
}

impl ProjectAnalytics {
    /// Single pass over a project's tasks. Overdue means due before `now`
    /// and not done.
    pub fn from_tasks<'a>(tasks: impl IntoIterator<Item = &'a Task>, now: DateTime<Utc>) -> Self {
        tasks.into_iter().fold(Self::default(), |mut acc, task| {
            acc.total_tasks += 1;
            if task.is_done() {
                acc.completed_tasks += 1;
            } else if task.is_overdue(now) {
                acc.overdue_tasks += 1;
            }
            acc
        })
    }
}
