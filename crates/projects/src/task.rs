use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use teamflow_core::{DomainError, DomainResult, Entity, ProjectId, TaskId, UserId, WorkspaceId};

use crate::Project;

const MAX_TITLE_LEN: usize = 255;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Backlog,
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Backlog => "BACKLOG",
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::InReview => "IN_REVIEW",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "BACKLOG" => Ok(TaskStatus::Backlog),
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "IN_REVIEW" => Ok(TaskStatus::InReview),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(DomainError::validation(format!("unknown task status '{other}'"))),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "LOW" => Ok(TaskPriority::Low),
            "MEDIUM" => Ok(TaskPriority::Medium),
            "HIGH" => Ok(TaskPriority::High),
            other => Err(DomainError::validation(format!("unknown task priority '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub task_code: String,
    pub title: String,
    pub description: Option<String>,
    pub project_id: ProjectId,
    pub workspace_id: WorkspaceId,
    pub assigned_to: Option<UserId>,
    pub created_by: UserId,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<UserId>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
}

impl Task {
    /// Build a task inside `project`; the workspace is always taken from the
    /// project so the two cannot disagree.
    pub fn create(
        project: &Project,
        created_by: UserId,
        task_code: String,
        input: NewTask,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(DomainError::validation("task title is required"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::validation(
                "task title must not exceed 255 characters",
            ));
        }

        Ok(Self {
            id: TaskId::new(),
            task_code,
            title: title.to_string(),
            description: input
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            project_id: project.id,
            workspace_id: project.workspace_id,
            assigned_to: input.assigned_to,
            created_by,
            due_date: input.due_date,
            status: input.status.unwrap_or_default(),
            priority: input.priority.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_done() && self.due_date.is_some_and(|due| due < now)
    }
}

impl Entity for Task {
    type Id = TaskId;

    fn id(&self) -> TaskId {
        self.id
    }
}

/// Source of human-readable task codes (`task-…`). Codes must be unique;
/// callers retry on collision.
pub trait TaskCodeGenerator: Send + Sync {
    fn next_code(&self) -> String;
}

/// Random codes: `task-` followed by six hex digits.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidTaskCodes;

impl TaskCodeGenerator for UuidTaskCodes {
    fn next_code(&self) -> String {
        let mut hex = Uuid::new_v4().simple().to_string();
        hex.truncate(6);
        format!("task-{hex}")
    }
}

/// Deterministic codes (`task-1`, `task-2`, ...).
#[derive(Debug, Default)]
pub struct SequentialTaskCodes {
    next: AtomicU64,
}

impl SequentialTaskCodes {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl TaskCodeGenerator for SequentialTaskCodes {
    fn next_code(&self) -> String {
        format!("task-{}", self.next.fetch_add(1, Ordering::Relaxed))
    }
}
