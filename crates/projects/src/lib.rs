//! Projects and tasks within a workspace.
//!
//! Deterministic domain logic only: construction, partial updates, analytics
//! aggregation and pagination arithmetic. Storage lives in `teamflow-infra`.

pub mod analytics;
pub mod pagination;
pub mod project;
pub mod task;

pub use analytics::ProjectAnalytics;
pub use pagination::{Page, PageRequest};
pub use project::{DEFAULT_EMOJI, NewProject, Project, ProjectPatch};
pub use task::{
    NewTask, SequentialTaskCodes, Task, TaskCodeGenerator, TaskPriority, TaskStatus, UuidTaskCodes,
};
