use chrono::Utc;
use tracing::{instrument, warn};

use teamflow_core::{DomainError, ProjectId, UserId, WorkspaceId};
use teamflow_projects::{NewTask, Task, TaskCodeGenerator};

use super::ServiceResult;
use crate::store::Store;

const MAX_CODE_ATTEMPTS: usize = 5;

/// Create a task in a project of `workspace_id`. The task code comes from
/// `codes` and is redrawn if it collides with an existing one.
#[instrument(skip(store, codes, input), fields(workspace_id = %workspace_id, project_id = %project_id), err)]
pub async fn create_task(
    store: &dyn Store,
    codes: &dyn TaskCodeGenerator,
    user_id: UserId,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
    input: NewTask,
) -> ServiceResult<Task> {
    let project = store
        .find_project(project_id, workspace_id)
        .await?
        .ok_or_else(|| {
            DomainError::not_found("Project not found or does not belong to this workspace")
        })?;

    if let Some(assignee) = input.assigned_to {
        if store.find_member(assignee, workspace_id).await?.is_none() {
            return Err(
                DomainError::bad_request("Assigned user is not a member of this workspace").into(),
            );
        }
    }

    let now = Utc::now();
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let task = Task::create(&project, user_id, codes.next_code(), input.clone(), now)?;
        match store.insert_task(&task).await {
            Ok(()) => return Ok(task),
            Err(e) if e.is_duplicate("task") => {
                warn!(attempt, task_code = %task.task_code, "task code collision");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(DomainError::conflict("could not allocate a unique task code").into())
}

pub async fn list_project_tasks(
    store: &dyn Store,
    workspace_id: WorkspaceId,
    project_id: ProjectId,
) -> ServiceResult<Vec<Task>> {
    store
        .find_project(project_id, workspace_id)
        .await?
        .ok_or_else(|| {
            DomainError::not_found("Project not found or does not belong to this workspace")
        })?;
    Ok(store.list_tasks(project_id, workspace_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::ServiceError;
    use crate::services::project::create_project;
    use crate::store::InMemoryStore;
    use teamflow_projects::{NewProject, SequentialTaskCodes, TaskStatus};

    async fn project(store: &InMemoryStore) -> (WorkspaceId, UserId, ProjectId) {
        let (ws, user) = (WorkspaceId::new(), UserId::new());
        let p = create_project(
            store,
            user,
            ws,
            NewProject {
                name: "Tasks".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (ws, user, p.id)
    }

    fn titled(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn task_takes_workspace_from_project() {
        let store = InMemoryStore::new();
        let (ws, user, pid) = project(&store).await;
        let codes = SequentialTaskCodes::starting_at(1);

        let task = create_task(&store, &codes, user, ws, pid, titled("Draft"))
            .await
            .unwrap();
        assert_eq!(task.workspace_id, ws);
        assert_eq!(task.task_code, "task-1");
        assert_eq!(task.status, TaskStatus::Todo);

        let listed = list_project_tasks(&store, ws, pid).await.unwrap();
        assert_eq!(listed, vec![task]);
    }

    #[tokio::test]
    async fn colliding_code_is_redrawn() {
        let store = InMemoryStore::new();
        let (ws, user, pid) = project(&store).await;

        create_task(&store, &SequentialTaskCodes::starting_at(1), user, ws, pid, titled("a"))
            .await
            .unwrap();

        // A fresh generator restarts at task-1, which is taken.
        let task = create_task(&store, &SequentialTaskCodes::starting_at(1), user, ws, pid, titled("b"))
            .await
            .unwrap();
        assert_eq!(task.task_code, "task-2");
    }

    #[tokio::test]
    async fn project_from_other_workspace_is_not_found() {
        let store = InMemoryStore::new();
        let (_, user, pid) = project(&store).await;
        let codes = SequentialTaskCodes::starting_at(1);

        let err = create_task(&store, &codes, user, WorkspaceId::new(), pid, titled("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn assignee_must_be_a_member() {
        let store = InMemoryStore::new();
        let (ws, user, pid) = project(&store).await;
        let codes = SequentialTaskCodes::starting_at(1);

        let mut input = titled("assign");
        input.assigned_to = Some(UserId::new());
        let err = create_task(&store, &codes, user, ws, pid, input)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::BadRequest(_))));
    }
}
