use axum::extract::{FromRequest, Json, Request};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use teamflow_core::UserId;
use teamflow_infra::services::bootstrap::LocalRegistration;
use teamflow_projects::{NewProject, NewTask, PageRequest, ProjectPatch, TaskPriority, TaskStatus};

use crate::app::errors::{ApiError, FieldError};

const MAX_TEXT_LEN: usize = 255;

/// Request bodies check their own fields and turn into typed inputs.
pub trait Validate: Sized {
    type Output;

    fn validate(self) -> Result<Self::Output, Vec<FieldError>>;
}

/// JSON body extractor: malformed JSON and invalid fields are rejected
/// with the API's error bodies instead of axum's plain-text ones.
pub struct ValidatedJson<T: Validate>(pub T::Output);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: Validate + DeserializeOwned + Send,
    T::Output: Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state).await?;
        body.validate().map(ValidatedJson).map_err(ApiError::Validation)
    }
}

// -------------------------
// Field checks
// -------------------------

#[derive(Default)]
struct Checks(Vec<FieldError>);

impl Checks {
    /// Trimmed, non-empty, at most 255 characters.
    fn text(&mut self, field: &str, value: &str) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.fail(field, format!("{field} is required"));
        } else if value.chars().count() > MAX_TEXT_LEN {
            self.fail(field, format!("{field} must not exceed 255 characters"));
        }
        value.to_string()
    }

    fn optional_text(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let value = value?;
        if value.trim().chars().count() > MAX_TEXT_LEN {
            self.fail(field, format!("{field} must not exceed 255 characters"));
        }
        Some(value)
    }

    fn email(&mut self, value: &str) -> String {
        let email = self.text("email", value);
        let valid = match email.split_once('@') {
            Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.contains('@'),
            None => false,
        };
        if !email.is_empty() && !valid {
            self.fail("email", "Invalid email address");
        }
        email
    }

    fn password(&mut self, value: &str) -> String {
        let password = value.trim();
        let len = password.chars().count();
        if len < 8 {
            self.fail("password", "Password must be at least 8 characters long");
        } else if len > MAX_TEXT_LEN {
            self.fail("password", "Password must not exceed 255 characters");
        }
        password.to_string()
    }

    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError::new(field, message));
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<FieldError>> {
        if self.0.is_empty() { Ok(value) } else { Err(self.0) }
    }
}

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Validate for RegisterRequest {
    type Output = LocalRegistration;

    fn validate(self) -> Result<LocalRegistration, Vec<FieldError>> {
        let mut checks = Checks::default();
        let name = checks.text("name", &self.name);
        let email = checks.email(&self.email);
        let password = checks.password(&self.password);
        checks.finish(LocalRegistration {
            name,
            email,
            password,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    type Output = Credentials;

    fn validate(self) -> Result<Credentials, Vec<FieldError>> {
        let mut checks = Checks::default();
        let email = checks.email(&self.email);
        let password = checks.password(&self.password);
        checks.finish(Credentials { email, password })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub description: Option<String>,
}

pub struct WorkspaceInput {
    pub name: String,
    pub description: Option<String>,
}

impl Validate for CreateWorkspaceRequest {
    type Output = WorkspaceInput;

    fn validate(self) -> Result<WorkspaceInput, Vec<FieldError>> {
        let mut checks = Checks::default();
        let name = checks.text("name", &self.name);
        let description = checks.optional_text("description", self.description);
        checks.finish(WorkspaceInput { name, description })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateProjectRequest {
    pub emoji: Option<String>,
    pub name: String,
    pub description: Option<String>,
}

impl Validate for CreateProjectRequest {
    type Output = NewProject;

    fn validate(self) -> Result<NewProject, Vec<FieldError>> {
        let mut checks = Checks::default();
        let name = checks.text("name", &self.name);
        let description = checks.optional_text("description", self.description);
        let emoji = checks.optional_text("emoji", self.emoji);
        checks.finish(NewProject {
            name,
            description,
            emoji,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateProjectRequest {
    pub emoji: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Validate for UpdateProjectRequest {
    type Output = ProjectPatch;

    fn validate(self) -> Result<ProjectPatch, Vec<FieldError>> {
        let mut checks = Checks::default();
        let name = checks.optional_text("name", self.name);
        let description = checks.optional_text("description", self.description);
        let emoji = checks.optional_text("emoji", self.emoji);
        checks.finish(ProjectPatch {
            name,
            description,
            emoji,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
    pub due_date: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
}

impl Validate for CreateTaskRequest {
    type Output = NewTask;

    fn validate(self) -> Result<NewTask, Vec<FieldError>> {
        let mut checks = Checks::default();
        let title = checks.text("title", &self.title);
        let description = checks.optional_text("description", self.description);

        let assigned_to = non_blank(self.assigned_to).and_then(|raw| {
            raw.parse::<UserId>()
                .map_err(|_| checks.fail("assignedTo", "Invalid user id"))
                .ok()
        });
        let due_date = non_blank(self.due_date).and_then(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|d| d.with_timezone(&Utc))
                .map_err(|_| checks.fail("dueDate", "dueDate must be an RFC 3339 timestamp"))
                .ok()
        });
        let status = non_blank(self.status).and_then(|raw| {
            TaskStatus::parse(&raw)
                .map_err(|e| checks.fail("status", e.to_string()))
                .ok()
        });
        let priority = non_blank(self.priority).and_then(|raw| {
            TaskPriority::parse(&raw)
                .map_err(|e| checks.fail("priority", e.to_string()))
                .ok()
        });

        checks.finish(NewTask {
            title,
            description,
            assigned_to,
            due_date,
            status,
            priority,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// -------------------------
// Query / path parameters
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub page_size: Option<String>,
    pub page_number: Option<String>,
}

impl PaginationQuery {
    /// Unparseable or zero values fall back to the defaults.
    pub fn page_request(&self) -> PageRequest {
        let parse = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .filter(|v| *v > 0)
        };
        PageRequest::from_query(parse(&self.page_size), parse(&self.page_number))
            .unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
}

/// Parse a path identifier, reporting the parameter name on failure.
pub fn parse_id<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ApiError> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::field(field, format!("Invalid {field}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_reports_every_bad_field() {
        let errors = RegisterRequest {
            name: "  ".into(),
            email: "not-an-email".into(),
            password: "short".into(),
        }
        .validate()
        .unwrap_err();

        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["name", "email", "password"]);
    }

    #[test]
    fn task_request_parses_enums_and_dates() {
        let task = CreateTaskRequest {
            title: "Ship".into(),
            due_date: Some("2030-01-01T00:00:00Z".into()),
            status: Some("IN_PROGRESS".into()),
            priority: Some("".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(task.status, Some(TaskStatus::InProgress));
        assert_eq!(task.priority, None);
        assert!(task.due_date.is_some());

        let errors = CreateTaskRequest {
            title: "Ship".into(),
            assigned_to: Some("nope".into()),
            status: Some("LATER".into()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn pagination_falls_back_to_defaults() {
        let query = PaginationQuery {
            page_size: Some("0".into()),
            page_number: Some("x".into()),
        };
        assert_eq!(query.page_request(), PageRequest::default());

        let query = PaginationQuery {
            page_size: Some("5".into()),
            page_number: Some("2".into()),
        };
        assert_eq!(query.page_request().skip(), 5);
    }
}
