use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use teamflow_core::{DomainError, DomainResult, Entity, ProjectId, UserId, WorkspaceId};

/// Icon used when a project is created without one.
pub const DEFAULT_EMOJI: &str = "📦";

const MAX_NAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub workspace_id: WorkspaceId,
    pub created_by: UserId,
    pub name: String,
    pub description: Option<String>,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create body. Blank optional fields are treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub emoji: Option<String>,
}

/// Partial update. A field is applied only when present and non-blank, so a
/// field cannot be cleared through this type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub emoji: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_name(name: &str) -> DomainResult<()> {
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(
            "project name must not exceed 255 characters",
        ));
    }
    Ok(())
}

impl Project {
    pub fn create(
        workspace_id: WorkspaceId,
        created_by: UserId,
        input: NewProject,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("project name is required"));
        }
        check_name(name)?;

        Ok(Self {
            id: ProjectId::new(),
            workspace_id,
            created_by,
            name: name.to_string(),
            description: non_blank(input.description),
            emoji: non_blank(input.emoji).unwrap_or_else(|| DEFAULT_EMOJI.to_string()),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update; blank fields keep their previous value.
    pub fn apply_patch(&mut self, patch: ProjectPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let name = non_blank(patch.name);
        if let Some(name) = &name {
            check_name(name)?;
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = non_blank(patch.description) {
            self.description = Some(description);
        }
        if let Some(emoji) = non_blank(patch.emoji) {
            self.emoji = emoji;
        }
        self.updated_at = now;
        Ok(())
    }
}

impl Entity for Project {
    type Id = ProjectId;

    fn id(&self) -> ProjectId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project::create(
            WorkspaceId::new(),
            UserId::new(),
            NewProject {
                name: "Website".into(),
                description: Some("Marketing site".into()),
                emoji: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn create_defaults_emoji_and_drops_blank_description() {
        let p = Project::create(
            WorkspaceId::new(),
            UserId::new(),
            NewProject {
                name: " Mobile ".into(),
                description: Some(String::new()),
                emoji: Some("  ".into()),
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(p.name, "Mobile");
        assert_eq!(p.description, None);
        assert_eq!(p.emoji, DEFAULT_EMOJI);
    }

    #[test]
    fn create_requires_a_name() {
        let err = Project::create(
            WorkspaceId::new(),
            UserId::new(),
            NewProject::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn empty_name_in_patch_is_ignored() {
        let mut p = project();
        p.apply_patch(
            ProjectPatch {
                name: Some(String::new()),
                description: Some("Rebuilt in 2026".into()),
                emoji: None,
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(p.name, "Website");
        assert_eq!(p.description.as_deref(), Some("Rebuilt in 2026"));
        assert_eq!(p.emoji, DEFAULT_EMOJI);
    }

    #[test]
    fn overlong_name_rejects_whole_patch() {
        let mut p = project();
        let before = p.clone();
        let err = p
            .apply_patch(
                ProjectPatch {
                    name: Some("x".repeat(256)),
                    description: Some("changed".into()),
                    emoji: None,
                },
                Utc::now(),
            )
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(p, before);
    }
}
