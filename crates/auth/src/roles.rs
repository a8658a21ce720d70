use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Permission;

/// Workspace role used for RBAC.
///
/// Role *records* live in storage as reference data (so members can point at
/// them), but what a role may do is fixed here at compile time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleName {
    Owner,
    Admin,
    Member,
}

const OWNER_PERMISSIONS: &[Permission] = &Permission::ALL;

const ADMIN_PERMISSIONS: &[Permission] = &[
    Permission::AddMember,
    Permission::CreateProject,
    Permission::EditProject,
    Permission::DeleteProject,
    Permission::CreateTask,
    Permission::EditTask,
    Permission::DeleteTask,
    Permission::ManageWorkspaceSettings,
    Permission::ViewOnly,
];

const MEMBER_PERMISSIONS: &[Permission] = &[
    Permission::ViewOnly,
    Permission::CreateTask,
    Permission::EditTask,
];

impl RoleName {
    pub const ALL: [RoleName; 3] = [RoleName::Owner, RoleName::Admin, RoleName::Member];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleName::Owner => "OWNER",
            RoleName::Admin => "ADMIN",
            RoleName::Member => "MEMBER",
        }
    }

    /// Permissions granted to this role.
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            RoleName::Owner => OWNER_PERMISSIONS,
            RoleName::Admin => ADMIN_PERMISSIONS,
            RoleName::Member => MEMBER_PERMISSIONS,
        }
    }
}

impl core::fmt::Display for RoleName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl core::fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for RoleName {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OWNER" => Ok(RoleName::Owner),
            "ADMIN" => Ok(RoleName::Admin),
            "MEMBER" => Ok(RoleName::Member),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}
