use thiserror::Error;

use crate::{Permission, RoleName};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    /// The role is missing at least one required permission (or is unknown).
    #[error("You do not have permission to perform this action")]
    Forbidden { missing: Vec<Permission> },
}

/// Check a workspace role against the permissions an operation requires.
///
/// - No IO
/// - No panics
/// - Unknown role (`None`) grants nothing, so the check fails closed
pub fn role_guard(role: Option<RoleName>, required: &[Permission]) -> Result<(), AuthzError> {
    let granted: &[Permission] = role.map(|r| r.permissions()).unwrap_or(&[]);

    let missing: Vec<Permission> = required
        .iter()
        .copied()
        .filter(|p| !granted.contains(p))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        tracing::debug!(role = ?role, ?missing, "role guard denied");
        Err(AuthzError::Forbidden { missing })
    }
}
