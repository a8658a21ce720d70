use teamflow_core::UserId;

/// Principal context for a request (the authenticated user).
///
/// Inserted by the auth middleware; present on every protected route.
/// Workspace roles are not carried here: they are resolved per request.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    user_id: UserId,
}

impl PrincipalContext {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}
