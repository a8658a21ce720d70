//! Application services: the operations behind each endpoint.
//!
//! Callers resolve membership and run the role guard (see [`membership`])
//! before invoking a workspace-scoped service. Services then enforce scoping
//! themselves (every project lookup is by id *and* workspace).

pub mod bootstrap;
pub mod membership;
pub mod project;
pub mod task;
pub mod workspace;

use thiserror::Error;
use tracing::warn;

use teamflow_auth::{AuthzError, PasswordError};
use teamflow_core::DomainError;

use crate::store::{StoreError, StoreTx};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Authz(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// End a unit of work: commit on success, otherwise roll back and return the
/// original error. A failed rollback is logged; the transaction handle is
/// consumed either way, which releases it.
pub(crate) async fn finish<T>(
    tx: Box<dyn StoreTx>,
    result: ServiceResult<T>,
    operation: &'static str,
) -> ServiceResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(operation, error = %rollback_err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}
