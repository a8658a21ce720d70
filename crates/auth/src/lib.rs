//! `teamflow-auth` — pure authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows the
//! static role→permission table, how to check it, how to mint/verify session
//! tokens and how to hash local passwords.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, role_guard};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use password::{PasswordError, hash_password, verify_password};
pub use permissions::Permission;
pub use roles::RoleName;
