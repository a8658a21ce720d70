//! Identity and tenancy records: users, provider accounts, workspaces,
//! role reference data and memberships.
//!
//! Pure domain logic (construction + invariants); no IO, no HTTP, no storage.

pub mod account;
pub mod member;
pub mod user;
pub mod workspace;

pub use account::{Account, Provider};
pub use member::{Member, MemberDetails, RoleRecord};
pub use user::{NewUser, User, UserSummary, normalize_email};
pub use workspace::{Workspace, generate_invite_code};
