//! Infrastructure layer: persistence backends and the application services
//! that run on top of them.

pub mod services;
pub mod store;

pub use services::{ServiceError, ServiceResult};
pub use store::{FailPoint, InMemoryStore, PostgresStore, Store, StoreError, StoreResult, StoreTx};
