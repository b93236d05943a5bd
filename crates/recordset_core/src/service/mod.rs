//! Record services: identity-aware CRUD over one entity type.
//!
//! # Responsibility
//! - Provide the stable service contract: `new_record`, `get`, `find`,
//!   `query`, `save`, `destroy`.
//! - Keep SQL composition and transaction handling inside this boundary.
//!
//! # Invariants
//! - Bulk `save`/`destroy` calls are all-or-nothing in one transaction.
//! - Not-found and unresolvable identities are soft absences, never
//!   errors; constraint violations propagate unchanged.

mod error;
mod query;
mod record_service;

pub use error::{ServiceError, ServiceResult};
pub use query::Query;
pub use record_service::{
    DestroyInput, FindOptions, Record, RecordService, SaveInput, Saved, Tracked,
};
