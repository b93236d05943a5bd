//! Generic record-access services over a relational store.
//!
//! One [`RecordService`] per entity type provides identity resolution,
//! criteria queries, pagination/ordering, and transactional bulk
//! upsert/delete, independent of any single record schema. Schema
//! definition itself stays outside this crate: callers implement
//! [`Entity`] for each record kind and hand the service a bootstrapped
//! SQLite connection.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod service;

pub use db::{open_db, open_db_in_memory};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::Entity;
pub use model::field::FieldMap;
pub use model::identity::{resolve_identity, Ident, IdentityKey};
pub use query::criteria::{CmpOp, Criterion};
pub use query::order::{OrderBy, OrderKey};
pub use service::{
    DestroyInput, FindOptions, Query, Record, RecordService, SaveInput, Saved, ServiceError,
    ServiceResult, Tracked,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
