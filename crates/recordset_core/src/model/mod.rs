//! Contract with the external model/schema layer.
//!
//! # Responsibility
//! - Define the entity descriptor trait the services consume.
//! - Provide the field-value mapping and identity-input shapes shared by
//!   criteria, upsert, and delete paths.
//!
//! # Invariants
//! - Primary-key column sets are fixed per entity type and never empty.
//! - Identity resolution fails soft: malformed shapes resolve to "no
//!   identity", never to an error.

pub mod entity;
pub mod field;
pub mod identity;
