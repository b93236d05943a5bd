//! Criteria compilation and ordering directives.
//!
//! # Responsibility
//! - Normalize heterogeneous filter inputs into one ordered, AND-joined
//!   WHERE clause with positional binds.
//! - Compile ordering directives, validating column references up front.
//!
//! # Invariants
//! - Expression predicates keep call order and precede all map-derived
//!   equality predicates.
//! - Column references are checked against the entity type at call time;
//!   raw fragments are the unchecked escape hatch.

pub mod criteria;
pub mod order;

use crate::model::entity::Entity;
use crate::service::{ServiceError, ServiceResult};

pub(crate) fn check_column<E: Entity>(column: &str) -> ServiceResult<()> {
    if E::columns().iter().any(|name| *name == column) {
        Ok(())
    } else {
        Err(ServiceError::UnknownColumn {
            table: E::table(),
            column: column.to_string(),
        })
    }
}
