//! Identity resolution for record operations.
//!
//! # Responsibility
//! - Normalize heterogeneous identity-like inputs into canonical
//!   primary-key tuples for one entity type.
//!
//! # Invariants
//! - Malformed shapes (null scalar, wrong arity, missing or null key
//!   fields, empty mapping) resolve to `None`, never to an error. Reads
//!   treat that as "no matching record", writes as "transient".

use super::entity::Entity;
use super::field::FieldMap;
use rusqlite::types::Value;
use std::hash::{Hash, Hasher};

/// Identity-like input accepted by `get`, `save` classification, and
/// `destroy`.
#[derive(Debug, Clone)]
pub enum Ident {
    /// Explicitly absent identity; never resolves.
    Null,
    /// Single scalar, valid only for single-column primary keys.
    Scalar(Value),
    /// Positional values matched against the primary-key columns.
    Tuple(Vec<Value>),
    /// Named fields; primary-key columns are extracted by name and
    /// non-key entries are ignored.
    Fields(FieldMap),
}

impl From<Value> for Ident {
    fn from(value: Value) -> Self {
        Self::Scalar(value)
    }
}

impl From<i64> for Ident {
    fn from(value: i64) -> Self {
        Self::Scalar(Value::Integer(value))
    }
}

impl From<&str> for Ident {
    fn from(value: &str) -> Self {
        Self::Scalar(Value::Text(value.to_string()))
    }
}

impl From<String> for Ident {
    fn from(value: String) -> Self {
        Self::Scalar(Value::Text(value))
    }
}

impl From<Vec<Value>> for Ident {
    fn from(values: Vec<Value>) -> Self {
        Self::Tuple(values)
    }
}

impl From<FieldMap> for Ident {
    fn from(fields: FieldMap) -> Self {
        Self::Fields(fields)
    }
}

/// Canonical primary-key tuple, ordered by `Entity::pk_columns`.
///
/// Real values compare and hash by bit pattern so the tuple can key the
/// identity map.
#[derive(Debug, Clone)]
pub struct IdentityKey(pub Vec<Value>);

impl PartialEq for IdentityKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len()
            && self
                .0
                .iter()
                .zip(&other.0)
                .all(|(left, right)| value_eq(left, right))
    }
}

impl Eq for IdentityKey {}

impl Hash for IdentityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for value in &self.0 {
            match value {
                Value::Null => 0u8.hash(state),
                Value::Integer(int) => {
                    1u8.hash(state);
                    int.hash(state);
                }
                Value::Real(real) => {
                    2u8.hash(state);
                    real.to_bits().hash(state);
                }
                Value::Text(text) => {
                    3u8.hash(state);
                    text.hash(state);
                }
                Value::Blob(blob) => {
                    4u8.hash(state);
                    blob.hash(state);
                }
            }
        }
    }
}

fn value_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Real(x), Value::Real(y)) => x.to_bits() == y.to_bits(),
        _ => left == right,
    }
}

/// Resolves an identity-like input to the canonical primary-key tuple of
/// entity type `E`, or `None` when the shape cannot name one record.
pub fn resolve_identity<E: Entity>(ident: &Ident) -> Option<IdentityKey> {
    let pk = E::pk_columns();
    debug_assert!(!pk.is_empty(), "entity types must declare a primary key");

    let values = match ident {
        Ident::Null => return None,
        Ident::Scalar(value) => {
            if pk.len() != 1 {
                return None;
            }
            vec![value.clone()]
        }
        Ident::Tuple(values) => {
            if values.len() != pk.len() {
                return None;
            }
            values.clone()
        }
        Ident::Fields(fields) => {
            if fields.is_empty() {
                return None;
            }
            let mut values = Vec::with_capacity(pk.len());
            for column in pk {
                values.push(fields.get(column)?.clone());
            }
            values
        }
    };

    if values.iter().any(|value| matches!(value, Value::Null)) {
        return None;
    }

    Some(IdentityKey(values))
}
