//! Entity descriptor trait consumed by the record services.
//!
//! # Responsibility
//! - Expose column metadata, the ordered primary-key subset, and field
//!   access by name for one record kind.
//!
//! # Invariants
//! - `pk_columns()` is a fixed, non-empty, ordered subset of `columns()`.
//! - A persisted instance always has a fully populated primary key.

use super::field::FieldMap;
use super::identity::{resolve_identity, Ident, IdentityKey};
use rusqlite::types::Value;
use rusqlite::Row;

/// Schema descriptor and field accessor for one record kind.
///
/// Implementations live in the external model layer; the service crate
/// only consumes this narrow contract.
pub trait Entity: Clone + std::fmt::Debug {
    /// Table the records are stored under.
    fn table() -> &'static str;

    /// Ordered column names, including the primary-key columns.
    fn columns() -> &'static [&'static str];

    /// Ordered primary-key column subset. Never empty.
    fn pk_columns() -> &'static [&'static str];

    /// Builds a transient instance from named field values. Columns
    /// absent from `fields` keep their declared defaults.
    fn from_fields(fields: &FieldMap) -> Self;

    /// Decodes one row selected in `columns()` order.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Current value of one column, `None` for unknown column names.
    fn field(&self, column: &str) -> Option<Value>;

    /// Overwrites one column value. Unknown columns and mismatched value
    /// types are ignored.
    fn set_field(&mut self, column: &str, value: Value);

    /// Snapshot of all column values in `columns()` order.
    fn to_fields(&self) -> FieldMap;

    /// Current primary-key tuple, `None` while any key column is null.
    fn identity(&self) -> Option<IdentityKey> {
        resolve_identity::<Self>(&self.ident())
    }

    /// This instance viewed as an identity-like input.
    fn ident(&self) -> Ident {
        Ident::Fields(self.to_fields())
    }
}
