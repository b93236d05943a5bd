//! Ordering directives and their compilation.

use super::check_column;
use crate::model::entity::Entity;
use crate::service::ServiceResult;

/// One ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderKey {
    /// Column reference, ascending.
    Asc(String),
    /// Column reference, descending.
    Desc(String),
    /// Raw ordering expression, passed through unvalidated.
    Raw(String),
}

/// Ordering directive: one or more keys applied in sequence as a stable
/// multi-key sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy(Vec<OrderKey>);

impl OrderBy {
    /// Single ascending column.
    pub fn column(column: impl Into<String>) -> Self {
        Self(vec![OrderKey::Asc(column.into())])
    }

    /// Single descending column.
    pub fn desc(column: impl Into<String>) -> Self {
        Self(vec![OrderKey::Desc(column.into())])
    }

    /// Raw ordering text, e.g. `"name DESC"`.
    pub fn raw(text: impl Into<String>) -> Self {
        Self(vec![OrderKey::Raw(text.into())])
    }

    /// Multi-key ordering in the given sequence.
    pub fn keys(keys: Vec<OrderKey>) -> Self {
        Self(keys)
    }

    /// Appends one more key.
    pub fn then(mut self, key: OrderKey) -> Self {
        self.0.push(key);
        self
    }
}

impl From<OrderKey> for OrderBy {
    fn from(key: OrderKey) -> Self {
        Self(vec![key])
    }
}

impl From<Vec<OrderKey>> for OrderBy {
    fn from(keys: Vec<OrderKey>) -> Self {
        Self(keys)
    }
}

/// Compiles an ordering directive, validating column references. An
/// empty directive falls back to the stable default order.
pub(crate) fn compile<E: Entity>(order_by: &OrderBy) -> ServiceResult<String> {
    if order_by.0.is_empty() {
        return Ok(default_order::<E>());
    }

    let mut parts = Vec::with_capacity(order_by.0.len());
    for key in &order_by.0 {
        match key {
            OrderKey::Asc(column) => {
                check_column::<E>(column)?;
                parts.push(column.clone());
            }
            OrderKey::Desc(column) => {
                check_column::<E>(column)?;
                parts.push(format!("{column} DESC"));
            }
            OrderKey::Raw(text) => parts.push(text.clone()),
        }
    }
    Ok(parts.join(", "))
}

/// Stable default order: the primary-key columns ascending. For rowid
/// keys this equals insertion order.
pub(crate) fn default_order<E: Entity>() -> String {
    E::pk_columns().join(", ")
}
