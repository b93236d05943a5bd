//! Composable query handle over one entity type.

use super::error::ServiceResult;
use super::record_service::{select_sql, RecordService, Tracked};
use crate::model::entity::Entity;
use crate::query::criteria::{self, Criterion};
use crate::query::order::{self, OrderBy};
use rusqlite::types::Value;

/// Escape hatch for direct predicate/order/count composition.
///
/// `find` is built on top of this type; reach for it directly when the
/// fixed `find` surface is too rigid.
pub struct Query<'a, 'conn, E: Entity> {
    service: &'a RecordService<'conn, E>,
    criteria: Vec<Criterion>,
    order_by: Option<OrderBy>,
    limit: Option<u32>,
    offset: u32,
}

impl<'a, 'conn, E: Entity> Query<'a, 'conn, E> {
    pub(crate) fn new(service: &'a RecordService<'conn, E>) -> Self {
        Self {
            service,
            criteria: Vec::new(),
            order_by: None,
            limit: None,
            offset: 0,
        }
    }

    /// Adds one criterion; all criteria AND together.
    pub fn filter(mut self, criterion: Criterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Adds several criteria in order.
    pub fn filter_all(mut self, criteria: impl IntoIterator<Item = Criterion>) -> Self {
        self.criteria.extend(criteria);
        self
    }

    /// Replaces the ordering directive.
    pub fn order_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Applies `per_page`/1-based `page` pagination. A missing or zero
    /// page behaves as page 1.
    pub fn paginate(self, per_page: u32, page: Option<u32>) -> Self {
        let page = page.unwrap_or(1).max(1);
        // Saturate so absurd page numbers stay an empty page, not an
        // overflow.
        self.limit(per_page).offset((page - 1).saturating_mul(per_page))
    }

    /// Executes the query and fully materializes the result rows in
    /// order. No cursor survives the call.
    pub fn all(&self) -> ServiceResult<Vec<Tracked<E>>> {
        let (sql, params) = self.build_select()?;
        let rows = self.service.fetch_rows(&sql, params)?;
        Ok(self.service.track_all(rows))
    }

    /// Executes `COUNT(*)` over the filtered set.
    pub fn count(&self) -> ServiceResult<u64> {
        let clause = criteria::compile::<E>(&self.criteria)?;
        let mut sql = format!("SELECT COUNT(*) FROM {}", E::table());
        if let Some(where_sql) = clause.sql() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }
        self.service.fetch_count(&sql, clause.params)
    }

    fn build_select(&self) -> ServiceResult<(String, Vec<Value>)> {
        let clause = criteria::compile::<E>(&self.criteria)?;
        let mut sql = select_sql::<E>();

        if let Some(where_sql) = clause.sql() {
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
        }

        sql.push_str(" ORDER BY ");
        match &self.order_by {
            Some(order_by) => sql.push_str(&order::compile::<E>(order_by)?),
            None => sql.push_str(&order::default_order::<E>()),
        }

        let mut params = clause.params;
        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::from(limit)));
            if self.offset > 0 {
                sql.push_str(" OFFSET ?");
                params.push(Value::Integer(i64::from(self.offset)));
            }
        } else if self.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(Value::Integer(i64::from(self.offset)));
        }

        Ok((sql, params))
    }
}
