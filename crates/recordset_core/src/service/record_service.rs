//! Record service over one entity type.
//!
//! # Responsibility
//! - Resolve identities, run criteria queries, and perform transactional
//!   bulk upsert/delete against the entity's table.
//! - Maintain the unit-of-work identity map so equal keys yield the same
//!   in-memory instance.
//!
//! # Invariants
//! - One `save`/`destroy` call is one transaction; a constraint
//!   violation anywhere rolls back the whole batch.
//! - The identity map is only mutated after a successful commit.
//! - Reads run on the ambient connection and never open transactions.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, error, info};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Transaction};

use crate::model::entity::Entity;
use crate::model::field::FieldMap;
use crate::model::identity::{resolve_identity, Ident, IdentityKey};
use crate::query::criteria::Criterion;
use crate::query::order::OrderBy;

use super::error::{ServiceError, ServiceResult};
use super::query::Query;

/// Shared handle to an instance tracked by the identity map.
pub type Tracked<E> = Rc<RefCell<E>>;

/// Ordering and pagination directives for `find`.
///
/// `page` is 1-based and only takes effect when `per_page` is set; a
/// missing or zero page behaves as page 1.
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub order_by: Option<OrderBy>,
    pub per_page: Option<u32>,
    pub page: Option<u32>,
}

/// One record accepted by `save`.
#[derive(Debug, Clone)]
pub enum Record<E: Entity> {
    /// Transient instance built by the caller or `new_record`.
    Instance(E),
    /// Plain field-value mapping; columns absent from it keep declared
    /// defaults on insert and existing values on update.
    Fields(FieldMap),
    /// Instance already tracked by this service.
    Tracked(Tracked<E>),
}

/// Shape-preserving input for `save`.
pub enum SaveInput<E: Entity> {
    One(Record<E>),
    Many(Vec<Record<E>>),
}

impl<E: Entity> From<Record<E>> for SaveInput<E> {
    fn from(record: Record<E>) -> Self {
        Self::One(record)
    }
}

impl<E: Entity> From<Vec<Record<E>>> for SaveInput<E> {
    fn from(records: Vec<Record<E>>) -> Self {
        Self::Many(records)
    }
}

/// Shape-preserving output of `save`; matches the input shape and order.
pub enum Saved<E: Entity> {
    One(Tracked<E>),
    Many(Vec<Tracked<E>>),
}

impl<E: Entity> Saved<E> {
    /// The single saved record, `None` for batch output.
    pub fn into_one(self) -> Option<Tracked<E>> {
        match self {
            Self::One(record) => Some(record),
            Self::Many(_) => None,
        }
    }

    /// Saved records as a vector regardless of shape.
    pub fn into_many(self) -> Vec<Tracked<E>> {
        match self {
            Self::One(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

/// Identity-like input for `destroy`.
pub enum DestroyInput {
    One(Ident),
    Many(Vec<Ident>),
}

impl From<Ident> for DestroyInput {
    fn from(ident: Ident) -> Self {
        Self::One(ident)
    }
}

impl From<Vec<Ident>> for DestroyInput {
    fn from(idents: Vec<Ident>) -> Self {
        Self::Many(idents)
    }
}

impl From<i64> for DestroyInput {
    fn from(value: i64) -> Self {
        Self::One(Ident::from(value))
    }
}

impl From<FieldMap> for DestroyInput {
    fn from(fields: FieldMap) -> Self {
        Self::One(Ident::from(fields))
    }
}

impl From<Vec<Value>> for DestroyInput {
    fn from(values: Vec<Value>) -> Self {
        Self::One(Ident::from(values))
    }
}

impl<E: Entity> From<&E> for DestroyInput {
    fn from(record: &E) -> Self {
        Self::One(record.ident())
    }
}

enum StagedKind {
    Insert,
    Update(IdentityKey),
}

struct Staged<E: Entity> {
    target: Tracked<E>,
    state: E,
    kind: StagedKind,
}

/// Latest staged target and state for a key within one batch, so
/// records resolving to the same existing key share one instance.
struct UpdateSlot<E: Entity> {
    target: Tracked<E>,
    state: E,
}

struct SaveOutcome<E: Entity> {
    targets: Vec<Tracked<E>>,
    inserted: usize,
    updated: usize,
}

/// Generic CRUD/query service for one entity type over one connection.
///
/// The service participates in the caller's unit of work: reads run on
/// the ambient connection, while each `save`/`destroy` call opens and
/// commits exactly one transaction. The identity map lives as long as
/// the service instance.
pub struct RecordService<'conn, E: Entity> {
    conn: &'conn Connection,
    identity_map: RefCell<HashMap<IdentityKey, Tracked<E>>>,
}

impl<'conn, E: Entity> RecordService<'conn, E> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            identity_map: RefCell::new(HashMap::new()),
        }
    }

    /// Builds a transient, unpersisted instance from named field values.
    pub fn new_record(&self, fields: &FieldMap) -> E {
        E::from_fields(fields)
    }

    /// Fetches one record by identity.
    ///
    /// Malformed identities and missing rows both return `Ok(None)`;
    /// absence is a normal outcome, not an error.
    pub fn get(&self, ident: impl Into<Ident>) -> ServiceResult<Option<Tracked<E>>> {
        let Some(key) = resolve_identity::<E>(&ident.into()) else {
            debug!(
                "event=record_get module=service table={} status=ok resolved=false",
                E::table()
            );
            return Ok(None);
        };

        let found = match self.load_by_key(self.conn, &key)? {
            Some(instance) => Some(self.track(instance)),
            None => None,
        };
        debug!(
            "event=record_get module=service table={} status=ok resolved=true hit={}",
            E::table(),
            found.is_some()
        );
        Ok(found)
    }

    /// Runs a criteria query with optional ordering and pagination,
    /// returning a fully materialized, order-preserving result.
    pub fn find(
        &self,
        criteria: &[Criterion],
        options: FindOptions,
    ) -> ServiceResult<Vec<Tracked<E>>> {
        let mut query = self.query().filter_all(criteria.iter().cloned());
        if let Some(order_by) = options.order_by {
            query = query.order_by(order_by);
        }
        if let Some(per_page) = options.per_page {
            query = query.paginate(per_page, options.page);
        }
        let rows = query.all()?;
        debug!(
            "event=record_find module=service table={} status=ok rows={}",
            E::table(),
            rows.len()
        );
        Ok(rows)
    }

    /// Composable query handle for direct predicate/order/count work.
    pub fn query(&self) -> Query<'_, 'conn, E> {
        Query::new(self)
    }

    /// Upserts one or many records in a single transaction, preserving
    /// the input shape and order.
    ///
    /// Each record is classified as insert or update against the store
    /// state at call start: an input that resolves to the key of an
    /// existing row updates that row (merging into the already tracked
    /// instance), everything else inserts. Records resolving to the same
    /// existing key share one returned instance, later merges applied on
    /// top of earlier ones. Generated single-column keys are assigned
    /// before the call returns.
    pub fn save(&self, input: impl Into<SaveInput<E>>) -> ServiceResult<Saved<E>> {
        match input.into() {
            SaveInput::One(record) => Ok(Saved::One(self.save_one(record)?)),
            SaveInput::Many(records) => Ok(Saved::Many(self.save_many(records)?)),
        }
    }

    /// Upserts a single record. See `save`.
    pub fn save_one(&self, record: Record<E>) -> ServiceResult<Tracked<E>> {
        let mut saved = self.save_batch(vec![record])?;
        // save_batch returns exactly one target per input record.
        Ok(saved.remove(0))
    }

    /// Upserts a batch of records atomically. See `save`.
    pub fn save_many(&self, records: Vec<Record<E>>) -> ServiceResult<Vec<Tracked<E>>> {
        self.save_batch(records)
    }

    /// Deletes records by identity in a single transaction, returning
    /// the number of rows actually removed.
    ///
    /// Unresolvable identities are skipped and contribute 0, as do keys
    /// with no matching row.
    pub fn destroy(&self, input: impl Into<DestroyInput>) -> ServiceResult<usize> {
        let started_at = Instant::now();
        let idents = match input.into() {
            DestroyInput::One(ident) => vec![ident],
            DestroyInput::Many(idents) => idents,
        };
        let requested = idents.len();

        let result = self.destroy_idents(idents);
        match &result {
            Ok(removed) => info!(
                "event=record_destroy module=service table={} status=ok requested={requested} removed={removed} duration_ms={}",
                E::table(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=record_destroy module=service table={} status=error requested={requested} duration_ms={} error={err}",
                E::table(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn destroy_idents(&self, idents: Vec<Ident>) -> ServiceResult<usize> {
        // Unresolvable identities are skipped by design, not errored.
        let keys: Vec<IdentityKey> = idents
            .iter()
            .filter_map(|ident| resolve_identity::<E>(ident))
            .collect();

        let tx = self.conn.unchecked_transaction()?;
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            E::table(),
            pk_predicate::<E>()
        );
        let mut removed = 0usize;
        {
            let mut stmt = tx.prepare(&sql)?;
            for key in &keys {
                removed += stmt.execute(params_from_iter(key.0.iter().cloned()))?;
            }
        }
        tx.commit()?;

        let mut map = self.identity_map.borrow_mut();
        for key in &keys {
            map.remove(key);
        }
        Ok(removed)
    }

    fn save_batch(&self, records: Vec<Record<E>>) -> ServiceResult<Vec<Tracked<E>>> {
        let started_at = Instant::now();
        let result = self.stage_and_commit(records);
        match result {
            Ok(outcome) => {
                info!(
                    "event=record_save module=service table={} status=ok saved={} inserted={} updated={} duration_ms={}",
                    E::table(),
                    outcome.targets.len(),
                    outcome.inserted,
                    outcome.updated,
                    started_at.elapsed().as_millis()
                );
                Ok(outcome.targets)
            }
            Err(err) => {
                error!(
                    "event=record_save module=service table={} status=error duration_ms={} error={err}",
                    E::table(),
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }

    fn stage_and_commit(&self, records: Vec<Record<E>>) -> ServiceResult<SaveOutcome<E>> {
        let tx = self.conn.unchecked_transaction()?;

        // Phase 1: classify every record against pre-call store state, so
        // two new records sharing a key stay two inserts and trip the key
        // constraint instead of silently collapsing into an update.
        // Updates resolving to the same key share one target through
        // `pending`, with later merges chained on the earlier staged state.
        let mut staged: Vec<Staged<E>> = Vec::with_capacity(records.len());
        let mut pending: HashMap<IdentityKey, UpdateSlot<E>> = HashMap::new();
        for record in records {
            staged.push(self.classify(&tx, record, &mut pending)?);
        }

        // Phase 2: execute in input order.
        let mut inserted = 0usize;
        let mut updated = 0usize;
        for op in &mut staged {
            match &op.kind {
                StagedKind::Insert => {
                    self.insert_row(&tx, &mut op.state)?;
                    inserted += 1;
                }
                StagedKind::Update(key) => {
                    self.update_row(&tx, &op.state, key)?;
                    updated += 1;
                }
            }
        }
        tx.commit()?;

        // Phase 3: publish to targets and the identity map only after
        // commit, so a rolled-back batch leaves no cache residue.
        let mut targets = Vec::with_capacity(staged.len());
        for op in staged {
            *op.target.borrow_mut() = op.state;
            let identity = op.target.borrow().identity();
            if let Some(key) = identity {
                self.identity_map
                    .borrow_mut()
                    .insert(key, op.target.clone());
            }
            targets.push(op.target);
        }

        Ok(SaveOutcome {
            targets,
            inserted,
            updated,
        })
    }

    fn classify(
        &self,
        tx: &Transaction<'_>,
        record: Record<E>,
        pending: &mut HashMap<IdentityKey, UpdateSlot<E>>,
    ) -> ServiceResult<Staged<E>> {
        match record {
            Record::Fields(fields) => {
                let state = E::from_fields(&fields);
                match self.existing_key(tx, state.identity())? {
                    Some(key) => {
                        let (target, base) = self.update_slot(tx, &key, pending)?;
                        // Merge only the supplied columns into the
                        // latest staged state for the key.
                        let mut merged = base;
                        for (column, value) in fields.iter() {
                            merged.set_field(column, value.clone());
                        }
                        pending.insert(
                            key.clone(),
                            UpdateSlot {
                                target: target.clone(),
                                state: merged.clone(),
                            },
                        );
                        Ok(Staged {
                            target,
                            state: merged,
                            kind: StagedKind::Update(key),
                        })
                    }
                    None => Ok(Staged {
                        target: Rc::new(RefCell::new(state.clone())),
                        state,
                        kind: StagedKind::Insert,
                    }),
                }
            }
            Record::Instance(state) => match self.existing_key(tx, state.identity())? {
                Some(key) => {
                    let (target, _) = self.update_slot(tx, &key, pending)?;
                    pending.insert(
                        key.clone(),
                        UpdateSlot {
                            target: target.clone(),
                            state: state.clone(),
                        },
                    );
                    Ok(Staged {
                        target,
                        state,
                        kind: StagedKind::Update(key),
                    })
                }
                None => Ok(Staged {
                    target: Rc::new(RefCell::new(state.clone())),
                    state,
                    kind: StagedKind::Insert,
                }),
            },
            Record::Tracked(target) => {
                let state = target.borrow().clone();
                match self.existing_key(tx, state.identity())? {
                    Some(key) => {
                        let target = match pending.get(&key) {
                            Some(slot) => slot.target.clone(),
                            None => self.cached(&key).unwrap_or(target),
                        };
                        pending.insert(
                            key.clone(),
                            UpdateSlot {
                                target: target.clone(),
                                state: state.clone(),
                            },
                        );
                        Ok(Staged {
                            target,
                            state,
                            kind: StagedKind::Update(key),
                        })
                    }
                    None => Ok(Staged {
                        target,
                        state,
                        kind: StagedKind::Insert,
                    }),
                }
            }
        }
    }

    /// Target and merge base for an update: the slot already staged in
    /// this batch when the key repeats, otherwise the tracked or freshly
    /// loaded instance and its current state.
    fn update_slot(
        &self,
        tx: &Transaction<'_>,
        key: &IdentityKey,
        pending: &HashMap<IdentityKey, UpdateSlot<E>>,
    ) -> ServiceResult<(Tracked<E>, E)> {
        if let Some(slot) = pending.get(key) {
            return Ok((slot.target.clone(), slot.state.clone()));
        }
        let target = self.update_target(tx, key)?;
        let base = target.borrow().clone();
        Ok((target, base))
    }

    /// Keeps the key only when a persistent row with it exists.
    fn existing_key(
        &self,
        tx: &Transaction<'_>,
        identity: Option<IdentityKey>,
    ) -> ServiceResult<Option<IdentityKey>> {
        match identity {
            Some(key) if self.exists(tx, &key)? => Ok(Some(key)),
            _ => Ok(None),
        }
    }

    /// Tracked instance to merge an update into: the already tracked one
    /// when present, otherwise the current row loaded from the store.
    fn update_target(
        &self,
        tx: &Transaction<'_>,
        key: &IdentityKey,
    ) -> ServiceResult<Tracked<E>> {
        if let Some(cached) = self.cached(key) {
            return Ok(cached);
        }
        let instance = self.load_by_key(tx, key)?.ok_or_else(|| {
            ServiceError::InvalidRow(format!(
                "{} row matched the key probe but failed to reload",
                E::table()
            ))
        })?;
        Ok(Rc::new(RefCell::new(instance)))
    }

    fn cached(&self, key: &IdentityKey) -> Option<Tracked<E>> {
        self.identity_map.borrow().get(key).cloned()
    }

    fn exists(&self, conn: &Connection, key: &IdentityKey) -> ServiceResult<bool> {
        let sql = format!(
            "SELECT 1 FROM {} WHERE {} LIMIT 1",
            E::table(),
            pk_predicate::<E>()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(key.0.iter().cloned()))?;
        Ok(rows.next()?.is_some())
    }

    fn insert_row(&self, tx: &Transaction<'_>, state: &mut E) -> ServiceResult<()> {
        let fields = state.to_fields();
        let pk = E::pk_columns();
        let mut columns: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        for (column, value) in fields.iter() {
            // Null key columns are left out so the store assigns rowid keys.
            if pk.iter().any(|name| *name == column) && matches!(value, Value::Null) {
                continue;
            }
            columns.push(column);
            params.push(value.clone());
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", E::table())
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                E::table(),
                columns.join(", "),
                placeholders(columns.len())
            )
        };
        tx.execute(&sql, params_from_iter(params))?;

        if pk.len() == 1 {
            let key_column = pk[0];
            if matches!(state.field(key_column), Some(Value::Null)) {
                state.set_field(key_column, Value::Integer(tx.last_insert_rowid()));
            }
        }
        Ok(())
    }

    fn update_row(&self, tx: &Transaction<'_>, state: &E, key: &IdentityKey) -> ServiceResult<()> {
        let fields = state.to_fields();
        let pk = E::pk_columns();
        let mut assignments: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();
        for (column, value) in fields.iter() {
            if pk.iter().any(|name| *name == column) {
                continue;
            }
            assignments.push(format!("{column} = ?"));
            params.push(value.clone());
        }
        if assignments.is_empty() {
            // Key-only schema: nothing beyond the key to write.
            return Ok(());
        }
        params.extend(key.0.iter().cloned());

        let sql = format!(
            "UPDATE {} SET {} WHERE {}",
            E::table(),
            assignments.join(", "),
            pk_predicate::<E>()
        );
        tx.execute(&sql, params_from_iter(params))?;
        Ok(())
    }

    fn load_by_key(&self, conn: &Connection, key: &IdentityKey) -> ServiceResult<Option<E>> {
        let sql = format!("{} WHERE {}", select_sql::<E>(), pk_predicate::<E>());
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(key.0.iter().cloned()))?;
        match rows.next()? {
            Some(row) => Ok(Some(E::from_row(row)?)),
            None => Ok(None),
        }
    }

    pub(crate) fn fetch_rows(&self, sql: &str, params: Vec<Value>) -> ServiceResult<Vec<E>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        let mut instances = Vec::new();
        while let Some(row) = rows.next()? {
            instances.push(E::from_row(row)?);
        }
        Ok(instances)
    }

    pub(crate) fn fetch_count(&self, sql: &str, params: Vec<Value>) -> ServiceResult<u64> {
        let count = self
            .conn
            .query_row(sql, params_from_iter(params), |row| row.get::<_, i64>(0))?;
        Ok(count.max(0) as u64)
    }

    pub(crate) fn track_all(&self, instances: Vec<E>) -> Vec<Tracked<E>> {
        instances
            .into_iter()
            .map(|instance| self.track(instance))
            .collect()
    }

    /// Routes a materialized instance through the identity map: an
    /// already tracked key has its instance refreshed in place and the
    /// same handle returned.
    fn track(&self, instance: E) -> Tracked<E> {
        match instance.identity() {
            Some(key) => {
                let mut map = self.identity_map.borrow_mut();
                if let Some(existing) = map.get(&key) {
                    *existing.borrow_mut() = instance;
                    existing.clone()
                } else {
                    let tracked = Rc::new(RefCell::new(instance));
                    map.insert(key, tracked.clone());
                    tracked
                }
            }
            // No resolvable key: hand back an untracked handle.
            None => Rc::new(RefCell::new(instance)),
        }
    }
}

pub(crate) fn select_sql<E: Entity>() -> String {
    format!("SELECT {} FROM {}", E::columns().join(", "), E::table())
}

fn pk_predicate<E: Entity>() -> String {
    E::pk_columns()
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
