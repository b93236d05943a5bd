#![allow(dead_code)]
//! Shared fixtures for record service integration tests: two
//! hand-implemented entity types (single rowid key and composite key)
//! over an in-memory store.

use recordset_core::{open_db_in_memory, Entity, FieldMap, Record, RecordService, Tracked};
use rusqlite::types::Value;
use rusqlite::{Connection, Row};
use uuid::Uuid;

/// Opens an in-memory store with the fixture schema applied.
pub fn setup() -> Connection {
    let conn = open_db_in_memory().expect("in-memory database should open");
    conn.execute_batch(
        "CREATE TABLE customers (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL DEFAULT ''
        );
        CREATE TABLE order_lines (
            order_id INTEGER NOT NULL,
            line_no INTEGER NOT NULL,
            name TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (order_id, line_no)
        );",
    )
    .expect("fixture schema should apply");
    conn
}

pub fn random_name() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Inserts `count` customers with random names, in order.
pub fn seed_customers(
    service: &RecordService<'_, Customer>,
    count: usize,
) -> Vec<Tracked<Customer>> {
    let records = (0..count)
        .map(|_| Record::Fields(FieldMap::new().with("name", Value::Text(random_name()))))
        .collect();
    service.save_many(records).expect("seeding should insert")
}

/// Inserts `count` order lines with sequential composite keys.
pub fn seed_order_lines(
    service: &RecordService<'_, OrderLine>,
    count: usize,
) -> Vec<Tracked<OrderLine>> {
    let records = (0..count)
        .map(|index| {
            Record::Fields(
                FieldMap::new()
                    .with("order_id", Value::Integer(index as i64 + 1))
                    .with("line_no", Value::Integer(1))
                    .with("name", Value::Text(random_name())),
            )
        })
        .collect();
    service.save_many(records).expect("seeding should insert")
}

pub fn customer_ids(rows: &[Tracked<Customer>]) -> Vec<i64> {
    rows.iter()
        .map(|row| row.borrow().id.expect("persisted customers have ids"))
        .collect()
}

pub fn customer_names(rows: &[Tracked<Customer>]) -> Vec<String> {
    rows.iter().map(|row| row.borrow().name.clone()).collect()
}

/// Single-column rowid key fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub id: Option<i64>,
    pub name: String,
}

impl Customer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

impl Entity for Customer {
    fn table() -> &'static str {
        "customers"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }

    fn pk_columns() -> &'static [&'static str] {
        &["id"]
    }

    fn from_fields(fields: &FieldMap) -> Self {
        let mut customer = Self {
            id: None,
            name: String::new(),
        };
        for (column, value) in fields.iter() {
            customer.set_field(column, value.clone());
        }
        customer
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
        })
    }

    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "id" => Some(self.id.map_or(Value::Null, Value::Integer)),
            "name" => Some(Value::Text(self.name.clone())),
            _ => None,
        }
    }

    fn set_field(&mut self, column: &str, value: Value) {
        match (column, value) {
            ("id", Value::Integer(id)) => self.id = Some(id),
            ("id", Value::Null) => self.id = None,
            ("name", Value::Text(name)) => self.name = name,
            _ => {}
        }
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("id", self.id.map_or(Value::Null, Value::Integer))
            .with("name", Value::Text(self.name.clone()))
    }
}

/// Composite-key fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub order_id: Option<i64>,
    pub line_no: Option<i64>,
    pub name: String,
}

impl OrderLine {
    pub fn keyed(order_id: i64, line_no: i64, name: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id),
            line_no: Some(line_no),
            name: name.into(),
        }
    }
}

impl Entity for OrderLine {
    fn table() -> &'static str {
        "order_lines"
    }

    fn columns() -> &'static [&'static str] {
        &["order_id", "line_no", "name"]
    }

    fn pk_columns() -> &'static [&'static str] {
        &["order_id", "line_no"]
    }

    fn from_fields(fields: &FieldMap) -> Self {
        let mut line = Self {
            order_id: None,
            line_no: None,
            name: String::new(),
        };
        for (column, value) in fields.iter() {
            line.set_field(column, value.clone());
        }
        line
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            order_id: row.get("order_id")?,
            line_no: row.get("line_no")?,
            name: row.get("name")?,
        })
    }

    fn field(&self, column: &str) -> Option<Value> {
        match column {
            "order_id" => Some(self.order_id.map_or(Value::Null, Value::Integer)),
            "line_no" => Some(self.line_no.map_or(Value::Null, Value::Integer)),
            "name" => Some(Value::Text(self.name.clone())),
            _ => None,
        }
    }

    fn set_field(&mut self, column: &str, value: Value) {
        match (column, value) {
            ("order_id", Value::Integer(order_id)) => self.order_id = Some(order_id),
            ("order_id", Value::Null) => self.order_id = None,
            ("line_no", Value::Integer(line_no)) => self.line_no = Some(line_no),
            ("line_no", Value::Null) => self.line_no = None,
            ("name", Value::Text(name)) => self.name = name,
            _ => {}
        }
    }

    fn to_fields(&self) -> FieldMap {
        FieldMap::new()
            .with("order_id", self.order_id.map_or(Value::Null, Value::Integer))
            .with("line_no", self.line_no.map_or(Value::Null, Value::Integer))
            .with("name", Value::Text(self.name.clone()))
    }
}
