//! Filter criteria and their compilation into WHERE clauses.

use super::check_column;
use crate::model::entity::Entity;
use crate::model::field::FieldMap;
use crate::service::ServiceResult;
use rusqlite::types::Value;

/// Comparison operators available for column predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl CmpOp {
    fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
        }
    }
}

/// One filter condition. Multiple criteria always AND together; there is
/// no implicit OR.
#[derive(Debug, Clone)]
pub enum Criterion {
    /// Column comparison against a bound value.
    Cmp {
        column: String,
        op: CmpOp,
        value: Value,
    },
    /// Null / not-null test on one column.
    Null { column: String, negated: bool },
    /// Raw SQL fragment with positional binds. Bypasses column
    /// validation; the caller owns its correctness.
    Raw { sql: String, params: Vec<Value> },
    /// Column to exact-match value map, expanded into one equality
    /// predicate per entry in map iteration order.
    EqualityMap(FieldMap),
}

impl Criterion {
    fn cmp(column: impl Into<String>, op: CmpOp, value: impl Into<Value>) -> Self {
        Self::Cmp {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Ne, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Lt, value)
    }

    pub fn le(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Le, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Gt, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::cmp(column, CmpOp::Ge, value)
    }

    pub fn like(column: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::cmp(column, CmpOp::Like, Value::Text(pattern.into()))
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::Null {
            column: column.into(),
            negated: false,
        }
    }

    pub fn not_null(column: impl Into<String>) -> Self {
        Self::Null {
            column: column.into(),
            negated: true,
        }
    }

    pub fn raw(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self::Raw {
            sql: sql.into(),
            params,
        }
    }

    /// Keyword-style equality criteria from a field map.
    pub fn filter_by(fields: FieldMap) -> Self {
        Self::EqualityMap(fields)
    }
}

impl From<FieldMap> for Criterion {
    fn from(fields: FieldMap) -> Self {
        Self::EqualityMap(fields)
    }
}

/// Compiled WHERE clause: AND-joined fragments plus bind values in
/// matching positional order.
#[derive(Debug, Default)]
pub(crate) struct WhereClause {
    fragments: Vec<String>,
    pub params: Vec<Value>,
}

impl WhereClause {
    pub fn sql(&self) -> Option<String> {
        if self.fragments.is_empty() {
            None
        } else {
            Some(self.fragments.join(" AND "))
        }
    }
}

/// Normalizes criteria into one ordered WHERE clause: expression
/// predicates verbatim in call order first, then every equality map
/// expanded in its iteration order.
pub(crate) fn compile<E: Entity>(criteria: &[Criterion]) -> ServiceResult<WhereClause> {
    let mut clause = WhereClause::default();

    for criterion in criteria {
        match criterion {
            Criterion::Cmp { column, op, value } => {
                check_column::<E>(column)?;
                clause.fragments.push(format!("{column} {} ?", op.sql()));
                clause.params.push(value.clone());
            }
            Criterion::Null { column, negated } => {
                check_column::<E>(column)?;
                let test = if *negated { "IS NOT NULL" } else { "IS NULL" };
                clause.fragments.push(format!("{column} {test}"));
            }
            Criterion::Raw { sql, params } => {
                clause.fragments.push(sql.clone());
                clause.params.extend(params.iter().cloned());
            }
            Criterion::EqualityMap(_) => {}
        }
    }

    for criterion in criteria {
        if let Criterion::EqualityMap(fields) = criterion {
            for (column, value) in fields.iter() {
                check_column::<E>(column)?;
                clause.fragments.push(format!("{column} = ?"));
                clause.params.push(value.clone());
            }
        }
    }

    Ok(clause)
}
