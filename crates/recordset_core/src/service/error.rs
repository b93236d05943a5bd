//! Service error taxonomy.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Errors surfaced by record service operations.
///
/// Absence is not represented here: `get` returns `Ok(None)` and
/// `destroy` skips unresolvable identities by design.
#[derive(Debug)]
pub enum ServiceError {
    /// Transport or engine failure below the service contract.
    Db(rusqlite::Error),
    /// Primary-key, uniqueness, foreign-key, or not-null violation.
    /// Aborts the whole batch it occurred in.
    Constraint(String),
    /// Criteria or ordering referenced a column the entity type lacks.
    UnknownColumn {
        table: &'static str,
        column: String,
    },
    /// A persisted row failed to decode into the entity type.
    InvalidRow(String),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint(message) => write!(f, "constraint violation: {message}"),
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` for table `{table}`")
            }
            Self::InvalidRow(message) => write!(f, "invalid persisted row: {message}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Constraint(_) => None,
            Self::UnknownColumn { .. } => None,
            Self::InvalidRow(_) => None,
        }
    }
}

impl From<rusqlite::Error> for ServiceError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(err, message)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Self::Constraint(message.unwrap_or_else(|| err.to_string()))
            }
            other => Self::Db(other),
        }
    }
}
