//! SQLite connection bootstrap.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by record services.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout set.
//! - Schema management stays outside this crate; callers create their
//!   tables before handing the connection to a service.

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, rusqlite::Error>;
