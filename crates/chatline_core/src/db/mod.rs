//! SQLite storage bootstrap.
//!
//! # Responsibility
//! - Open and configure SQLite connections for chatline.
//! - Ensure the `chats` table exists before any repository use.
//!
//! # Invariants
//! - Schema bootstrap is idempotent (`CREATE TABLE IF NOT EXISTS`).
//! - Core code must not read/write chats before bootstrap succeeds.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
