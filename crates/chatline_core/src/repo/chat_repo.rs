//! Chat store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide the CRUD contract consumed by `ChatService`.
//! - Keep SQL details and driver error codes inside the persistence boundary.
//!
//! # Invariants
//! - "No such row" is always `StoreError::NotFound`.
//! - Unique/primary-key constraint failures are always `StoreError::Duplicate`.
//! - `update` writes `body` only; other columns are never rewritten.

use crate::db::DbError;
use crate::model::chat::{Chat, ChatId};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const CHAT_SELECT_SQL: &str = "SELECT
    id,
    sender,
    receiver,
    body,
    created_at
FROM chats";

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence failure reported by a `ChatStore`.
#[derive(Debug)]
pub enum StoreError {
    /// No row matches the requested id.
    NotFound(ChatId),
    /// A unique or primary-key constraint rejected the write.
    Duplicate(String),
    /// Persisted row cannot be mapped back to a `Chat`.
    InvalidData(String),
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "chat not found: {id}"),
            Self::Duplicate(details) => write!(f, "duplicate chat: {details}"),
            Self::InvalidData(message) => write!(f, "invalid persisted chat data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        if is_unique_violation(&value) {
            return Self::Duplicate(value.to_string());
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence contract for chat CRUD.
pub trait ChatStore {
    fn get(&self, id: ChatId) -> StoreResult<Chat>;
    /// Persists `chat` and returns it with the store-assigned id.
    fn create(&self, chat: &Chat) -> StoreResult<Chat>;
    fn update(&self, chat: &Chat) -> StoreResult<Chat>;
    fn delete(&self, id: ChatId) -> StoreResult<()>;
    fn get_all(&self) -> StoreResult<Vec<Chat>>;
}

impl<S: ChatStore + ?Sized> ChatStore for &S {
    fn get(&self, id: ChatId) -> StoreResult<Chat> {
        (**self).get(id)
    }

    fn create(&self, chat: &Chat) -> StoreResult<Chat> {
        (**self).create(chat)
    }

    fn update(&self, chat: &Chat) -> StoreResult<Chat> {
        (**self).update(chat)
    }

    fn delete(&self, id: ChatId) -> StoreResult<()> {
        (**self).delete(id)
    }

    fn get_all(&self) -> StoreResult<Vec<Chat>> {
        (**self).get_all()
    }
}

/// SQLite-backed chat store.
pub struct SqliteChatRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteChatRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ChatStore for SqliteChatRepository<'_> {
    fn get(&self, id: ChatId) -> StoreResult<Chat> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHAT_SELECT_SQL} WHERE id = ?1;"))?;
        match stmt.query_row([id], read_raw_row).optional()? {
            Some(raw) => parse_chat_row(raw),
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn create(&self, chat: &Chat) -> StoreResult<Chat> {
        self.conn.execute(
            "INSERT INTO chats (sender, receiver, body, created_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                chat.sender.as_str(),
                chat.receiver.as_str(),
                chat.body.as_str(),
                timestamp_to_db(&chat.created_at),
            ],
        )?;

        let mut created = chat.clone();
        created.id = self.conn.last_insert_rowid();
        Ok(created)
    }

    fn update(&self, chat: &Chat) -> StoreResult<Chat> {
        let changed = self.conn.execute(
            "UPDATE chats SET body = ?1 WHERE id = ?2;",
            params![chat.body.as_str(), chat.id],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(chat.id));
        }

        Ok(chat.clone())
    }

    fn delete(&self, id: ChatId) -> StoreResult<()> {
        self.conn.execute("DELETE FROM chats WHERE id = ?1;", [id])?;
        Ok(())
    }

    fn get_all(&self) -> StoreResult<Vec<Chat>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CHAT_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut chats = Vec::new();

        while let Some(row) = rows.next()? {
            chats.push(parse_chat_row(read_raw_row(row)?)?);
        }

        Ok(chats)
    }
}

struct RawChatRow {
    id: ChatId,
    sender: String,
    receiver: String,
    body: String,
    created_at: String,
}

fn read_raw_row(row: &Row<'_>) -> rusqlite::Result<RawChatRow> {
    Ok(RawChatRow {
        id: row.get("id")?,
        sender: row.get("sender")?,
        receiver: row.get("receiver")?,
        body: row.get("body")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_chat_row(raw: RawChatRow) -> StoreResult<Chat> {
    let created_at = DateTime::parse_from_rfc3339(&raw.created_at)
        .map_err(|_| {
            StoreError::InvalidData(format!(
                "invalid timestamp `{}` in chats.created_at for id {}",
                raw.created_at, raw.id
            ))
        })?
        .with_timezone(&Utc);

    Ok(Chat {
        id: raw.id,
        sender: raw.sender,
        receiver: raw.receiver,
        body: raw.body,
        created_at,
    })
}

fn timestamp_to_db(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, _) => {
            failure.code == ErrorCode::ConstraintViolation
                && (failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}
