use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// A UNIQUE, FOREIGN KEY or CHECK constraint rejected the write.
    #[error("constraint violation: {0}")]
    Integrity(String),

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg) if code.code == ErrorCode::ConstraintViolation => {
                DbError::Integrity(msg.clone().unwrap_or_else(|| err.to_string()))
            }
            _ => DbError::Sqlite(err),
        }
    }
}
