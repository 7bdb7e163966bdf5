use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArborBotError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("upstream timeout after {0}s")]
    UpstreamTimeout(u64),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("message counter out of sync for session {session_id}: counter={counter} rows={rows}")]
    CounterConsistency {
        session_id: String,
        counter: i64,
        rows: i64,
    },
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl From<diesel::result::Error> for ArborBotError {
    fn from(err: diesel::result::Error) -> Self {
        ArborBotError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ArborBotError>;
