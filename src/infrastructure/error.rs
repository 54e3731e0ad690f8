use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("{0}")]
    Assistant(String),
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}
