use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VigilError {
    #[error("Engine is not initialized")]
    NotInitialized,

    #[error("Engine is already initialized")]
    AlreadyInitialized,

    #[error("Transaction is not writable")]
    NotWritable,

    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller-requested abort of a read-write transaction.
    #[error("Transaction rolled back")]
    Rollback,

    #[error("Index not found: {0}")]
    IndexNotFound(String),

    #[error("Storage is full")]
    StorageFull,

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl VigilError {
    /// True for a missing key; callers routinely treat this as a valid outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VigilError::NotFound(_))
    }

    pub fn is_rollback(&self) -> bool {
        matches!(self, VigilError::Rollback)
    }
}

impl From<serde_json::Error> for VigilError {
    fn from(err: serde_json::Error) -> Self {
        VigilError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VigilError>;
