use thiserror::Error;

use crate::identity::Identity;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account already registered: {0}")]
    AlreadyRegistered(Identity),
    #[error("Account not registered: {0}")]
    NotRegistered(Identity),
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),
    #[error("Invalid hex value: {0}")]
    InvalidHex(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("Ledger state lock poisoned")]
    StatePoisoned,
}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::DatabaseError(err.to_string())
    }
}

impl From<bincode::Error> for LedgerError {
    fn from(err: bincode::Error) -> Self {
        LedgerError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
