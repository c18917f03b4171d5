use std::fmt;

use thiserror::Error;

use crate::storage::StoreError;

/// Entity kinds referenced by lookup failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Person,
    Transaction,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Person => f.write_str("Person"),
            Entity::Transaction => f.write_str("Transaction"),
        }
    }
}

/// Error type that captures every failure the ledger core reports to its callers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("`{0}` already exists")]
    DuplicateName(String),
    #[error("Maximum of {0} people reached")]
    LimitReached(usize),
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: String },
    #[error("Selected person not found: {0}")]
    PersonNotFound(String),
    #[error("Amount must be a number greater than 0 (got `{0}`)")]
    InvalidAmount(String),
    #[error("Date must be a real calendar date as DD-MM-YYYY or YYYY-MM-DD (got `{0}`)")]
    InvalidDate(String),
    #[error("Invalid transaction type `{0}` (expected GIVEN or RECEIVED)")]
    InvalidType(String),
    #[error("No account is signed in")]
    SignedOut,
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl LedgerError {
    pub fn person_not_found(id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: Entity::Person,
            id: id.into(),
        }
    }

    pub fn transaction_not_found(id: impl Into<String>) -> Self {
        LedgerError::NotFound {
            entity: Entity::Transaction,
            id: id.into(),
        }
    }

    /// True for failures caused by caller input rather than the environment.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            LedgerError::StorageUnavailable(_) | LedgerError::SignedOut
        )
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        LedgerError::StorageUnavailable(err.to_string())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
