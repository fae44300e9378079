use roster_access::AccessError;
use roster_authority::AuthorityError;
use roster_registry::{LedgerError, RegistryError};
use roster_types::FailureKind;
use thiserror::Error;

use crate::journal::JournalError;

/// Errors from the roster service.
#[derive(Error, Debug)]
pub enum RosterError {
    #[error("authority error: {0}")]
    Authority(#[from] AuthorityError),

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("access error: {0}")]
    Access(#[from] AccessError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("journal error: {0}")]
    Journal(#[from] JournalError),
}

impl RosterError {
    /// Failure category, looking through every layer of wrapping.
    pub fn kind(&self) -> FailureKind {
        match self {
            RosterError::Authority(e) => e.kind(),
            RosterError::Registry(e) => e.kind(),
            RosterError::Access(e) => e.kind(),
            RosterError::Ledger(_) | RosterError::Config(_) | RosterError::Journal(_) => {
                FailureKind::Internal
            }
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("failed to read config: {0}")]
    Io(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}
