use roster_directory::DirectoryError;
use roster_types::{Address, FailureKind, SeasonId};
use thiserror::Error;

/// Errors returned by credential ledger implementations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("credentials cannot be minted to or burned from the null account")]
    NullAccount,

    #[error("credential transfer from {from} to {to} blocked: only mint and burn are allowed")]
    TransferBlocked { from: Address, to: Address },

    #[error("{owner} holds no {season} credential to burn")]
    InsufficientBalance { owner: Address, season: SeasonId },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("Lock error")]
    LockPoisoned,
}

/// Errors from the seasonal registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("caller is not an authority holder: {0}")]
    Unauthorized(Address),

    #[error("issuance requested for {requested} but the current season is {current}")]
    WrongSeason {
        requested: SeasonId,
        current: SeasonId,
    },

    #[error("{member} is not a member of {season}")]
    NotASeasonMember { member: Address, season: SeasonId },

    #[error("{0} has no members to revoke")]
    NothingToRevoke(SeasonId),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Lock error")]
    LockPoisoned,
}

impl RegistryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RegistryError::Unauthorized(_) => FailureKind::Unauthorized,
            RegistryError::WrongSeason { .. } => FailureKind::WrongSeason,
            RegistryError::NotASeasonMember { .. } => FailureKind::NotASeasonMember,
            RegistryError::NothingToRevoke(_) => FailureKind::NothingToRevoke,
            RegistryError::Directory(e) => e.kind(),
            RegistryError::Ledger(_) | RegistryError::LockPoisoned => FailureKind::Internal,
        }
    }
}
