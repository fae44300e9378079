use roster_registry::RegistryError;
use roster_types::{Address, Amount, FailureKind, ListId};
use thiserror::Error;

/// Errors from the access gate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("caller is not an authority holder: {0}")]
    Unauthorized(Address),

    #[error("address list is empty")]
    EmptyList,

    #[error("access list not found: {0}")]
    ListNotFound(ListId),

    #[error("{0} has no entries to remove")]
    NothingToRemove(ListId),

    #[error("{caller} is not listed on {list}")]
    NotListed { caller: Address, list: ListId },

    #[error("minting is closed for {0}")]
    MintingClosed(ListId),

    #[error("wrong payment: expected {expected}, got {offered}")]
    WrongPayment { expected: Amount, offered: Amount },

    #[error("transfer of {amount} to {to} failed")]
    TransferFailed { to: Address, amount: Amount },

    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Lock error")]
    LockPoisoned,
}

impl AccessError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AccessError::Unauthorized(_) => FailureKind::Unauthorized,
            AccessError::EmptyList => FailureKind::EmptyList,
            AccessError::ListNotFound(_) => FailureKind::ListNotFound,
            AccessError::NothingToRemove(_) => FailureKind::NothingToRemove,
            AccessError::NotListed { .. } => FailureKind::NotListed,
            AccessError::MintingClosed(_) => FailureKind::MintingClosed,
            AccessError::WrongPayment { .. } => FailureKind::WrongPayment,
            AccessError::TransferFailed { .. } => FailureKind::TransferFailed,
            AccessError::Registry(e) => e.kind(),
            AccessError::LockPoisoned => FailureKind::Internal,
        }
    }
}
