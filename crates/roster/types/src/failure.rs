use serde::{Deserialize, Serialize};
use std::fmt;

/// Categorical failure reported by every roster operation.
///
/// Error enums in each roster crate wrap one another; `kind()` on any of them
/// flattens the chain back to one of these categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AlreadyPresent,
    NotPresent,
    CannotRemoveLastAuthority,
    WrongSeason,
    NotASeasonMember,
    NothingToRevoke,
    EmptyList,
    ListNotFound,
    NothingToRemove,
    NotListed,
    MintingClosed,
    WrongPayment,
    TransferFailed,
    Unauthorized,
    /// Collaborator or lock failure outside the categories above.
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::AlreadyPresent => "already_present",
            FailureKind::NotPresent => "not_present",
            FailureKind::CannotRemoveLastAuthority => "cannot_remove_last_authority",
            FailureKind::WrongSeason => "wrong_season",
            FailureKind::NotASeasonMember => "not_a_season_member",
            FailureKind::NothingToRevoke => "nothing_to_revoke",
            FailureKind::EmptyList => "empty_list",
            FailureKind::ListNotFound => "list_not_found",
            FailureKind::NothingToRemove => "nothing_to_remove",
            FailureKind::NotListed => "not_listed",
            FailureKind::MintingClosed => "minting_closed",
            FailureKind::WrongPayment => "wrong_payment",
            FailureKind::TransferFailed => "transfer_failed",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Internal => "internal",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_name_matches_display() {
        for kind in [
            FailureKind::CannotRemoveLastAuthority,
            FailureKind::NotASeasonMember,
            FailureKind::WrongPayment,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }
}
