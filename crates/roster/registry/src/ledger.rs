use std::collections::HashMap;
use std::sync::RwLock;

use roster_types::{Address, SeasonId};
use tracing::debug;

use crate::error::LedgerError;

/// Boundary to the external credential ledger.
///
/// Credentials are soulbound: they come into existence through `mint_one`,
/// leave through `burn_one`, and any transfer where neither endpoint is the
/// null account is rejected.
pub trait CredentialLedger: Send + Sync {
    fn mint_one(&self, to: &Address, season: SeasonId) -> Result<(), LedgerError>;

    fn burn_one(&self, from: &Address, season: SeasonId) -> Result<(), LedgerError>;

    fn balance_of(&self, owner: &Address, season: SeasonId) -> Result<u64, LedgerError>;

    /// Move one credential. Only mint (`from` null) and burn (`to` null)
    /// shapes are accepted.
    fn transfer(&self, from: &Address, to: &Address, season: SeasonId) -> Result<(), LedgerError>;
}

/// In-memory credential ledger used for tests, local replay, and embedding.
#[derive(Default)]
pub struct InMemoryCredentialLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    balances: HashMap<(Address, SeasonId), u64>,
    supply: HashMap<SeasonId, u64>,
}

impl InMemoryCredentialLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outstanding credentials for `season`.
    pub fn total_supply(&self, season: SeasonId) -> Result<u64, LedgerError> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.supply.get(&season).copied().unwrap_or(0))
    }
}

impl CredentialLedger for InMemoryCredentialLedger {
    fn mint_one(&self, to: &Address, season: SeasonId) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::NullAccount);
        }

        let mut state = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;
        *state.balances.entry((*to, season)).or_insert(0) += 1;
        *state.supply.entry(season).or_insert(0) += 1;
        debug!(owner = %to, season = season.0, "Credential minted");
        Ok(())
    }

    fn burn_one(&self, from: &Address, season: SeasonId) -> Result<(), LedgerError> {
        if from.is_zero() {
            return Err(LedgerError::NullAccount);
        }

        let mut state = self.inner.write().map_err(|_| LedgerError::LockPoisoned)?;
        let balance = state
            .balances
            .get_mut(&(*from, season))
            .filter(|balance| **balance > 0)
            .ok_or(LedgerError::InsufficientBalance {
                owner: *from,
                season,
            })?;
        *balance -= 1;
        if *balance == 0 {
            state.balances.remove(&(*from, season));
        }
        if let Some(supply) = state.supply.get_mut(&season) {
            *supply = supply.saturating_sub(1);
        }
        debug!(owner = %from, season = season.0, "Credential burned");
        Ok(())
    }

    fn balance_of(&self, owner: &Address, season: SeasonId) -> Result<u64, LedgerError> {
        let state = self.inner.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.balances.get(&(*owner, season)).copied().unwrap_or(0))
    }

    fn transfer(&self, from: &Address, to: &Address, season: SeasonId) -> Result<(), LedgerError> {
        match (from.is_zero(), to.is_zero()) {
            (true, false) => self.mint_one(to, season),
            (false, true) => self.burn_one(from, season),
            _ => Err(LedgerError::TransferBlocked {
                from: *from,
                to: *to,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address::repeat_byte(seed)
    }

    #[test]
    fn mint_and_burn_track_balance_and_supply() {
        let ledger = InMemoryCredentialLedger::new();
        let season = SeasonId(1);

        ledger.mint_one(&addr(1), season).unwrap();
        ledger.mint_one(&addr(2), season).unwrap();
        assert_eq!(ledger.balance_of(&addr(1), season).unwrap(), 1);
        assert_eq!(ledger.total_supply(season).unwrap(), 2);

        ledger.burn_one(&addr(1), season).unwrap();
        assert_eq!(ledger.balance_of(&addr(1), season).unwrap(), 0);
        assert_eq!(ledger.total_supply(season).unwrap(), 1);
        assert_eq!(ledger.total_supply(SeasonId(2)).unwrap(), 0);
    }

    #[test]
    fn burn_without_balance_fails() {
        let ledger = InMemoryCredentialLedger::new();
        let err = ledger.burn_one(&addr(1), SeasonId(1)).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientBalance {
                owner: addr(1),
                season: SeasonId(1)
            }
        );
    }

    #[test]
    fn null_account_cannot_hold_credentials() {
        let ledger = InMemoryCredentialLedger::new();
        assert_eq!(
            ledger.mint_one(&Address::ZERO, SeasonId(1)),
            Err(LedgerError::NullAccount)
        );
    }

    #[test]
    fn peer_to_peer_transfer_is_blocked() {
        let ledger = InMemoryCredentialLedger::new();
        let season = SeasonId(3);
        ledger.transfer(&Address::ZERO, &addr(1), season).unwrap();

        let err = ledger.transfer(&addr(1), &addr(2), season).unwrap_err();
        assert!(matches!(err, LedgerError::TransferBlocked { .. }));
        assert_eq!(ledger.balance_of(&addr(1), season).unwrap(), 1);
        assert_eq!(ledger.balance_of(&addr(2), season).unwrap(), 0);

        ledger.transfer(&addr(1), &Address::ZERO, season).unwrap();
        assert_eq!(ledger.balance_of(&addr(1), season).unwrap(), 0);
    }

    #[test]
    fn null_to_null_transfer_is_blocked() {
        let ledger = InMemoryCredentialLedger::new();
        assert!(matches!(
            ledger.transfer(&Address::ZERO, &Address::ZERO, SeasonId(1)),
            Err(LedgerError::TransferBlocked { .. })
        ));
    }
}
