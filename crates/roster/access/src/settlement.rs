use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use roster_types::{Address, Amount};
use tracing::{debug, warn};

/// Boundary to the payment settlement facility.
pub trait PaymentSettlement: Send + Sync {
    /// Credit a payment that arrived with a successful call.
    fn accept(&self, from: &Address, amount: Amount);

    /// Accumulated, unreleased balance.
    fn balance(&self) -> Amount;

    /// Pay `amount` out to `to`. On `false` nothing moved.
    fn release(&self, to: &Address, amount: Amount) -> bool;
}

/// In-memory escrow used for tests and local replay.
///
/// Recipients registered with [`InMemorySettlement::refuse_payouts_to`]
/// reject every release, which is how failed transfers are exercised.
#[derive(Default)]
pub struct InMemorySettlement {
    inner: RwLock<SettlementState>,
}

#[derive(Default)]
struct SettlementState {
    balance: Amount,
    paid_in: HashMap<Address, Amount>,
    paid_out: HashMap<Address, Amount>,
    refusing: HashSet<Address>,
}

impl InMemorySettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_payouts_to(&self, recipient: Address) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .refusing
            .insert(recipient);
    }

    /// Total accepted from `payer`.
    pub fn paid_by(&self, payer: &Address) -> Amount {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        state.paid_in.get(payer).copied().unwrap_or(0)
    }

    /// Total released to `recipient`.
    pub fn paid_out_to(&self, recipient: &Address) -> Amount {
        let state = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        state.paid_out.get(recipient).copied().unwrap_or(0)
    }
}

impl PaymentSettlement for InMemorySettlement {
    fn accept(&self, from: &Address, amount: Amount) {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        state.balance += amount;
        *state.paid_in.entry(*from).or_insert(0) += amount;
        debug!(payer = %from, amount = %amount, balance = %state.balance, "Payment accepted");
    }

    fn balance(&self) -> Amount {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .balance
    }

    fn release(&self, to: &Address, amount: Amount) -> bool {
        let mut state = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if state.refusing.contains(to) || amount > state.balance {
            warn!(recipient = %to, amount = %amount, "Payout refused");
            return false;
        }

        state.balance -= amount;
        *state.paid_out.entry(*to).or_insert(0) += amount;
        debug!(recipient = %to, amount = %amount, "Payout released");
        true
    }
}
