use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use roster_authority::Authorizer;
use roster_registry::CredentialIssuer;
use roster_types::{Address, Amount, CallContext, ListId, SeasonId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AccessError;
use crate::list::AccessList;
use crate::settlement::PaymentSettlement;

/// What happens to a caller's list entry after a successful enrollment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentPolicy {
    /// The caller stays listed. Repeat enrollments pay again and issuance is
    /// idempotent.
    #[default]
    Repeatable,
    /// The caller is tombstoned from the list once enrolled.
    SingleUse,
}

/// Outcome of a successful self-enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub list: ListId,
    pub season: SeasonId,
    pub member: Address,
    /// False when the caller already held the season credential.
    pub newly_issued: bool,
    pub paid: Amount,
}

/// Priced allow-list gate in front of credential issuance.
///
/// The gate does not own the authority directory or the registry; it holds
/// capability references to both, swappable through
/// [`AccessGate::update_references`]. Delegated issuance is performed under
/// `address`, which must itself be authorized by the issuer.
pub struct AccessGate {
    address: Address,
    policy: EnrollmentPolicy,
    settlement: Arc<dyn PaymentSettlement>,
    references: RwLock<GateReferences>,
    state: RwLock<GateState>,
}

struct GateReferences {
    authority: Arc<dyn Authorizer>,
    issuer: Arc<dyn CredentialIssuer>,
}

struct GateState {
    lists: BTreeMap<ListId, AccessList>,
    next_list: ListId,
}

impl AccessGate {
    pub fn new(
        address: Address,
        policy: EnrollmentPolicy,
        authority: Arc<dyn Authorizer>,
        issuer: Arc<dyn CredentialIssuer>,
        settlement: Arc<dyn PaymentSettlement>,
    ) -> Self {
        Self {
            address,
            policy,
            settlement,
            references: RwLock::new(GateReferences { authority, issuer }),
            state: RwLock::new(GateState {
                lists: BTreeMap::new(),
                next_list: ListId(1),
            }),
        }
    }

    /// The identity the gate uses when it forwards issuance.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn policy(&self) -> EnrollmentPolicy {
        self.policy
    }

    /// Swap the authorizer and issuer the gate consults.
    pub fn update_references(
        &self,
        ctx: &CallContext,
        authority: Arc<dyn Authorizer>,
        issuer: Arc<dyn CredentialIssuer>,
    ) -> Result<(), AccessError> {
        let mut references = self
            .references
            .write()
            .map_err(|_| AccessError::LockPoisoned)?;
        if !references.authority.is_authorized(&ctx.caller) {
            warn!(caller = %ctx.caller, "Unauthorized reference update rejected");
            return Err(AccessError::Unauthorized(ctx.caller));
        }

        references.authority = authority;
        references.issuer = issuer;
        info!(caller = %ctx.caller, "Gate references updated");
        Ok(())
    }

    /// Create a list from `addrs` and return its id.
    pub fn create_list(&self, ctx: &CallContext, addrs: &[Address]) -> Result<ListId, AccessError> {
        let mut state = self.state.write().map_err(|_| AccessError::LockPoisoned)?;
        self.ensure_authorized(&ctx.caller)?;
        if addrs.is_empty() {
            return Err(AccessError::EmptyList);
        }

        let id = state.next_list;
        state.next_list = id.next();
        state.lists.entry(id).or_default().append(addrs);

        info!(caller = %ctx.caller, list = id.0, entries = addrs.len(), "Access list created");
        Ok(id)
    }

    /// Append to a list that has at least one slot, tombstones included.
    pub fn append_to_list(
        &self,
        ctx: &CallContext,
        id: ListId,
        addrs: &[Address],
    ) -> Result<(), AccessError> {
        let mut state = self.state.write().map_err(|_| AccessError::LockPoisoned)?;
        self.ensure_authorized(&ctx.caller)?;
        if addrs.is_empty() {
            return Err(AccessError::EmptyList);
        }

        let list = state
            .lists
            .get_mut(&id)
            .filter(|list| !list.is_empty())
            .ok_or(AccessError::ListNotFound(id))?;
        list.append(addrs);

        info!(caller = %ctx.caller, list = id.0, appended = addrs.len(), "Access list extended");
        Ok(())
    }

    /// Tombstone every occurrence of `addr` and unlist it.
    pub fn remove_from_list(
        &self,
        ctx: &CallContext,
        id: ListId,
        addr: &Address,
    ) -> Result<usize, AccessError> {
        let mut state = self.state.write().map_err(|_| AccessError::LockPoisoned)?;
        self.ensure_authorized(&ctx.caller)?;

        let list = state
            .lists
            .get_mut(&id)
            .filter(|list| !list.is_empty())
            .ok_or(AccessError::NothingToRemove(id))?;
        let cleared = list.tombstone(addr);

        info!(caller = %ctx.caller, list = id.0, member = %addr, cleared, "Removed from access list");
        Ok(cleared)
    }

    pub fn set_fee(&self, ctx: &CallContext, id: ListId, fee: Amount) -> Result<(), AccessError> {
        let mut state = self.state.write().map_err(|_| AccessError::LockPoisoned)?;
        self.ensure_authorized(&ctx.caller)?;

        state.lists.entry(id).or_default().set_fee(fee);
        info!(caller = %ctx.caller, list = id.0, fee = %fee, "Access list fee set");
        Ok(())
    }

    pub fn set_open(&self, ctx: &CallContext, id: ListId, open: bool) -> Result<(), AccessError> {
        let mut state = self.state.write().map_err(|_| AccessError::LockPoisoned)?;
        self.ensure_authorized(&ctx.caller)?;

        state.lists.entry(id).or_default().set_open(open);
        info!(caller = %ctx.caller, list = id.0, open, "Access list minting toggled");
        Ok(())
    }

    /// Public enrollment: listed + open + exact fee, then issuance.
    ///
    /// Payment is only credited once issuance has succeeded; a failed
    /// enrollment leaves lists, credentials and escrow as they were.
    pub fn self_enroll(
        &self,
        ctx: &CallContext,
        id: ListId,
        season: SeasonId,
        payment: Amount,
    ) -> Result<Enrollment, AccessError> {
        let mut state = self.state.write().map_err(|_| AccessError::LockPoisoned)?;

        let list = state
            .lists
            .get_mut(&id)
            .filter(|list| list.is_listed(&ctx.caller))
            .ok_or(AccessError::NotListed {
                caller: ctx.caller,
                list: id,
            })?;
        if !list.is_open() {
            return Err(AccessError::MintingClosed(id));
        }
        if payment != list.fee() {
            return Err(AccessError::WrongPayment {
                expected: list.fee(),
                offered: payment,
            });
        }

        let issuer = self
            .references
            .read()
            .map_err(|_| AccessError::LockPoisoned)?
            .issuer
            .clone();
        let issued = issuer.issue(&ctx.on_behalf_of(self.address), &[ctx.caller], season)?;

        self.settlement.accept(&ctx.caller, payment);
        if self.policy == EnrollmentPolicy::SingleUse {
            list.tombstone(&ctx.caller);
            debug!(member = %ctx.caller, list = id.0, "Single-use entry consumed");
        }

        let newly_issued = !issued.is_empty();
        info!(
            member = %ctx.caller,
            list = id.0,
            season = season.0,
            paid = %payment,
            newly_issued,
            "Self-enrollment accepted"
        );
        Ok(Enrollment {
            list: id,
            season,
            member: ctx.caller,
            newly_issued,
            paid: payment,
        })
    }

    /// Release the whole accumulated balance to `to`.
    pub fn withdraw(&self, ctx: &CallContext, to: &Address) -> Result<Amount, AccessError> {
        let _state = self.state.write().map_err(|_| AccessError::LockPoisoned)?;
        self.ensure_authorized(&ctx.caller)?;

        let amount = self.settlement.balance();
        if !self.settlement.release(to, amount) {
            warn!(caller = %ctx.caller, recipient = %to, amount = %amount, "Withdrawal failed");
            return Err(AccessError::TransferFailed { to: *to, amount });
        }

        info!(caller = %ctx.caller, recipient = %to, amount = %amount, "Balance withdrawn");
        Ok(amount)
    }

    pub fn balance(&self) -> Amount {
        self.settlement.balance()
    }

    /// Number of lists ever created.
    pub fn list_count(&self) -> Result<u64, AccessError> {
        let state = self.state.read().map_err(|_| AccessError::LockPoisoned)?;
        Ok(state.next_list.0 - 1)
    }

    pub fn is_listed(&self, id: ListId, addr: &Address) -> Result<bool, AccessError> {
        self.with_list(id, |list| list.is_some_and(|l| l.is_listed(addr)))
    }

    /// Raw entries of a list, tombstones included. Empty for unknown ids.
    pub fn entries(&self, id: ListId) -> Result<Vec<Address>, AccessError> {
        self.with_list(id, |list| {
            list.map(|l| l.entries().to_vec()).unwrap_or_default()
        })
    }

    pub fn fee(&self, id: ListId) -> Result<Amount, AccessError> {
        self.with_list(id, |list| list.map_or(0, AccessList::fee))
    }

    pub fn is_open(&self, id: ListId) -> Result<bool, AccessError> {
        self.with_list(id, |list| list.is_some_and(AccessList::is_open))
    }

    fn with_list<T>(
        &self,
        id: ListId,
        read: impl FnOnce(Option<&AccessList>) -> T,
    ) -> Result<T, AccessError> {
        let state = self.state.read().map_err(|_| AccessError::LockPoisoned)?;
        Ok(read(state.lists.get(&id)))
    }

    fn ensure_authorized(&self, caller: &Address) -> Result<(), AccessError> {
        let references = self
            .references
            .read()
            .map_err(|_| AccessError::LockPoisoned)?;
        if references.authority.is_authorized(caller) {
            Ok(())
        } else {
            warn!(caller = %caller, "Unauthorized gate mutation rejected");
            Err(AccessError::Unauthorized(*caller))
        }
    }
}
