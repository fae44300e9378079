use std::sync::Arc;

use chrono::Utc;
use roster_access::{AccessGate, Enrollment, InMemorySettlement, PaymentSettlement};
use roster_authority::{AuthorityGate, Authorizer, DelegatedAuthorizer};
use roster_registry::{
    CredentialIssuer, CredentialLedger, InMemoryCredentialLedger, SeasonalRegistry,
};
use roster_types::{Address, Amount, CallContext, ListId, SeasonId};
use tracing::info;

use crate::config::RosterConfig;
use crate::error::RosterError;
use crate::journal::{AuditJournal, RosterEvent};

/// The assembled roster.
///
/// Each method is one atomic operation: all checks precede any mutation, and
/// a failed call leaves every component and the journal unchanged.
pub struct RosterService {
    authority: Arc<AuthorityGate>,
    registry: Arc<SeasonalRegistry>,
    gate: AccessGate,
    ledger: Arc<dyn CredentialLedger>,
    journal: AuditJournal,
}

impl RosterService {
    /// Build the roster. The registry accepts the gate address as a
    /// delegate for issuance; it is never an authority holder.
    pub fn new(
        config: &RosterConfig,
        ledger: Arc<dyn CredentialLedger>,
        settlement: Arc<dyn PaymentSettlement>,
    ) -> Result<Self, RosterError> {
        config.validate()?;

        let gate_address = config.access.gate_address;
        let authority = Arc::new(AuthorityGate::new(
            config.authority.holders.iter().copied(),
            Utc::now(),
        )?);
        let issuers = Arc::new(DelegatedAuthorizer::new(authority.clone(), [gate_address]));
        let registry = Arc::new(SeasonalRegistry::new(
            issuers,
            ledger.clone(),
            config.registry.initial_season,
        ));
        let gate = AccessGate::new(
            gate_address,
            config.access.enrollment,
            authority.clone(),
            registry.clone(),
            settlement,
        );

        info!(
            holders = config.authority.holders.len(),
            gate = %gate_address,
            season = config.registry.initial_season.0,
            enrollment = ?config.access.enrollment,
            "Roster assembled"
        );
        Ok(Self {
            authority,
            registry,
            gate,
            ledger,
            journal: AuditJournal::new(),
        })
    }

    /// Roster backed by the in-memory ledger and escrow.
    pub fn in_memory(config: &RosterConfig) -> Result<Self, RosterError> {
        Self::new(
            config,
            Arc::new(InMemoryCredentialLedger::new()),
            Arc::new(InMemorySettlement::new()),
        )
    }

    // --- authority ---

    pub fn grant_authority(&self, ctx: &CallContext, holder: Address) -> Result<(), RosterError> {
        self.authority.grant(ctx, holder)?;
        self.journal
            .record(ctx, RosterEvent::AuthorityGranted { holder })?;
        Ok(())
    }

    pub fn revoke_authority(&self, ctx: &CallContext, holder: Address) -> Result<(), RosterError> {
        self.authority.revoke(ctx, &holder)?;
        self.journal
            .record(ctx, RosterEvent::AuthorityRevoked { holder })?;
        Ok(())
    }

    pub fn is_authorized(&self, addr: &Address) -> bool {
        self.authority.is_authorized(addr)
    }

    pub fn authority_count(&self) -> Result<usize, RosterError> {
        Ok(self.authority.count()?)
    }

    pub fn authority_holders(&self) -> Result<Vec<Address>, RosterError> {
        Ok(self.authority.holders()?)
    }

    // --- seasons ---

    pub fn set_current_season(&self, ctx: &CallContext, season: SeasonId) -> Result<(), RosterError> {
        self.registry.set_current_season(ctx, season)?;
        self.journal
            .record(ctx, RosterEvent::CurrentSeasonSet { season })?;
        Ok(())
    }

    /// Issue credentials; returns the newly issued members.
    pub fn issue(
        &self,
        ctx: &CallContext,
        members: &[Address],
        season: SeasonId,
    ) -> Result<Vec<Address>, RosterError> {
        let issued = self.registry.issue(ctx, members, season)?;
        self.journal.record(
            ctx,
            RosterEvent::CredentialsIssued {
                season,
                members: issued.clone(),
            },
        )?;
        Ok(issued)
    }

    pub fn revoke_credential(
        &self,
        ctx: &CallContext,
        member: Address,
        season: SeasonId,
    ) -> Result<(), RosterError> {
        self.registry.revoke(ctx, &member, season)?;
        self.journal
            .record(ctx, RosterEvent::CredentialRevoked { season, member })?;
        Ok(())
    }

    pub fn current_season(&self) -> Result<SeasonId, RosterError> {
        Ok(self.registry.current_season()?)
    }

    pub fn members_of(&self, season: SeasonId) -> Result<Vec<Address>, RosterError> {
        Ok(self.registry.members_of(season)?)
    }

    pub fn is_season_member(&self, member: &Address, season: SeasonId) -> Result<bool, RosterError> {
        Ok(self.registry.is_member(member, season)?)
    }

    pub fn seasons(&self) -> Result<Vec<SeasonId>, RosterError> {
        Ok(self.registry.seasons()?)
    }

    /// Credential units `owner` holds on the ledger for `season`.
    pub fn credential_balance(&self, owner: &Address, season: SeasonId) -> Result<u64, RosterError> {
        Ok(self.ledger.balance_of(owner, season)?)
    }

    // --- access lists ---

    pub fn create_list(&self, ctx: &CallContext, entries: &[Address]) -> Result<ListId, RosterError> {
        let list = self.gate.create_list(ctx, entries)?;
        self.journal.record(
            ctx,
            RosterEvent::ListCreated {
                list,
                entries: entries.to_vec(),
            },
        )?;
        Ok(list)
    }

    pub fn append_to_list(
        &self,
        ctx: &CallContext,
        list: ListId,
        entries: &[Address],
    ) -> Result<(), RosterError> {
        self.gate.append_to_list(ctx, list, entries)?;
        self.journal.record(
            ctx,
            RosterEvent::ListExtended {
                list,
                entries: entries.to_vec(),
            },
        )?;
        Ok(())
    }

    pub fn remove_from_list(
        &self,
        ctx: &CallContext,
        list: ListId,
        member: Address,
    ) -> Result<usize, RosterError> {
        let cleared = self.gate.remove_from_list(ctx, list, &member)?;
        self.journal.record(
            ctx,
            RosterEvent::ListEntryRemoved {
                list,
                member,
                cleared,
            },
        )?;
        Ok(cleared)
    }

    pub fn set_fee(&self, ctx: &CallContext, list: ListId, fee: Amount) -> Result<(), RosterError> {
        self.gate.set_fee(ctx, list, fee)?;
        self.journal.record(ctx, RosterEvent::FeeSet { list, fee })?;
        Ok(())
    }

    pub fn set_open(&self, ctx: &CallContext, list: ListId, open: bool) -> Result<(), RosterError> {
        self.gate.set_open(ctx, list, open)?;
        self.journal
            .record(ctx, RosterEvent::MintingToggled { list, open })?;
        Ok(())
    }

    pub fn self_enroll(
        &self,
        ctx: &CallContext,
        list: ListId,
        season: SeasonId,
        payment: Amount,
    ) -> Result<Enrollment, RosterError> {
        let enrollment = self.gate.self_enroll(ctx, list, season, payment)?;
        self.journal.record(
            ctx,
            RosterEvent::SelfEnrolled {
                list,
                season,
                member: enrollment.member,
                newly_issued: enrollment.newly_issued,
                paid: enrollment.paid,
            },
        )?;
        Ok(enrollment)
    }

    pub fn withdraw(&self, ctx: &CallContext, to: Address) -> Result<Amount, RosterError> {
        let amount = self.gate.withdraw(ctx, &to)?;
        self.journal.record(ctx, RosterEvent::Withdrawn { to, amount })?;
        Ok(amount)
    }

    /// Point the access gate at a different authorizer and issuer.
    pub fn update_gate_references(
        &self,
        ctx: &CallContext,
        authority: Arc<dyn Authorizer>,
        issuer: Arc<dyn CredentialIssuer>,
    ) -> Result<(), RosterError> {
        self.gate.update_references(ctx, authority, issuer)?;
        self.journal.record(ctx, RosterEvent::ReferencesUpdated)?;
        Ok(())
    }

    pub fn is_listed(&self, list: ListId, addr: &Address) -> Result<bool, RosterError> {
        Ok(self.gate.is_listed(list, addr)?)
    }

    pub fn list_entries(&self, list: ListId) -> Result<Vec<Address>, RosterError> {
        Ok(self.gate.entries(list)?)
    }

    pub fn list_fee(&self, list: ListId) -> Result<Amount, RosterError> {
        Ok(self.gate.fee(list)?)
    }

    pub fn list_is_open(&self, list: ListId) -> Result<bool, RosterError> {
        Ok(self.gate.is_open(list)?)
    }

    pub fn list_count(&self) -> Result<u64, RosterError> {
        Ok(self.gate.list_count()?)
    }

    /// Unreleased enrollment payments.
    pub fn gate_balance(&self) -> Amount {
        self.gate.balance()
    }

    pub fn gate_address(&self) -> Address {
        self.gate.address()
    }

    // --- components ---

    pub fn authority(&self) -> &Arc<AuthorityGate> {
        &self.authority
    }

    pub fn registry(&self) -> &Arc<SeasonalRegistry> {
        &self.registry
    }

    pub fn journal(&self) -> &AuditJournal {
        &self.journal
    }
}
