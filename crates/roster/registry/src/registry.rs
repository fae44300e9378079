use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use roster_authority::Authorizer;
use roster_directory::EnumerableDirectory;
use roster_types::{Address, CallContext, SeasonId};
use tracing::{debug, error, info, warn};

use crate::error::RegistryError;
use crate::ledger::CredentialLedger;

/// Capability: accepts credential issuance requests.
pub trait CredentialIssuer: Send + Sync {
    /// Issue one credential of `season` to each of `members` that does not
    /// hold one yet. Returns the addresses that were newly issued.
    fn issue(
        &self,
        ctx: &CallContext,
        members: &[Address],
        season: SeasonId,
    ) -> Result<Vec<Address>, RegistryError>;
}

/// Seasonal membership registry.
///
/// Season directories are created on the first issuance into that season
/// (the initial season's directory exists from construction). The current
/// season pointer is set by authority holders and is not required to
/// increase.
pub struct SeasonalRegistry {
    authority: Arc<dyn Authorizer>,
    ledger: Arc<dyn CredentialLedger>,
    state: RwLock<RegistryState>,
}

struct RegistryState {
    current_season: SeasonId,
    seasons: BTreeMap<SeasonId, EnumerableDirectory>,
}

impl SeasonalRegistry {
    pub fn new(
        authority: Arc<dyn Authorizer>,
        ledger: Arc<dyn CredentialLedger>,
        initial_season: SeasonId,
    ) -> Self {
        let mut seasons = BTreeMap::new();
        seasons.insert(initial_season, EnumerableDirectory::new());

        Self {
            authority,
            ledger,
            state: RwLock::new(RegistryState {
                current_season: initial_season,
                seasons,
            }),
        }
    }

    pub fn current_season(&self) -> Result<SeasonId, RegistryError> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.current_season)
    }

    /// Point issuance at `season`. No directory needs to exist for it yet.
    pub fn set_current_season(
        &self,
        ctx: &CallContext,
        season: SeasonId,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write().map_err(|_| RegistryError::LockPoisoned)?;
        self.ensure_authorized(&ctx.caller)?;

        let previous = state.current_season;
        state.current_season = season;
        info!(
            caller = %ctx.caller,
            previous = previous.0,
            current = season.0,
            "Current season changed"
        );
        Ok(())
    }

    /// Issue credentials for the current season.
    ///
    /// Existing members (and repeats within `members`) are skipped. Every
    /// check runs before the first mint; if a mint fails, credentials already
    /// minted by this call are burned again and the directory is untouched.
    pub fn issue(
        &self,
        ctx: &CallContext,
        members: &[Address],
        season: SeasonId,
    ) -> Result<Vec<Address>, RegistryError> {
        let mut state = self.state.write().map_err(|_| RegistryError::LockPoisoned)?;
        self.ensure_authorized(&ctx.caller)?;

        if season != state.current_season {
            warn!(
                caller = %ctx.caller,
                requested = season.0,
                current = state.current_season.0,
                "Issuance for non-current season rejected"
            );
            return Err(RegistryError::WrongSeason {
                requested: season,
                current: state.current_season,
            });
        }

        let existing = state.seasons.get(&season);
        let mut seen = HashSet::new();
        let mut pending = Vec::with_capacity(members.len());
        for member in members {
            let already_member = existing.is_some_and(|dir| dir.contains(member));
            if already_member || !seen.insert(*member) {
                debug!(member = %member, season = season.0, "Already a season member, skipping");
                continue;
            }
            pending.push(*member);
        }

        self.mint_all(&pending, season)?;

        let directory = state.seasons.entry(season).or_default();
        for member in &pending {
            directory.add(*member, ctx.at)?;
        }

        info!(
            caller = %ctx.caller,
            season = season.0,
            requested = members.len(),
            issued = pending.len(),
            members = directory.len(),
            "Season credentials issued"
        );
        Ok(pending)
    }

    /// Burn `member`'s credential and drop it from the season directory.
    /// Allowed for any season, current or not.
    pub fn revoke(
        &self,
        ctx: &CallContext,
        member: &Address,
        season: SeasonId,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write().map_err(|_| RegistryError::LockPoisoned)?;
        self.ensure_authorized(&ctx.caller)?;

        let directory = match state.seasons.get_mut(&season) {
            Some(directory) if directory.contains(member) => directory,
            _ => {
                return Err(RegistryError::NotASeasonMember {
                    member: *member,
                    season,
                })
            }
        };
        // redundant with the membership check above
        if directory.is_empty() {
            return Err(RegistryError::NothingToRevoke(season));
        }

        self.ledger.burn_one(member, season)?;
        directory.remove(member, ctx.at)?;

        info!(
            caller = %ctx.caller,
            member = %member,
            season = season.0,
            members = directory.len(),
            "Season credential revoked"
        );
        Ok(())
    }

    /// Members of `season` in directory order. Empty for unknown seasons.
    pub fn members_of(&self, season: SeasonId) -> Result<Vec<Address>, RegistryError> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state
            .seasons
            .get(&season)
            .map(EnumerableDirectory::enumerate)
            .unwrap_or_default())
    }

    pub fn is_member(&self, member: &Address, season: SeasonId) -> Result<bool, RegistryError> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state
            .seasons
            .get(&season)
            .is_some_and(|dir| dir.contains(member)))
    }

    pub fn member_count(&self, season: SeasonId) -> Result<usize, RegistryError> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.seasons.get(&season).map_or(0, EnumerableDirectory::len))
    }

    /// Member at position `index` of `season`, or the zero address.
    pub fn member_by_index(&self, season: SeasonId, index: usize) -> Result<Address, RegistryError> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state
            .seasons
            .get(&season)
            .map_or(Address::ZERO, |dir| dir.by_index(index)))
    }

    /// Seasons that have a directory, ascending.
    pub fn seasons(&self) -> Result<Vec<SeasonId>, RegistryError> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.seasons.keys().copied().collect())
    }

    pub fn joined_at(
        &self,
        member: &Address,
        season: SeasonId,
    ) -> Result<Option<DateTime<Utc>>, RegistryError> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.seasons.get(&season).and_then(|dir| dir.joined_at(member)))
    }

    pub fn removed_at(
        &self,
        member: &Address,
        season: SeasonId,
    ) -> Result<Option<DateTime<Utc>>, RegistryError> {
        let state = self.state.read().map_err(|_| RegistryError::LockPoisoned)?;
        Ok(state.seasons.get(&season).and_then(|dir| dir.removed_at(member)))
    }

    fn ensure_authorized(&self, caller: &Address) -> Result<(), RegistryError> {
        if self.authority.is_authorized(caller) {
            Ok(())
        } else {
            warn!(caller = %caller, "Unauthorized registry mutation rejected");
            Err(RegistryError::Unauthorized(*caller))
        }
    }

    fn mint_all(&self, pending: &[Address], season: SeasonId) -> Result<(), RegistryError> {
        for (minted, member) in pending.iter().enumerate() {
            if let Err(err) = self.ledger.mint_one(member, season) {
                warn!(
                    member = %member,
                    season = season.0,
                    error = %err,
                    rollback = minted,
                    "Credential mint failed, rolling back batch"
                );
                for done in pending[..minted].iter().rev() {
                    if let Err(burn_err) = self.ledger.burn_one(done, season) {
                        error!(
                            member = %done,
                            season = season.0,
                            error = %burn_err,
                            "Rollback burn failed"
                        );
                    }
                }
                return Err(err.into());
            }
        }
        Ok(())
    }
}

impl CredentialIssuer for SeasonalRegistry {
    fn issue(
        &self,
        ctx: &CallContext,
        members: &[Address],
        season: SeasonId,
    ) -> Result<Vec<Address>, RegistryError> {
        SeasonalRegistry::issue(self, ctx, members, season)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryCredentialLedger;
    use roster_types::FailureKind;

    /// Fixed set of authorized addresses standing in for the authority gate.
    struct StaticAuthority(HashSet<Address>);

    impl Authorizer for StaticAuthority {
        fn is_authorized(&self, addr: &Address) -> bool {
            self.0.contains(addr)
        }
    }

    const ADMIN: Address = Address::repeat_byte(0xaa);

    fn addr(seed: u8) -> Address {
        Address::repeat_byte(seed)
    }

    fn admin() -> CallContext {
        CallContext::now(ADMIN)
    }

    fn setup() -> (SeasonalRegistry, Arc<InMemoryCredentialLedger>) {
        let ledger = Arc::new(InMemoryCredentialLedger::new());
        let authority = Arc::new(StaticAuthority(HashSet::from([ADMIN])));
        let registry = SeasonalRegistry::new(authority, ledger.clone(), SeasonId(1));
        (registry, ledger)
    }

    #[test]
    fn issue_is_idempotent_per_member() {
        let (registry, ledger) = setup();

        let first = registry.issue(&admin(), &[addr(1)], SeasonId(1)).unwrap();
        let second = registry.issue(&admin(), &[addr(1)], SeasonId(1)).unwrap();

        assert_eq!(first, vec![addr(1)]);
        assert!(second.is_empty());
        assert_eq!(ledger.balance_of(&addr(1), SeasonId(1)).unwrap(), 1);
        assert_eq!(registry.members_of(SeasonId(1)).unwrap(), vec![addr(1)]);
    }

    #[test]
    fn duplicates_within_one_batch_issue_once() {
        let (registry, ledger) = setup();
        let issued = registry
            .issue(&admin(), &[addr(1), addr(2), addr(1)], SeasonId(1))
            .unwrap();
        assert_eq!(issued, vec![addr(1), addr(2)]);
        assert_eq!(ledger.total_supply(SeasonId(1)).unwrap(), 2);
        assert_eq!(registry.member_count(SeasonId(1)).unwrap(), 2);
    }

    #[test]
    fn partial_batch_skips_existing_and_issues_the_rest() {
        let (registry, _) = setup();
        registry.issue(&admin(), &[addr(1)], SeasonId(1)).unwrap();
        let issued = registry
            .issue(&admin(), &[addr(1), addr(2)], SeasonId(1))
            .unwrap();
        assert_eq!(issued, vec![addr(2)]);
        assert!(registry.is_member(&addr(2), SeasonId(1)).unwrap());
    }

    #[test]
    fn issue_for_other_season_is_rejected_without_changes() {
        let (registry, ledger) = setup();
        let err = registry.issue(&admin(), &[addr(1)], SeasonId(2)).unwrap_err();

        assert_eq!(err.kind(), FailureKind::WrongSeason);
        assert!(!registry.is_member(&addr(1), SeasonId(2)).unwrap());
        assert_eq!(ledger.balance_of(&addr(1), SeasonId(2)).unwrap(), 0);
        assert_eq!(registry.seasons().unwrap(), vec![SeasonId(1)]);
    }

    #[test]
    fn season_directory_is_created_on_first_issue() {
        let (registry, _) = setup();
        registry.set_current_season(&admin(), SeasonId(5)).unwrap();
        assert_eq!(registry.seasons().unwrap(), vec![SeasonId(1)]);
        assert!(registry.members_of(SeasonId(5)).unwrap().is_empty());

        registry.issue(&admin(), &[addr(3)], SeasonId(5)).unwrap();
        assert_eq!(registry.seasons().unwrap(), vec![SeasonId(1), SeasonId(5)]);
        assert_eq!(registry.member_by_index(SeasonId(5), 0).unwrap(), addr(3));
        assert_eq!(registry.member_by_index(SeasonId(5), 1).unwrap(), Address::ZERO);
    }

    #[test]
    fn failed_mint_rolls_back_the_whole_batch() {
        let (registry, ledger) = setup();
        let err = registry
            .issue(&admin(), &[addr(1), Address::ZERO, addr(2)], SeasonId(1))
            .unwrap_err();

        assert!(matches!(err, RegistryError::Ledger(_)));
        assert_eq!(ledger.balance_of(&addr(1), SeasonId(1)).unwrap(), 0);
        assert_eq!(ledger.total_supply(SeasonId(1)).unwrap(), 0);
        assert_eq!(registry.member_count(SeasonId(1)).unwrap(), 0);
    }

    #[test]
    fn revoke_burns_and_removes() {
        let (registry, ledger) = setup();
        registry
            .issue(&admin(), &[addr(1), addr(2)], SeasonId(1))
            .unwrap();

        registry.revoke(&admin(), &addr(1), SeasonId(1)).unwrap();

        assert!(!registry.is_member(&addr(1), SeasonId(1)).unwrap());
        assert_eq!(ledger.balance_of(&addr(1), SeasonId(1)).unwrap(), 0);
        assert_eq!(registry.members_of(SeasonId(1)).unwrap(), vec![addr(2)]);
        assert!(registry.removed_at(&addr(1), SeasonId(1)).unwrap().is_some());
        assert!(registry.joined_at(&addr(1), SeasonId(1)).unwrap().is_some());
    }

    #[test]
    fn revoke_from_past_season_is_allowed() {
        let (registry, _) = setup();
        registry.issue(&admin(), &[addr(1)], SeasonId(1)).unwrap();
        registry.set_current_season(&admin(), SeasonId(2)).unwrap();

        registry.revoke(&admin(), &addr(1), SeasonId(1)).unwrap();
        assert_eq!(registry.member_count(SeasonId(1)).unwrap(), 0);
    }

    #[test]
    fn revoke_failure_categories() {
        let (registry, _) = setup();

        let err = registry.revoke(&admin(), &addr(1), SeasonId(1)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotASeasonMember);

        let err = registry.revoke(&admin(), &addr(1), SeasonId(9)).unwrap_err();
        assert_eq!(
            err,
            RegistryError::NotASeasonMember {
                member: addr(1),
                season: SeasonId(9)
            }
        );

        registry.issue(&admin(), &[addr(2)], SeasonId(1)).unwrap();
        let err = registry.revoke(&admin(), &addr(1), SeasonId(1)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotASeasonMember);
    }

    #[test]
    fn member_can_rejoin_after_revocation() {
        let (registry, ledger) = setup();
        registry.issue(&admin(), &[addr(1)], SeasonId(1)).unwrap();
        registry.revoke(&admin(), &addr(1), SeasonId(1)).unwrap();
        registry.issue(&admin(), &[addr(1)], SeasonId(1)).unwrap();

        assert!(registry.is_member(&addr(1), SeasonId(1)).unwrap());
        assert_eq!(ledger.balance_of(&addr(1), SeasonId(1)).unwrap(), 1);
    }

    #[test]
    fn privileged_operations_require_authority() {
        let (registry, _) = setup();
        let outsider = CallContext::now(addr(9));

        let err = registry.set_current_season(&outsider, SeasonId(2)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Unauthorized);
        assert_eq!(registry.current_season().unwrap(), SeasonId(1));

        let err = registry.issue(&outsider, &[addr(9)], SeasonId(1)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Unauthorized);

        registry.issue(&admin(), &[addr(1)], SeasonId(1)).unwrap();
        let err = registry.revoke(&outsider, &addr(1), SeasonId(1)).unwrap_err();
        assert_eq!(err.kind(), FailureKind::Unauthorized);
        assert!(registry.is_member(&addr(1), SeasonId(1)).unwrap());
    }

    #[test]
    fn registry_is_usable_as_issuer_capability() {
        let (registry, _) = setup();
        let issuer: Arc<dyn CredentialIssuer> = Arc::new(registry);
        let issued = issuer.issue(&admin(), &[addr(4)], SeasonId(1)).unwrap();
        assert_eq!(issued, vec![addr(4)]);
    }
}
