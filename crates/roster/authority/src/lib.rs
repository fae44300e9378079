//! Roster Authority - who may change the roster.
//!
//! The [`AuthorityGate`] keeps the authority holders in an
//! [`EnumerableDirectory`] and never lets the last one go. Other components
//! do not depend on the gate itself but on the [`Authorizer`] capability, so
//! any conforming implementation (including a test stub) can stand in.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use roster_directory::{DirectoryError, EnumerableDirectory};
use roster_types::{Address, CallContext, FailureKind};
use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, warn};

/// Capability: answers whether an address may perform privileged operations.
pub trait Authorizer: Send + Sync {
    fn is_authorized(&self, addr: &Address) -> bool;
}

/// Directory of authority holders with a floor of one.
pub struct AuthorityGate {
    holders: RwLock<EnumerableDirectory>,
}

impl AuthorityGate {
    /// Create the gate with its genesis holders. At least one is required.
    pub fn new(
        genesis: impl IntoIterator<Item = Address>,
        at: DateTime<Utc>,
    ) -> Result<Self, AuthorityError> {
        let holders = EnumerableDirectory::with_members(genesis, at)?;
        if holders.is_empty() {
            return Err(AuthorityError::EmptyGenesis);
        }

        info!(holders = holders.len(), "Authority gate initialized");
        Ok(Self {
            holders: RwLock::new(holders),
        })
    }

    /// Fails closed if the holder lock is poisoned.
    pub fn is_authorized(&self, caller: &Address) -> bool {
        self.holders
            .read()
            .map(|holders| holders.contains(caller))
            .unwrap_or(false)
    }

    /// Add a new authority holder. Re-granting an existing holder fails with
    /// `AlreadyPresent`.
    pub fn grant(&self, ctx: &CallContext, addr: Address) -> Result<(), AuthorityError> {
        let mut holders = self
            .holders
            .write()
            .map_err(|_| AuthorityError::LockPoisoned)?;
        ensure_holder(&holders, &ctx.caller)?;

        holders.add(addr, ctx.at)?;
        info!(caller = %ctx.caller, holder = %addr, count = holders.len(), "Authority granted");
        Ok(())
    }

    /// Remove an authority holder, provided another one remains.
    pub fn revoke(&self, ctx: &CallContext, addr: &Address) -> Result<(), AuthorityError> {
        let mut holders = self
            .holders
            .write()
            .map_err(|_| AuthorityError::LockPoisoned)?;
        ensure_holder(&holders, &ctx.caller)?;

        if holders.len() < 2 {
            warn!(caller = %ctx.caller, holder = %addr, "Refusing to remove last authority holder");
            return Err(AuthorityError::CannotRemoveLastAuthority);
        }

        holders.remove(addr, ctx.at)?;
        info!(caller = %ctx.caller, holder = %addr, count = holders.len(), "Authority revoked");
        Ok(())
    }

    pub fn count(&self) -> Result<usize, AuthorityError> {
        let holders = self
            .holders
            .read()
            .map_err(|_| AuthorityError::LockPoisoned)?;
        Ok(holders.len())
    }

    pub fn holders(&self) -> Result<Vec<Address>, AuthorityError> {
        let holders = self
            .holders
            .read()
            .map_err(|_| AuthorityError::LockPoisoned)?;
        Ok(holders.enumerate())
    }

    /// When `addr` last became a holder, if ever.
    pub fn granted_at(&self, addr: &Address) -> Result<Option<DateTime<Utc>>, AuthorityError> {
        let holders = self
            .holders
            .read()
            .map_err(|_| AuthorityError::LockPoisoned)?;
        Ok(holders.joined_at(addr))
    }
}

impl Authorizer for AuthorityGate {
    fn is_authorized(&self, addr: &Address) -> bool {
        AuthorityGate::is_authorized(self, addr)
    }
}

/// Authority holders plus a fixed set of delegate identities.
///
/// Delegates are components acting on their own address (the access gate
/// issuing on a caller's behalf). They pass `is_authorized` but are not
/// holders: they cannot be revoked and do not count towards the floor.
pub struct DelegatedAuthorizer {
    holders: Arc<dyn Authorizer>,
    delegates: BTreeSet<Address>,
}

impl DelegatedAuthorizer {
    pub fn new(holders: Arc<dyn Authorizer>, delegates: impl IntoIterator<Item = Address>) -> Self {
        Self {
            holders,
            delegates: delegates.into_iter().collect(),
        }
    }

    pub fn delegates(&self) -> impl Iterator<Item = &Address> {
        self.delegates.iter()
    }
}

impl Authorizer for DelegatedAuthorizer {
    fn is_authorized(&self, addr: &Address) -> bool {
        self.delegates.contains(addr) || self.holders.is_authorized(addr)
    }
}

fn ensure_holder(holders: &EnumerableDirectory, caller: &Address) -> Result<(), AuthorityError> {
    if holders.contains(caller) {
        Ok(())
    } else {
        warn!(caller = %caller, "Unauthorized authority change rejected");
        Err(AuthorityError::Unauthorized(*caller))
    }
}

/// Authority gate errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    #[error("caller is not an authority holder: {0}")]
    Unauthorized(Address),

    #[error("cannot remove the last authority holder")]
    CannotRemoveLastAuthority,

    #[error("at least one genesis authority holder is required")]
    EmptyGenesis,

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error("Lock error")]
    LockPoisoned,
}

impl AuthorityError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthorityError::Unauthorized(_) => FailureKind::Unauthorized,
            AuthorityError::CannotRemoveLastAuthority => FailureKind::CannotRemoveLastAuthority,
            AuthorityError::Directory(e) => e.kind(),
            AuthorityError::EmptyGenesis | AuthorityError::LockPoisoned => FailureKind::Internal,
        }
    }
}
