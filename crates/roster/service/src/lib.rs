//! Roster Service - the configured roster.
//!
//! [`RosterService`] wires the authority gate, the seasonal registry and the
//! access gate together from a [`RosterConfig`], forwards every public
//! operation, and appends each successful mutation to a hash-chained
//! [`AuditJournal`]. Scripts of [`Operation`]s can be replayed against it,
//! which is what the `roster` CLI does.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod journal;
pub mod script;
pub mod service;

pub use config::{AccessConfig, AuthorityConfig, RegistryConfig, RosterConfig};
pub use error::{ConfigError, RosterError};
pub use journal::{AuditJournal, JournalEntry, JournalError, RosterEvent};
pub use script::{Operation, OperationOutcome, ReplayReport, Script, Step, StepReport};
pub use service::RosterService;

pub use roster_access::{EnrollmentPolicy, InMemorySettlement, PaymentSettlement};
pub use roster_registry::{CredentialLedger, InMemoryCredentialLedger};
pub use roster_types::{Address, Amount, CallContext, FailureKind, ListId, SeasonId};
