//! Roster Registry - season membership.
//!
//! This crate provides:
//! - the [`CredentialLedger`] boundary to the external credential ledger, plus
//!   an in-memory implementation for tests and local use
//! - the [`SeasonalRegistry`], one member directory per season, kept in step
//!   with the ledger (a season member holds exactly one credential unit)
//! - the [`CredentialIssuer`] capability other components use to request
//!   issuance without owning the registry

#![deny(unsafe_code)]

pub mod error;
pub mod ledger;
pub mod registry;

pub use error::{LedgerError, RegistryError};
pub use ledger::{CredentialLedger, InMemoryCredentialLedger};
pub use registry::{CredentialIssuer, SeasonalRegistry};
