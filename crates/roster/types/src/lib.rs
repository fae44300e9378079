//! Roster Types - shared vocabulary for the membership roster
//!
//! Every roster crate speaks in these types: 20-byte [`Address`]es, numbered
//! [`SeasonId`]s and [`ListId`]s, the [`CallContext`] the environment hands
//! each operation, and the [`FailureKind`] categories that callers use to tell
//! "already done" from "not allowed" from "malformed input".

#![deny(unsafe_code)]

pub mod address;
pub mod context;
pub mod failure;
pub mod ids;

pub use address::{Address, AddressParseError};
pub use context::CallContext;
pub use failure::FailureKind;
pub use ids::{Amount, ListId, SeasonId};
