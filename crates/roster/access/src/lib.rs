//! Roster Access - the public enrollment gate.
//!
//! An [`AccessGate`] owns numbered allow-lists. Authority holders curate the
//! lists, price them and open or close them; anyone listed on an open list
//! may enroll themselves into the current season by paying the exact fee.
//! Issuance itself is delegated to whatever [`roster_registry::CredentialIssuer`]
//! the gate currently references, under the gate's own address.

#![deny(unsafe_code)]

pub mod error;
pub mod gate;
pub mod list;
pub mod settlement;

pub use error::AccessError;
pub use gate::{AccessGate, Enrollment, EnrollmentPolicy};
pub use list::AccessList;
pub use settlement::{InMemorySettlement, PaymentSettlement};
