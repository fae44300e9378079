use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Who is calling, and when.
///
/// The surrounding environment authenticates the caller before an operation
/// begins; roster components trust `caller` as given. `at` is the timestamp
/// recorded for every membership transition made by the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub at: DateTime<Utc>,
}

impl CallContext {
    /// Context stamped with the wall clock.
    pub fn now(caller: Address) -> Self {
        Self {
            caller,
            at: Utc::now(),
        }
    }

    pub fn at(caller: Address, at: DateTime<Utc>) -> Self {
        Self { caller, at }
    }

    /// Same timestamp, different caller. Used when a component forwards a
    /// request under its own identity.
    pub fn on_behalf_of(&self, caller: Address) -> Self {
        Self { caller, at: self.at }
    }
}
