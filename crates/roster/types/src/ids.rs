//! Numbered identifiers for seasons and access lists.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment amount in the settlement facility's smallest unit.
pub type Amount = u64;

/// Identifier of a membership season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonId(pub u64);

impl SeasonId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SeasonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "season:{}", self.0)
    }
}

/// Identifier of an access list. Allocated sequentially starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(pub u64);

impl ListId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "list:{}", self.0)
    }
}
