//! Roster Directory - the enumerable address set every roster component is
//! built on.
//!
//! A directory answers three questions in constant time: is this address a
//! member, how many members are there, and who sits at position `i`. Removal
//! is a swap-remove, so positions are stable only until the next removal.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use roster_types::{Address, FailureKind};
use std::collections::HashMap;
use thiserror::Error;

/// Set of addresses with positional enumeration.
///
/// `index_to_member` and `member_to_index` form a bijection between
/// `[0, len)` and the active members. Join and removal timestamps outlive the
/// membership they describe.
#[derive(Debug, Clone, Default)]
pub struct EnumerableDirectory {
    index_to_member: Vec<Address>,
    member_to_index: HashMap<Address, usize>,
    joined_at: HashMap<Address, DateTime<Utc>>,
    removed_at: HashMap<Address, DateTime<Utc>>,
}

impl EnumerableDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from an initial member set, all joining at `at`.
    pub fn with_members(
        members: impl IntoIterator<Item = Address>,
        at: DateTime<Utc>,
    ) -> Result<Self, DirectoryError> {
        let mut directory = Self::new();
        for member in members {
            directory.add(member, at)?;
        }
        Ok(directory)
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.member_to_index
            .get(addr)
            .is_some_and(|&i| self.index_to_member.get(i) == Some(addr))
    }

    /// Number of active members.
    pub fn len(&self) -> usize {
        self.index_to_member.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index_to_member.is_empty()
    }

    /// Append `addr` at index `len()` and return that index.
    pub fn add(&mut self, addr: Address, at: DateTime<Utc>) -> Result<usize, DirectoryError> {
        if self.contains(&addr) {
            return Err(DirectoryError::AlreadyPresent(addr));
        }

        let index = self.index_to_member.len();
        self.index_to_member.push(addr);
        self.member_to_index.insert(addr, index);
        self.joined_at.insert(addr, at);
        Ok(index)
    }

    /// Swap-remove `addr`: the last member moves into the vacated slot.
    pub fn remove(&mut self, addr: &Address, at: DateTime<Utc>) -> Result<(), DirectoryError> {
        let index = match self.member_to_index.get(addr) {
            Some(&i) if self.index_to_member.get(i) == Some(addr) => i,
            _ => return Err(DirectoryError::NotPresent(*addr)),
        };

        self.member_to_index.remove(addr);
        self.index_to_member.swap_remove(index);
        if let Some(&moved) = self.index_to_member.get(index) {
            self.member_to_index.insert(moved, index);
        }
        self.removed_at.insert(*addr, at);
        Ok(())
    }

    /// Address at position `index`, or [`Address::ZERO`] past the end.
    pub fn by_index(&self, index: usize) -> Address {
        self.index_to_member
            .get(index)
            .copied()
            .unwrap_or(Address::ZERO)
    }

    pub fn index_of(&self, addr: &Address) -> Option<usize> {
        self.member_to_index
            .get(addr)
            .copied()
            .filter(|&i| self.index_to_member.get(i) == Some(addr))
    }

    /// All members in index order. After any removal this is not join order.
    pub fn enumerate(&self) -> Vec<Address> {
        self.index_to_member.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.index_to_member.iter()
    }

    /// Last time `addr` joined, kept after it leaves.
    pub fn joined_at(&self, addr: &Address) -> Option<DateTime<Utc>> {
        self.joined_at.get(addr).copied()
    }

    /// Last time `addr` left.
    pub fn removed_at(&self, addr: &Address) -> Option<DateTime<Utc>> {
        self.removed_at.get(addr).copied()
    }
}

/// Directory mutation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("address already present: {0}")]
    AlreadyPresent(Address),

    #[error("address not present: {0}")]
    NotPresent(Address),
}

impl DirectoryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DirectoryError::AlreadyPresent(_) => FailureKind::AlreadyPresent,
            DirectoryError::NotPresent(_) => FailureKind::NotPresent,
        }
    }
}
