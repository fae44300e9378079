use std::collections::HashSet;

use roster_types::{Address, Amount};

/// One numbered allow-list.
///
/// `entries` is append-only. Removal overwrites every occurrence of the
/// address with the zero address (a tombstone) instead of compacting, so
/// historical positions stay put. `listed` is the authoritative membership
/// test and always equals the set of non-tombstoned entries. The zero
/// address can be appended but is indistinguishable from a tombstone and is
/// never listed.
#[derive(Debug, Clone, Default)]
pub struct AccessList {
    open: bool,
    fee: Amount,
    entries: Vec<Address>,
    listed: HashSet<Address>,
}

impl AccessList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, addrs: &[Address]) {
        self.entries.extend_from_slice(addrs);
        self.listed
            .extend(addrs.iter().copied().filter(|a| !a.is_zero()));
    }

    /// Tombstone every occurrence of `addr`. Returns how many slots changed.
    pub fn tombstone(&mut self, addr: &Address) -> usize {
        if addr.is_zero() {
            return 0;
        }

        let mut cleared = 0;
        for slot in self.entries.iter_mut().filter(|slot| **slot == *addr) {
            *slot = Address::ZERO;
            cleared += 1;
        }
        self.listed.remove(addr);
        cleared
    }

    pub fn is_listed(&self, addr: &Address) -> bool {
        self.listed.contains(addr)
    }

    /// Number of slots ever appended, tombstones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw entries in append order, tombstones included.
    pub fn entries(&self) -> &[Address] {
        &self.entries
    }

    /// Distinct listed addresses.
    pub fn listed_count(&self) -> usize {
        self.listed.len()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn fee(&self) -> Amount {
        self.fee
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    pub fn set_fee(&mut self, fee: Amount) {
        self.fee = fee;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn addr(seed: u8) -> Address {
        Address::repeat_byte(seed)
    }

    fn assert_listed_matches_entries(list: &AccessList) {
        let live: HashSet<Address> = list
            .entries()
            .iter()
            .copied()
            .filter(|a| !a.is_zero())
            .collect();
        assert_eq!(live, list.listed);
    }

    #[test]
    fn tombstone_clears_every_occurrence() {
        let mut list = AccessList::new();
        list.append(&[addr(1), addr(2)]);
        list.append(&[addr(1)]);

        let cleared = list.tombstone(&addr(1));

        assert_eq!(cleared, 2);
        assert!(!list.is_listed(&addr(1)));
        assert!(list.is_listed(&addr(2)));
        assert_eq!(list.entries(), &[Address::ZERO, addr(2), Address::ZERO]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn readd_after_removal_is_listed_again() {
        let mut list = AccessList::new();
        list.append(&[addr(1)]);
        list.tombstone(&addr(1));
        list.append(&[addr(1)]);
        assert!(list.is_listed(&addr(1)));

        list.tombstone(&addr(1));
        assert!(!list.is_listed(&addr(1)));
        assert_listed_matches_entries(&list);
    }

    #[test]
    fn zero_address_is_never_listed() {
        let mut list = AccessList::new();
        list.append(&[Address::ZERO, addr(3)]);
        assert!(!list.is_listed(&Address::ZERO));
        assert_eq!(list.listed_count(), 1);
        assert_eq!(list.tombstone(&Address::ZERO), 0);
        assert_listed_matches_entries(&list);
    }

    #[derive(Debug, Clone)]
    enum ListOp {
        Append(Vec<u8>),
        Tombstone(u8),
    }

    fn op_strategy() -> impl Strategy<Value = Vec<ListOp>> {
        proptest::collection::vec(
            prop_oneof![
                proptest::collection::vec(0u8..8, 1..4).prop_map(ListOp::Append),
                (0u8..8).prop_map(ListOp::Tombstone),
            ],
            0..40,
        )
    }

    proptest! {
        #[test]
        fn property_listed_equals_live_entries(ops in op_strategy()) {
            let mut list = AccessList::new();
            let mut appended = 0usize;
            for op in ops {
                match op {
                    ListOp::Append(seeds) => {
                        let addrs: Vec<Address> = seeds.into_iter().map(addr).collect();
                        appended += addrs.len();
                        list.append(&addrs);
                    }
                    ListOp::Tombstone(seed) => {
                        list.tombstone(&addr(seed));
                    }
                }
                prop_assert_eq!(list.len(), appended);
                assert_listed_matches_entries(&list);
            }
        }
    }
}
