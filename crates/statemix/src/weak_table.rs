#![forbid(unsafe_code)]

//! Identity-keyed side table with weak keys.
//!
//! Associates a value with an `Rc<K>` allocation without storing anything in
//! `K` and without keeping `K` alive.
//!
//! # Design
//!
//! Entries are keyed by the allocation address and remember a [`Weak`] to
//! their owner. The `Weak` pins the allocation (not the value), so an address
//! cannot be reused by another `Rc<K>` while its entry exists: distinct live
//! owners never collide.
//!
//! Entries of dropped owners are removed either explicitly
//! ([`remove_addr`](WeakTable::remove_addr), typically from the owner's
//! `Drop`) or lazily by [`purge`](WeakTable::purge).
//!
//! Removal methods hand the value back instead of dropping it in place. Drop
//! it after releasing any borrow of the table: the value may own other
//! instances whose `Drop` touches the same table.

use std::collections::hash_map::Entry as MapEntry;
use std::rc::{Rc, Weak};

use ahash::AHashMap;

struct Entry<K, V> {
    owner: Weak<K>,
    value: V,
}

pub struct WeakTable<K, V> {
    entries: AHashMap<usize, Entry<K, V>>,
}

impl<K, V> Default for WeakTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> WeakTable<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: AHashMap::new(),
        }
    }

    /// Address used as the key for `owner`.
    #[must_use]
    pub fn addr_of(owner: &Rc<K>) -> usize {
        Rc::as_ptr(owner) as usize
    }

    /// Number of entries, including any whose owner is gone but not yet
    /// purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value for a live `owner`.
    #[must_use]
    pub fn get(&self, owner: &Rc<K>) -> Option<&V> {
        self.entries
            .get(&Self::addr_of(owner))
            .filter(|entry| Self::owns(entry, owner))
            .map(|entry| &entry.value)
    }

    /// Value for `owner`, inserting `init()` on first access.
    pub fn get_or_insert_with(&mut self, owner: &Rc<K>, init: impl FnOnce() -> V) -> &V {
        match self.entries.entry(Self::addr_of(owner)) {
            MapEntry::Occupied(slot) => {
                debug_assert!(Self::owns(slot.get(), owner), "stale entry at live address");
                &slot.into_mut().value
            }
            MapEntry::Vacant(slot) => {
                &slot
                    .insert(Entry {
                        owner: Rc::downgrade(owner),
                        value: init(),
                    })
                    .value
            }
        }
    }

    /// Remove by address. Works after the owner's strong count reached zero,
    /// which is what a `Drop` impl on `K` sees.
    pub fn remove_addr(&mut self, addr: usize) -> Option<V> {
        self.entries.remove(&addr).map(|entry| entry.value)
    }

    /// Remove every entry whose owner has been dropped.
    #[must_use = "drop purged values after releasing the table"]
    pub fn purge(&mut self) -> Vec<V> {
        let dead: Vec<usize> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.owner.strong_count() == 0)
            .map(|(addr, _)| *addr)
            .collect();
        dead.into_iter()
            .filter_map(|addr| self.remove_addr(addr))
            .collect()
    }

    fn owns(entry: &Entry<K, V>, owner: &Rc<K>) -> bool {
        entry.owner.strong_count() > 0 && std::ptr::eq(entry.owner.as_ptr(), Rc::as_ptr(owner))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
