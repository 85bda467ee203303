//! Pointer table - open-addressing set of live allocation addresses
//!
//! Slot values double as state: `0` empty, `1` tombstone, anything else a
//! live address (payloads are 16-aligned, so never 0 or 1).
//!
//! `occupied` counts non-empty slots (live + tombstones) and drives growth;
//! tombstones are only compacted away by a resize.

use crate::logging;

pub const MIN_CAPACITY: usize = 16;
pub const MAX_LOAD_FACTOR: f64 = 0.7;

const EMPTY: usize = 0;
const TOMBSTONE: usize = 1;

#[derive(Debug, Default)]
pub struct PtrTable {
    slots: Vec<usize>,
    occupied: usize,
    live: usize,
}

impl PtrTable {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            occupied: 0,
            live: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live + tombstoned slots
    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Live addresses only
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn load_factor(&self) -> f64 {
        if self.slots.is_empty() {
            return 1.0;
        }
        self.occupied as f64 / self.slots.len() as f64
    }

    /// Home slot; capacity is always a power of two
    #[inline]
    fn home(&self, addr: usize) -> usize {
        let h = (addr >> 4).wrapping_mul(0x9E37_79B9_7F4A_7C15_u64 as usize);
        (h ^ (h >> 29)) & (self.slots.len() - 1)
    }

    #[inline]
    fn next(&self, i: usize) -> usize {
        (i + 1) & (self.slots.len() - 1)
    }

    /// Track a new address, growing first if the load factor is reached
    pub fn insert(&mut self, addr: usize) {
        debug_assert!(addr > TOMBSTONE, "address collides with a sentinel");

        if self.load_factor() >= MAX_LOAD_FACTOR {
            let new_capacity = MIN_CAPACITY.max(self.capacity() * 2);
            self.resize(new_capacity);
        }

        self.insert_no_check(addr);
    }

    /// First empty-or-tombstone slot on the search path
    ///
    /// The allocator never hands out a live address twice, so the address
    /// cannot already be present further along the chain.
    fn insert_no_check(&mut self, addr: usize) {
        let mut i = self.home(addr);

        while self.slots[i] > TOMBSTONE {
            i = self.next(i);
        }

        if self.slots[i] == EMPTY {
            self.occupied += 1;
        }

        self.slots[i] = addr;
        self.live += 1;
    }

    fn find(&self, addr: usize) -> Option<usize> {
        if self.slots.is_empty() || addr <= TOMBSTONE {
            return None;
        }

        let mut i = self.home(addr);
        for _ in 0..self.slots.len() {
            match self.slots[i] {
                EMPTY => return None,
                slot if slot == addr => return Some(i),
                _ => i = self.next(i),
            }
        }

        None
    }

    #[inline]
    pub fn contains(&self, addr: usize) -> bool {
        self.find(addr).is_some()
    }

    /// Tombstone `addr`; false if it was not tracked
    pub fn remove(&mut self, addr: usize) -> bool {
        match self.find(addr) {
            Some(i) => {
                self.slots[i] = TOMBSTONE;
                self.live -= 1;
                true
            }
            None => false,
        }
    }

    fn resize(&mut self, new_capacity: usize) {
        debug_assert!(new_capacity.is_power_of_two());

        let old = core::mem::replace(&mut self.slots, vec![EMPTY; new_capacity]);
        self.occupied = 0;
        self.live = 0;

        for addr in old.iter().copied().filter(|&slot| slot > TOMBSTONE) {
            self.insert_no_check(addr);
        }

        logging::log_pointer_table_grow(old.len(), new_capacity);
    }

    /// Every live address, in slot order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.slots.iter().copied().filter(|&slot| slot > TOMBSTONE)
    }

    /// Forget every address, keeping the slot storage
    pub fn clear(&mut self) {
        self.slots.fill(EMPTY);
        self.occupied = 0;
        self.live = 0;
    }

    /// Forget every address and free the slot storage
    pub fn release_storage(&mut self) {
        self.slots = Vec::new();
        self.occupied = 0;
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: usize) -> usize {
        0x1000 + n * 16
    }

    #[test]
    fn starts_without_storage() {
        let table = PtrTable::new();
        assert_eq!(table.capacity(), 0);
        assert!(!table.contains(addr(0)));
    }

    #[test]
    fn first_insert_allocates_minimum_capacity() {
        let mut table = PtrTable::new();
        table.insert(addr(0));
        assert_eq!(table.capacity(), MIN_CAPACITY);
        assert_eq!(table.occupied(), 1);
        assert!(table.contains(addr(0)));
    }

    #[test]
    fn grows_geometrically_past_load_factor() {
        let mut table = PtrTable::new();
        for n in 0..12 {
            table.insert(addr(n));
        }
        // 12th insert saw 11/16 < 0.7, 13th sees 12/16 >= 0.7
        assert_eq!(table.capacity(), 16);
        table.insert(addr(12));
        assert_eq!(table.capacity(), 32);

        for n in 0..13 {
            assert!(table.contains(addr(n)), "lost {}", n);
        }
    }

    #[test]
    fn remove_leaves_tombstone_counted_as_occupied() {
        let mut table = PtrTable::new();
        table.insert(addr(1));
        table.insert(addr(2));

        assert!(table.remove(addr(1)));
        assert!(!table.remove(addr(1)));
        assert_eq!(table.len(), 1);
        assert_eq!(table.occupied(), 2);
        assert!(table.contains(addr(2)));
    }

    #[test]
    fn tombstone_reused_without_bumping_occupied() {
        let mut table = PtrTable::new();
        table.insert(addr(1));
        table.remove(addr(1));
        table.insert(addr(1));
        assert_eq!(table.occupied(), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn search_survives_tombstones_in_chain() {
        let mut table = PtrTable::new();
        for n in 0..10 {
            table.insert(addr(n));
        }
        for n in (0..10).step_by(2) {
            table.remove(addr(n));
        }
        for n in (1..10).step_by(2) {
            assert!(table.contains(addr(n)));
        }
        assert_eq!(table.iter().count(), 5);
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut table = PtrTable::new();
        for n in 0..20 {
            table.insert(addr(n));
        }
        let capacity = table.capacity();
        table.clear();
        assert_eq!(table.occupied(), 0);
        assert_eq!(table.capacity(), capacity);
        assert_eq!(table.iter().count(), 0);

        table.release_storage();
        assert_eq!(table.capacity(), 0);
    }
}
