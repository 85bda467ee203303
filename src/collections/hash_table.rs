//! Hash table - open addressing with linear probing on a borrowed allocator
//!
//! Design:
//! - Three parallel arrays (keys, values, hashes) allocated through the
//!   allocator the table borrows
//! - The stored hash doubles as slot state: `0` empty, `1` tombstone,
//!   anything else live. Raw hashes are remapped so they never collide with
//!   those markers
//! - Capacity is zero or a power of two, so the home slot is a mask
//! - The table grows (×2, at least 16) before an insert that would start at
//!   load factor 0.7 or more, where load counts live slots and tombstones

use super::{KeyEq, KeyHash, StdEq, StdHash};
use crate::allocator::{Allocator, RawAllocator};
use crate::logging;
use crate::AllocError;
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ptr::NonNull;
use std::hash::Hash;

/// Smallest non-zero capacity
pub const MIN_CAPACITY: usize = 16;

/// Occupied/capacity ratio that triggers a resize
pub const MAX_LOAD_FACTOR: f64 = 0.7;

const EMPTY: u64 = 0;
const TOMBSTONE: u64 = 1;

/// Map a caller hash into the live range `>= 2`
#[inline]
pub(crate) fn remap_hash(raw: u64) -> u64 {
    if raw < 2 {
        return 2;
    }
    raw.wrapping_mul(11).max(2)
}

/// Slot storage; knows nothing about which slots are live
struct Slots<K, V> {
    keys: NonNull<K>,
    values: NonNull<V>,
    hashes: NonNull<u64>,
    capacity: usize,
}

impl<K, V> Slots<K, V> {
    const fn empty() -> Self {
        Self {
            keys: NonNull::dangling(),
            values: NonNull::dangling(),
            hashes: NonNull::dangling(),
            capacity: 0,
        }
    }

    fn allocate<A: RawAllocator + ?Sized>(alloc: &A, capacity: usize) -> Result<Self, AllocError> {
        if capacity == 0 {
            return Ok(Self::empty());
        }

        let keys = array_layout::<K>(capacity)?;
        let values = array_layout::<V>(capacity)?;
        let hashes = array_layout::<u64>(capacity)?;

        let keys_ptr = alloc.allocate(keys.size(), keys.align())?;

        // Arrays freed on the error paths were never exposed
        let values_ptr = match alloc.allocate(values.size(), values.align()) {
            Ok(ptr) => ptr,
            Err(err) => {
                unsafe { release(alloc, keys_ptr) };
                return Err(err);
            }
        };

        // Zeroed so every slot starts out EMPTY
        let hashes_ptr = match alloc.allocate_zeroed(hashes.size(), hashes.align()) {
            Ok(ptr) => ptr,
            Err(err) => {
                unsafe {
                    release(alloc, values_ptr);
                    release(alloc, keys_ptr);
                }
                return Err(err);
            }
        };

        Ok(Self {
            keys: keys_ptr.cast(),
            values: values_ptr.cast(),
            hashes: hashes_ptr.cast(),
            capacity,
        })
    }

    /// Give the arrays back
    ///
    /// # Safety
    ///
    /// Live contents must already be moved out or dropped, no borrow into
    /// the arrays may remain, and `alloc` must be the allocator they came from.
    unsafe fn free<A: RawAllocator + ?Sized>(self, alloc: &A) {
        if self.capacity == 0 {
            return;
        }
        release(alloc, self.keys.cast());
        release(alloc, self.values.cast());
        release(alloc, self.hashes.cast());
    }

    #[inline]
    fn hash(&self, i: usize) -> u64 {
        debug_assert!(i < self.capacity);
        unsafe { *self.hashes.as_ptr().add(i) }
    }

    #[inline]
    fn set_hash(&mut self, i: usize, hash: u64) {
        debug_assert!(i < self.capacity);
        unsafe { *self.hashes.as_ptr().add(i) = hash };
    }

    #[inline]
    fn is_live(&self, i: usize) -> bool {
        self.hash(i) > TOMBSTONE
    }

    /// Caller guarantees slot `i` is live
    #[inline]
    unsafe fn key(&self, i: usize) -> &K {
        &*self.keys.as_ptr().add(i)
    }

    #[inline]
    unsafe fn value(&self, i: usize) -> &V {
        &*self.values.as_ptr().add(i)
    }

    #[inline]
    unsafe fn value_mut(&mut self, i: usize) -> &mut V {
        &mut *self.values.as_ptr().add(i)
    }

    #[inline]
    unsafe fn key_mut(&mut self, i: usize) -> &mut K {
        &mut *self.keys.as_ptr().add(i)
    }

    /// Fill a non-live slot
    #[inline]
    unsafe fn write(&mut self, i: usize, key: K, value: V, hash: u64) {
        self.keys.as_ptr().add(i).write(key);
        self.values.as_ptr().add(i).write(value);
        self.set_hash(i, hash);
    }

    /// Move a live slot's pair out without touching its state byte
    #[inline]
    unsafe fn take(&mut self, i: usize) -> (K, V) {
        (
            self.keys.as_ptr().add(i).read(),
            self.values.as_ptr().add(i).read(),
        )
    }

    #[inline]
    fn home(&self, hash: u64) -> usize {
        (hash as usize) & (self.capacity - 1)
    }

    #[inline]
    fn next(&self, i: usize) -> usize {
        (i + 1) & (self.capacity - 1)
    }
}

/// Free one slot array; a foreign array only shows up in debug builds
unsafe fn release<A: RawAllocator + ?Sized>(alloc: &A, ptr: NonNull<u8>) {
    let freed = alloc.free_one(ptr);
    debug_assert!(freed.is_ok(), "slot array not owned by its allocator");
}

fn array_layout<T>(capacity: usize) -> Result<Layout, AllocError> {
    Layout::array::<T>(capacity).map_err(|_| AllocError::InvalidLayout {
        size: capacity.saturating_mul(core::mem::size_of::<T>()),
        align: core::mem::align_of::<T>(),
    })
}

pub struct HashTable<'a, K, V, H = StdHash, E = StdEq, A = Allocator>
where
    A: RawAllocator + ?Sized,
{
    slots: Slots<K, V>,
    /// Live slots plus tombstones
    occupied: usize,
    /// Live slots
    len: usize,
    hasher: H,
    eq: E,
    alloc: &'a A,
    _marker: PhantomData<(K, V)>,
}

impl<'a, K, V, A> HashTable<'a, K, V, StdHash, StdEq, A>
where
    K: Hash + Eq,
    A: RawAllocator + ?Sized,
{
    /// Empty table with zero capacity; nothing is allocated until the first put
    pub fn new(alloc: &'a A) -> Self {
        Self::with_hasher(alloc, StdHash, StdEq)
    }

    /// Table with room for `capacity` slots (rounded up to a power of two)
    pub fn new_with_capacity(alloc: &'a A, capacity: usize) -> Result<Self, AllocError> {
        Self::with_capacity_and_hasher(alloc, capacity, StdHash, StdEq)
    }
}

impl<'a, K, V, H, E, A> HashTable<'a, K, V, H, E, A>
where
    H: KeyHash<K>,
    E: KeyEq<K>,
    A: RawAllocator + ?Sized,
{
    pub fn with_hasher(alloc: &'a A, hasher: H, eq: E) -> Self {
        Self {
            slots: Slots::empty(),
            occupied: 0,
            len: 0,
            hasher,
            eq,
            alloc,
            _marker: PhantomData,
        }
    }

    pub fn with_capacity_and_hasher(
        alloc: &'a A,
        capacity: usize,
        hasher: H,
        eq: E,
    ) -> Result<Self, AllocError> {
        let mut table = Self::with_hasher(alloc, hasher, eq);
        if capacity > 0 {
            let capacity = capacity.checked_next_power_of_two().ok_or(AllocError::InvalidLayout {
                size: capacity,
                align: core::mem::align_of::<K>(),
            })?;
            table.slots = Slots::allocate(alloc, capacity)?;
        }
        Ok(table)
    }

    #[inline]
    fn slot_hash(&self, key: &K) -> u64 {
        remap_hash(self.hasher.hash(key))
    }

    /// Occupied/capacity; 1.0 for a table with no slots
    #[inline]
    pub fn load_factor(&self) -> f64 {
        if self.slots.capacity == 0 {
            1.0
        } else {
            self.occupied as f64 / self.slots.capacity as f64
        }
    }

    /// Slot index holding `key`
    fn find(&self, key: &K) -> Option<usize> {
        if self.slots.capacity == 0 {
            return None;
        }

        let hash = self.slot_hash(key);
        let mut i = self.slots.home(hash);

        for _ in 0..self.slots.capacity {
            match self.slots.hash(i) {
                EMPTY => return None,
                h if h == hash && self.eq.equal(unsafe { self.slots.key(i) }, key) => return Some(i),
                _ => i = self.slots.next(i),
            }
        }
        None
    }

    /// Insert or replace
    ///
    /// Returns the previous key and value when an equal key was present.
    /// Fails only if growing the slot arrays fails; the table is then
    /// unchanged.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<(K, V)>, AllocError> {
        if self.load_factor() >= MAX_LOAD_FACTOR {
            let grown = (self.slots.capacity * 2).max(MIN_CAPACITY);
            self.resize(grown)?;
        }

        let hash = self.slot_hash(&key);
        Ok(self.put_no_resize(key, value, hash))
    }

    /// Insert assuming at least one empty slot exists
    ///
    /// New keys land in the first tombstone on the search path if there was
    /// one, otherwise in the empty slot that ended the search.
    fn put_no_resize(&mut self, key: K, value: V, hash: u64) -> Option<(K, V)> {
        let mut i = self.slots.home(hash);
        let mut first_tombstone = None;

        for _ in 0..self.slots.capacity {
            match self.slots.hash(i) {
                EMPTY => break,
                TOMBSTONE => {
                    first_tombstone.get_or_insert(i);
                }
                h if h == hash && self.eq.equal(unsafe { self.slots.key(i) }, &key) => unsafe {
                    let old_key = core::mem::replace(self.slots.key_mut(i), key);
                    let old_value = core::mem::replace(self.slots.value_mut(i), value);
                    return Some((old_key, old_value));
                },
                _ => {}
            }
            i = self.slots.next(i);
        }

        let target = match first_tombstone {
            Some(slot) => slot,
            None => {
                debug_assert_eq!(self.slots.hash(i), EMPTY, "search ran out of empty slots");
                self.occupied += 1;
                i
            }
        };

        unsafe { self.slots.write(target, key, value, hash) };
        self.len += 1;
        None
    }

    /// Rebuild into `new_capacity` slots, dropping all tombstones
    ///
    /// `new_capacity` is rounded up to a power of two and never below the
    /// live count.
    pub fn resize(&mut self, new_capacity: usize) -> Result<(), AllocError> {
        let new_capacity = new_capacity.max(self.len + 1).checked_next_power_of_two().ok_or(
            AllocError::InvalidLayout {
                size: new_capacity,
                align: core::mem::align_of::<K>(),
            },
        )?;

        let _timer = logging::perf::track("hash_table_resize");
        let fresh = Slots::allocate(self.alloc, new_capacity)?;
        let mut old = core::mem::replace(&mut self.slots, fresh);
        let old_capacity = old.capacity;

        self.occupied = 0;
        self.len = 0;

        for i in 0..old.capacity {
            let hash = old.hash(i);
            if hash > TOMBSTONE {
                let (key, value) = unsafe { old.take(i) };
                let displaced = self.put_no_resize(key, value, hash);
                debug_assert!(displaced.is_none(), "duplicate key during resize");
            }
        }

        // Every live pair was moved into the fresh arrays
        unsafe { old.free(self.alloc) };
        logging::log_hash_table_resize(old_capacity, new_capacity, self.len);
        Ok(())
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|i| unsafe { self.slots.value(i) })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let i = self.find(key)?;
        Some(unsafe { self.slots.value_mut(i) })
    }

    /// Stored key and value for `key`
    pub fn get_key_value(&self, key: &K) -> Option<(&K, &V)> {
        self.find(key).map(|i| unsafe { (self.slots.key(i), self.slots.value(i)) })
    }

    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Remove `key`, leaving a tombstone in its slot
    ///
    /// The occupied count is unchanged; only a resize reclaims tombstones.
    pub fn delete(&mut self, key: &K) -> Option<(K, V)> {
        let i = self.find(key)?;
        let pair = unsafe { self.slots.take(i) };
        self.slots.set_hash(i, TOMBSTONE);
        self.len -= 1;
        Some(pair)
    }
}

impl<'a, K, V, H, E, A> HashTable<'a, K, V, H, E, A>
where
    A: RawAllocator + ?Sized,
{
    /// Live entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity
    }

    /// Live slots plus tombstones
    #[inline]
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Live entries in slot order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            slots: &self.slots,
            index: 0,
            remaining: self.len,
        }
    }

    /// Snapshot of all live entries in slot order
    pub fn to_array(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }

    #[inline]
    pub fn allocator(&self) -> &'a A {
        self.alloc
    }

    /// Drop all entries and free the slot arrays (same as dropping)
    pub fn destroy(self) {
        drop(self);
    }

    fn drop_entries(&mut self) {
        if !core::mem::needs_drop::<K>() && !core::mem::needs_drop::<V>() {
            return;
        }
        for i in 0..self.slots.capacity {
            if self.slots.is_live(i) {
                drop(unsafe { self.slots.take(i) });
                self.slots.set_hash(i, TOMBSTONE);
            }
        }
    }
}

impl<'a, K, V, H, E, A> Drop for HashTable<'a, K, V, H, E, A>
where
    A: RawAllocator + ?Sized,
{
    fn drop(&mut self) {
        self.drop_entries();
        let slots = core::mem::replace(&mut self.slots, Slots::empty());
        unsafe { slots.free(self.alloc) };
    }
}

/// Borrowing iterator over live slots
pub struct Iter<'t, K, V> {
    slots: &'t Slots<K, V>,
    index: usize,
    remaining: usize,
}

impl<'t, K, V> Iterator for Iter<'t, K, V> {
    type Item = (&'t K, &'t V);

    fn next(&mut self) -> Option<Self::Item> {
        while self.index < self.slots.capacity {
            let i = self.index;
            self.index += 1;
            if self.slots.is_live(i) {
                self.remaining -= 1;
                return Some(unsafe { (self.slots.key(i), self.slots.value(i)) });
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<'t, 'a, K, V, H, E, A> IntoIterator for &'t HashTable<'a, K, V, H, E, A>
where
    A: RawAllocator + ?Sized,
{
    type Item = (&'t K, &'t V);
    type IntoIter = Iter<'t, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, H, E, A> fmt::Debug for HashTable<'a, K, V, H, E, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: RawAllocator + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
