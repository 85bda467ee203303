//! Ordered map - self-balancing AVL tree on a borrowed allocator
//!
//! Design:
//! - Nodes come from the allocator the map borrows; the map never touches
//!   the global allocator for its own storage
//! - Ordering is a per-instance `Comparator`; keys the comparator calls
//!   `Equal` are the same key
//! - Depth stays O(log n) after every `put` and `delete`
//!
//! Dropping the map drops all keys and values and frees its nodes. Under a
//! region allocator node frees are no-ops; memory returns on region reset.

use super::avl::{self, Link, Node};
use super::{Comparator, NaturalOrder};
use crate::allocator::{Allocator, RawAllocator};
use crate::AllocError;
use core::fmt;
use core::marker::PhantomData;

pub use super::avl::Iter;

pub struct OrderedMap<'a, K, V, C = NaturalOrder, A = Allocator>
where
    A: RawAllocator + ?Sized,
{
    root: Link<K, V>,
    len: usize,
    cmp: C,
    alloc: &'a A,
    _marker: PhantomData<Box<Node<K, V>>>,
}

impl<'a, K: Ord, V, A: RawAllocator + ?Sized> OrderedMap<'a, K, V, NaturalOrder, A> {
    /// Empty map ordered by `Ord`
    pub fn new(alloc: &'a A) -> Self {
        Self::with_comparator(alloc, NaturalOrder)
    }
}

impl<'a, K, V, C, A> OrderedMap<'a, K, V, C, A>
where
    C: Comparator<K>,
    A: RawAllocator + ?Sized,
{
    /// Empty map ordered by `cmp`
    pub fn with_comparator(alloc: &'a A, cmp: C) -> Self {
        Self {
            root: None,
            len: 0,
            cmp,
            alloc,
            _marker: PhantomData,
        }
    }

    /// Insert or replace
    ///
    /// Returns the previous key and value when an equal key was present.
    /// The only failure is the allocator running out of room for a new
    /// node, in which case the map is unchanged.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<(K, V)>, AllocError> {
        let replaced = unsafe { avl::insert(&mut self.root, key, value, &self.cmp, self.alloc)? };
        if replaced.is_none() {
            self.len += 1;
        }
        Ok(replaced)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        avl::find(self.root, key, &self.cmp).map(|node| unsafe { &(*node.as_ptr()).value })
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        avl::find(self.root, key, &self.cmp).map(|node| unsafe { &mut (*node.as_ptr()).value })
    }

    /// Value for `key`, or `fallback` when absent
    pub fn try_get<'r>(&'r self, key: &K, fallback: &'r V) -> &'r V {
        self.get(key).unwrap_or(fallback)
    }

    #[inline]
    pub fn has(&self, key: &K) -> bool {
        avl::find(self.root, key, &self.cmp).is_some()
    }

    /// Remove `key`, returning its pair; absent keys leave the map untouched
    pub fn delete(&mut self, key: &K) -> Option<(K, V)> {
        let removed = unsafe { avl::remove(&mut self.root, key, &self.cmp, self.alloc) };
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    /// Smallest entry by the comparator
    pub fn first(&self) -> Option<(&K, &V)> {
        avl::extreme(self.root, true).map(|node| unsafe { (&(*node.as_ptr()).key, &(*node.as_ptr()).value) })
    }

    /// Largest entry by the comparator
    pub fn last(&self) -> Option<(&K, &V)> {
        avl::extreme(self.root, false).map(|node| unsafe { (&(*node.as_ptr()).key, &(*node.as_ptr()).value) })
    }

    /// Remove every entry, keeping the map usable
    pub fn clear(&mut self) {
        unsafe { avl::free_tree(self.root.take(), self.alloc) };
        self.len = 0;
    }

    #[cfg(test)]
    pub(crate) fn validate(&self) -> Result<i32, String>
    where
        K: fmt::Debug,
    {
        avl::validate(self.root, &self.cmp)
    }
}

impl<'a, K, V, C, A> OrderedMap<'a, K, V, C, A>
where
    A: RawAllocator + ?Sized,
{
    /// Number of entries
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree (0 when empty)
    #[inline]
    pub fn height(&self) -> usize {
        avl::height(self.root) as usize
    }

    /// Entries in ascending key order
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root, self.len)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Snapshot of all entries in ascending key order
    pub fn to_sorted_sequence(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }

    /// The allocator backing this map
    #[inline]
    pub fn allocator(&self) -> &'a A {
        self.alloc
    }

    /// Drop all entries and free all nodes (same as dropping)
    pub fn destroy(self) {
        drop(self);
    }
}

impl<'a, K, V, C, A> Drop for OrderedMap<'a, K, V, C, A>
where
    A: RawAllocator + ?Sized,
{
    fn drop(&mut self) {
        unsafe { avl::free_tree(self.root.take(), self.alloc) };
    }
}

impl<'m, 'a, K, V, C, A> IntoIterator for &'m OrderedMap<'a, K, V, C, A>
where
    A: RawAllocator + ?Sized,
{
    type Item = (&'m K, &'m V);
    type IntoIter = Iter<'m, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, C, A> fmt::Debug for OrderedMap<'a, K, V, C, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: RawAllocator + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
