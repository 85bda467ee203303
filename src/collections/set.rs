//! Ordered set - an `OrderedMap` with unit values
//!
//! Same allocator borrowing, comparator and balancing as the map. Adding
//! an element equal to one already present swaps it in and hands the old
//! element back.

use super::map::{Iter as MapIter, OrderedMap};
use super::{Comparator, NaturalOrder};
use crate::allocator::{Allocator, RawAllocator};
use crate::AllocError;
use core::fmt;

pub struct OrderedSet<'a, K, C = NaturalOrder, A = Allocator>
where
    A: RawAllocator + ?Sized,
{
    map: OrderedMap<'a, K, (), C, A>,
}

impl<'a, K: Ord, A: RawAllocator + ?Sized> OrderedSet<'a, K, NaturalOrder, A> {
    /// Empty set ordered by `Ord`
    pub fn new(alloc: &'a A) -> Self {
        Self::with_comparator(alloc, NaturalOrder)
    }
}

impl<'a, K, C, A> OrderedSet<'a, K, C, A>
where
    C: Comparator<K>,
    A: RawAllocator + ?Sized,
{
    pub fn with_comparator(alloc: &'a A, cmp: C) -> Self {
        Self {
            map: OrderedMap::with_comparator(alloc, cmp),
        }
    }

    /// Insert `element`; returns the displaced equal element, if any
    pub fn add(&mut self, element: K) -> Result<Option<K>, AllocError> {
        Ok(self.map.put(element, ())?.map(|(old, ())| old))
    }

    #[inline]
    pub fn has(&self, element: &K) -> bool {
        self.map.has(element)
    }

    /// Remove and return the stored element equal to `element`
    pub fn remove(&mut self, element: &K) -> Option<K> {
        self.map.delete(element).map(|(old, ())| old)
    }

    pub fn first(&self) -> Option<&K> {
        self.map.first().map(|(k, _)| k)
    }

    pub fn last(&self) -> Option<&K> {
        self.map.last().map(|(k, _)| k)
    }
}

impl<'a, K, C, A> OrderedSet<'a, K, C, A>
where
    A: RawAllocator + ?Sized,
{
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Elements in ascending order
    pub fn iter(&self) -> Iter<'_, K> {
        Iter {
            inner: self.map.iter(),
        }
    }

    /// Drop all elements and free all nodes (same as dropping)
    pub fn destroy(self) {
        drop(self);
    }
}

/// In-order borrowing iterator over set elements
pub struct Iter<'s, K> {
    inner: MapIter<'s, K, ()>,
}

impl<'s, K> Iterator for Iter<'s, K> {
    type Item = &'s K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for Iter<'_, K> {}

impl<'s, 'a, K, C, A> IntoIterator for &'s OrderedSet<'a, K, C, A>
where
    A: RawAllocator + ?Sized,
{
    type Item = &'s K;
    type IntoIter = Iter<'s, K>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, C, A> fmt::Debug for OrderedSet<'a, K, C, A>
where
    K: fmt::Debug,
    A: RawAllocator + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
