//! Key capabilities supplied per container instance
//!
//! Containers never assume an ordering or hash for their keys: callers pass
//! a comparator / hasher / equality at construction. Closures work directly;
//! `NaturalOrder`, `StdHash` and `StdEq` opt into the std traits.

use core::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Total order over keys; `Equal` is the only notion of key identity
pub trait Comparator<K: ?Sized> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

impl<K: ?Sized, F> Comparator<K> for F
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        self(a, b)
    }
}

/// Raw hash of a key; the hash table remaps it away from its sentinels
pub trait KeyHash<K: ?Sized> {
    fn hash(&self, key: &K) -> u64;
}

impl<K: ?Sized, F> KeyHash<K> for F
where
    F: Fn(&K) -> u64,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self(key)
    }
}

/// Key equality; must agree with the paired `KeyHash`
pub trait KeyEq<K: ?Sized> {
    fn equal(&self, a: &K, b: &K) -> bool;
}

impl<K: ?Sized, F> KeyEq<K> for F
where
    F: Fn(&K, &K) -> bool,
{
    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        self(a, b)
    }
}

/// Order by `Ord`
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

impl<K: Ord + ?Sized> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Hash with `DefaultHasher`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdHash;

impl<K: Hash + ?Sized> KeyHash<K> for StdHash {
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        let mut hasher = DefaultHasher::new();
        Hash::hash(key, &mut hasher);
        hasher.finish()
    }
}

/// Compare with `Eq`
#[derive(Debug, Clone, Copy, Default)]
pub struct StdEq;

impl<K: Eq + ?Sized> KeyEq<K> for StdEq {
    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}
