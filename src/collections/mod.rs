//! Containers built on the allocator facade
//!
//! Design: Both containers borrow a `RawAllocator` for their whole life
//! and take every byte of storage from it:
//! 1. `OrderedMap` - AVL tree, sorted iteration, O(log n) everything
//! 2. `HashTable` - open addressing, linear probing, tombstone deletes
//! 3. `OrderedSet` - the AVL map with unit values
//!
//! Key behavior (ordering, hashing, equality) is passed per instance.

mod avl;
mod compare;
mod hash_table;
mod map;
mod set;


pub use compare::{Comparator, KeyEq, KeyHash, NaturalOrder, StdEq, StdHash};
pub use hash_table::{HashTable, Iter as HashTableIter, MAX_LOAD_FACTOR, MIN_CAPACITY};
pub use map::{Iter as OrderedMapIter, OrderedMap};
pub use set::{Iter as OrderedSetIter, OrderedSet};
