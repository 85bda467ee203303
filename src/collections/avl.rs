//! AVL tree primitives over allocator-owned nodes
//!
//! Nodes are allocated through a `RawAllocator` and linked with raw
//! pointers. Each node has exactly one owner (its parent's link or the
//! map's root), so the structure is a strict tree.
//!
//! Invariant after every public operation, for every node:
//! `height = 1 + max(height(left), height(right))` and
//! `height(left) - height(right)` in `{-1, 0, 1}`.

use crate::allocator::RawAllocator;
use crate::collections::Comparator;
use crate::AllocError;
use core::cmp::Ordering;
use core::marker::PhantomData;
use core::ptr::NonNull;

pub(crate) type Link<K, V> = Option<NonNull<Node<K, V>>>;

pub(crate) struct Node<K, V> {
    pub left: Link<K, V>,
    pub right: Link<K, V>,
    pub key: K,
    pub value: V,
    pub height: i32,
}

#[inline]
pub(crate) fn height<K, V>(link: Link<K, V>) -> i32 {
    link.map_or(0, |node| unsafe { (*node.as_ptr()).height })
}

#[inline]
fn balance_factor<K, V>(link: Link<K, V>) -> i32 {
    match link {
        Some(node) => unsafe { height((*node.as_ptr()).left) - height((*node.as_ptr()).right) },
        None => 0,
    }
}

#[inline]
unsafe fn update_height<K, V>(node: NonNull<Node<K, V>>) {
    let n = node.as_ptr();
    (*n).height = 1 + height((*n).left).max(height((*n).right));
}

/// Right child becomes the subtree root
unsafe fn rotate_left<K, V>(link: &mut Link<K, V>) {
    let Some(root) = *link else { return };
    let Some(pivot) = (*root.as_ptr()).right else { return };

    (*root.as_ptr()).right = (*pivot.as_ptr()).left;
    (*pivot.as_ptr()).left = Some(root);

    update_height(root);
    update_height(pivot);
    *link = Some(pivot);
}

/// Left child becomes the subtree root
unsafe fn rotate_right<K, V>(link: &mut Link<K, V>) {
    let Some(root) = *link else { return };
    let Some(pivot) = (*root.as_ptr()).left else { return };

    (*root.as_ptr()).left = (*pivot.as_ptr()).right;
    (*pivot.as_ptr()).right = Some(root);

    update_height(root);
    update_height(pivot);
    *link = Some(pivot);
}

/// Restore `|bf| <= 1` at `link` after one of its subtrees changed height by one
unsafe fn rebalance<K, V>(link: &mut Link<K, V>) {
    let Some(node) = *link else { return };
    update_height(node);

    let n = node.as_ptr();
    let bf = balance_factor(*link);

    if bf > 1 {
        // Left-right case: straighten the left child first
        if balance_factor((*n).left) < 0 {
            rotate_left(&mut (*n).left);
        }
        rotate_right(link);
    } else if bf < -1 {
        // Right-left case
        if balance_factor((*n).right) > 0 {
            rotate_right(&mut (*n).right);
        }
        rotate_left(link);
    }
}

unsafe fn new_node<K, V, A>(alloc: &A, key: K, value: V) -> Result<NonNull<Node<K, V>>, AllocError>
where
    A: RawAllocator + ?Sized,
{
    let node = alloc
        .allocate(core::mem::size_of::<Node<K, V>>(), core::mem::align_of::<Node<K, V>>())?
        .cast::<Node<K, V>>();

    node.as_ptr().write(Node {
        left: None,
        right: None,
        key,
        value,
        height: 1,
    });

    Ok(node)
}

/// Move the pair out of a detached node and give its memory back
unsafe fn free_node<K, V, A>(alloc: &A, node: NonNull<Node<K, V>>) -> (K, V)
where
    A: RawAllocator + ?Sized,
{
    let Node { key, value, .. } = node.as_ptr().read();
    let freed = alloc.free_one(node.cast());
    debug_assert!(freed.is_ok(), "node not owned by its allocator");
    (key, value)
}

pub(crate) fn find<K, V, C>(mut link: Link<K, V>, key: &K, cmp: &C) -> Option<NonNull<Node<K, V>>>
where
    C: Comparator<K> + ?Sized,
{
    while let Some(node) = link {
        let n = node.as_ptr();
        link = match cmp.compare(key, unsafe { &(*n).key }) {
            Ordering::Less => unsafe { (*n).left },
            Ordering::Greater => unsafe { (*n).right },
            Ordering::Equal => return Some(node),
        };
    }
    None
}

/// Leftmost (`min`) or rightmost node under `link`
pub(crate) fn extreme<K, V>(mut link: Link<K, V>, min: bool) -> Link<K, V> {
    let mut last = None;
    while let Some(node) = link {
        last = Some(node);
        link = unsafe {
            if min {
                (*node.as_ptr()).left
            } else {
                (*node.as_ptr()).right
            }
        };
    }
    last
}

/// Insert or replace; returns the previous pair when the key existed
///
/// On allocation failure the tree is unchanged.
pub(crate) unsafe fn insert<K, V, C, A>(
    link: &mut Link<K, V>,
    key: K,
    value: V,
    cmp: &C,
    alloc: &A,
) -> Result<Option<(K, V)>, AllocError>
where
    C: Comparator<K> + ?Sized,
    A: RawAllocator + ?Sized,
{
    let Some(node) = *link else {
        *link = Some(new_node(alloc, key, value)?);
        return Ok(None);
    };

    let n = node.as_ptr();
    let replaced = match cmp.compare(&key, &(*n).key) {
        Ordering::Equal => {
            let old_key = core::mem::replace(&mut (*n).key, key);
            let old_value = core::mem::replace(&mut (*n).value, value);
            return Ok(Some((old_key, old_value)));
        }
        Ordering::Less => insert(&mut (*n).left, key, value, cmp, alloc)?,
        Ordering::Greater => insert(&mut (*n).right, key, value, cmp, alloc)?,
    };

    rebalance(link);
    Ok(replaced)
}

/// Detach the minimum node under `link`, rebalancing the path back up
unsafe fn take_min<K, V>(link: &mut Link<K, V>) -> Link<K, V> {
    let node = (*link)?;
    let n = node.as_ptr();

    if (*n).left.is_some() {
        let min = take_min(&mut (*n).left);
        rebalance(link);
        min
    } else {
        *link = (*n).right;
        Some(node)
    }
}

/// Remove `key`, returning its pair
///
/// A node with two children takes over its in-order successor's pair and
/// the successor's node is released instead.
pub(crate) unsafe fn remove<K, V, C, A>(
    link: &mut Link<K, V>,
    key: &K,
    cmp: &C,
    alloc: &A,
) -> Option<(K, V)>
where
    C: Comparator<K> + ?Sized,
    A: RawAllocator + ?Sized,
{
    let node = (*link)?;
    let n = node.as_ptr();

    let removed = match cmp.compare(key, &(*n).key) {
        Ordering::Less => remove(&mut (*n).left, key, cmp, alloc)?,
        Ordering::Greater => remove(&mut (*n).right, key, cmp, alloc)?,
        Ordering::Equal => match ((*n).left, (*n).right) {
            (None, child) | (child, None) => {
                *link = child;
                return Some(free_node(alloc, node));
            }
            (Some(_), Some(_)) => {
                let successor = take_min(&mut (*n).right)?;
                let (succ_key, succ_value) = free_node(alloc, successor);
                (
                    core::mem::replace(&mut (*n).key, succ_key),
                    core::mem::replace(&mut (*n).value, succ_value),
                )
            }
        },
    };

    rebalance(link);
    Some(removed)
}

/// Drop every pair and release every node under `link`
pub(crate) unsafe fn free_tree<K, V, A>(link: Link<K, V>, alloc: &A)
where
    A: RawAllocator + ?Sized,
{
    if let Some(node) = link {
        free_tree((*node.as_ptr()).left, alloc);
        free_tree((*node.as_ptr()).right, alloc);
        drop(free_node(alloc, node));
    }
}

/// In-order borrowing iterator
pub struct Iter<'m, K, V> {
    stack: Vec<NonNull<Node<K, V>>>,
    remaining: usize,
    _marker: PhantomData<&'m Node<K, V>>,
}

impl<'m, K, V> Iter<'m, K, V> {
    pub(crate) fn new(root: Link<K, V>, len: usize) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: len,
            _marker: PhantomData,
        };
        iter.push_left(root);
        iter
    }

    fn push_left(&mut self, mut link: Link<K, V>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = unsafe { (*node.as_ptr()).left };
        }
    }
}

impl<'m, K, V> Iterator for Iter<'m, K, V> {
    type Item = (&'m K, &'m V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let n = node.as_ptr();
        unsafe {
            self.push_left((*n).right);
            self.remaining -= 1;
            Some((&(*n).key, &(*n).value))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

/// Check heights, balance and ordering; returns the tree height
#[cfg(test)]
pub(crate) fn validate<K, V, C>(link: Link<K, V>, cmp: &C) -> Result<i32, String>
where
    C: Comparator<K> + ?Sized,
    K: core::fmt::Debug,
{
    let Some(node) = link else { return Ok(0) };
    let n = unsafe { &*node.as_ptr() };

    for (child, expected) in [(n.left, Ordering::Less), (n.right, Ordering::Greater)] {
        if let Some(c) = child {
            let child_key = unsafe { &(*c.as_ptr()).key };
            if cmp.compare(child_key, &n.key) != expected {
                return Err(format!("{:?} misplaced under {:?}", child_key, n.key));
            }
        }
    }

    let lh = validate(n.left, cmp)?;
    let rh = validate(n.right, cmp)?;

    if (lh - rh).abs() > 1 {
        return Err(format!("unbalanced at {:?}: {} vs {}", n.key, lh, rh));
    }
    if n.height != 1 + lh.max(rh) {
        return Err(format!("stale height at {:?}", n.key));
    }
    Ok(n.height)
}
