//! Array-backed red-black tree
//!
//! Nodes live in parallel arrays instead of individual heap allocations:
//!
//! - `values[slot]` - the stored payload (`None` for a vacant slot)
//! - `links[slot]` - parent index and two child indices
//! - `black` - one color bit per slot, set means black
//! - `generations[slot]` - reuse counter checked by [`NodeIndex`]
//!
//! Every "pointer" is a `u32` slot number, with `NIL` standing in for null.
//! Rebalancing walks up through `links[slot].parent` exactly as a pointer based
//! tree would.
//!
//! # Example
//!
//! ```
//! use helium_reflect::rbtree::{IdentityKey, RbTree};
//!
//! let mut tree: RbTree<u32, IdentityKey> = RbTree::new();
//! let (index, inserted) = tree.insert(7);
//! assert!(inserted);
//! assert_eq!(tree.insert(7), (index, false));
//! assert_eq!(tree.get(index), Some(&7));
//! assert!(tree.verify());
//! ```

mod index;
mod sorted;

use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;

pub(crate) use index::NIL;
pub use index::{Compare, FnCompare, IdentityKey, KeyPolicy, NodeIndex, OrdCompare, PairKey};
pub use sorted::{SortedMap, SortedSet};

const LEFT: usize = 0;
const RIGHT: usize = 1;

/// Parent and child slots of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Link {
    parent: u32,
    children: [u32; 2],
}

impl Link {
    const DETACHED: Self = Self {
        parent: NIL,
        children: [NIL, NIL],
    };
}

/// One color bit per slot
#[derive(Debug, Clone, Default)]
struct ColorBits {
    words: Vec<u32>,
}

impl ColorBits {
    #[inline]
    fn get(&self, slot: u32) -> bool {
        let word = (slot / 32) as usize;
        self.words
            .get(word)
            .map(|w| w & (1 << (slot % 32)) != 0)
            .unwrap_or(false)
    }

    #[inline]
    fn set(&mut self, slot: u32, black: bool) {
        let word = (slot / 32) as usize;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        if black {
            self.words[word] |= 1 << (slot % 32);
        } else {
            self.words[word] &= !(1 << (slot % 32));
        }
    }

    fn truncate(&mut self, slots: usize) {
        self.words.truncate(slots.div_ceil(32));
        self.words.shrink_to_fit();
    }
}

/// A red-black tree stored in parallel arrays
///
/// `P` extracts the ordering key from each value and `C` compares keys.
pub struct RbTree<T, P, C = OrdCompare> {
    values: Vec<Option<T>>,
    links: Vec<Link>,
    black: ColorBits,
    generations: Vec<u32>,
    free: Vec<u32>,
    root: u32,
    len: usize,
    /// Generation given to freshly pushed slots, raised by `trim`
    base_generation: u32,
    compare: C,
    _policy: PhantomData<fn() -> P>,
}

impl<T, P, C: Default> RbTree<T, P, C> {
    /// Create an empty tree with the default comparator
    pub fn new() -> Self {
        Self::with_compare(C::default())
    }
}

impl<T, P, C: Default> Default for RbTree<T, P, C> {
    fn default() -> Self {
        Self::new()
    }
}

// Structural operations: everything that only follows links.
impl<T, P, C> RbTree<T, P, C> {
    /// Create an empty tree ordered by `compare`
    pub fn with_compare(compare: C) -> Self {
        Self {
            values: Vec::new(),
            links: Vec::new(),
            black: ColorBits::default(),
            generations: Vec::new(),
            free: Vec::new(),
            root: NIL,
            len: 0,
            base_generation: 0,
            compare,
            _policy: PhantomData,
        }
    }

    /// Number of stored values
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of allocated slots, live or vacant
    pub fn capacity_slots(&self) -> usize {
        self.values.len()
    }

    /// Index of the root node, if any
    pub fn root(&self) -> Option<NodeIndex> {
        (self.root != NIL).then(|| self.index_of(self.root))
    }

    /// Resolve an index to its value, failing for stale indices
    pub fn get(&self, index: NodeIndex) -> Option<&T> {
        self.live_slot(index).map(|slot| self.value(slot))
    }

    /// Mutable access to a value
    ///
    /// Callers must not change the value's key.
    pub(crate) fn get_mut(&mut self, index: NodeIndex) -> Option<&mut T> {
        let slot = self.live_slot(index)?;
        self.values[slot as usize].as_mut()
    }

    /// Whether `index` still refers to a live node
    pub fn contains_index(&self, index: NodeIndex) -> bool {
        self.live_slot(index).is_some()
    }

    /// Smallest element (in-order begin)
    pub fn first(&self) -> Option<NodeIndex> {
        (self.root != NIL).then(|| self.index_of(self.minimum(self.root)))
    }

    /// Largest element (in-order end)
    pub fn last(&self) -> Option<NodeIndex> {
        (self.root != NIL).then(|| self.index_of(self.maximum(self.root)))
    }

    /// In-order successor
    pub fn next(&self, index: NodeIndex) -> Option<NodeIndex> {
        let slot = self.live_slot(index)?;
        let next = self.successor(slot);
        (next != NIL).then(|| self.index_of(next))
    }

    /// In-order predecessor
    pub fn prev(&self, index: NodeIndex) -> Option<NodeIndex> {
        let slot = self.live_slot(index)?;
        let prev = self.predecessor(slot);
        (prev != NIL).then(|| self.index_of(prev))
    }

    /// In-order iterator over the values
    pub fn iter(&self) -> Iter<'_, T, P, C> {
        let (front, back) = if self.root == NIL {
            (NIL, NIL)
        } else {
            (self.minimum(self.root), self.maximum(self.root))
        };
        Iter {
            tree: self,
            front,
            back,
            remaining: self.len,
        }
    }

    /// Remove the node at `index`, returning its value
    ///
    /// Returns `None` if the index is stale.
    pub fn remove_at(&mut self, index: NodeIndex) -> Option<T> {
        let slot = self.live_slot(index)?;
        Some(self.remove_slot(slot))
    }

    /// Remove every value
    ///
    /// All outstanding indices are invalidated; the slots stay allocated for reuse.
    pub fn clear(&mut self) {
        for slot in 0..self.values.len() {
            if self.values[slot].take().is_some() {
                self.generations[slot] = self.generations[slot].wrapping_add(1);
            }
            self.links[slot] = Link::DETACHED;
        }
        self.free.clear();
        self.free.extend((0..self.values.len() as u32).rev());
        self.root = NIL;
        self.len = 0;
    }

    /// Reserve room for `additional` more values
    pub fn reserve(&mut self, additional: usize) {
        let needed = additional.saturating_sub(self.free.len());
        self.values.reserve(needed);
        self.links.reserve(needed);
        self.generations.reserve(needed);
    }

    /// Release trailing vacant slots and shrink the backing arrays
    ///
    /// Live nodes never move, so indices to live nodes stay valid. Indices to
    /// removed nodes stay invalid because recreated slots start above every
    /// generation that was released.
    pub fn trim(&mut self) {
        while let Some(None) = self.values.last() {
            self.values.pop();
            self.links.pop();
            if let Some(generation) = self.generations.pop() {
                self.base_generation = self.base_generation.max(generation.wrapping_add(1));
            }
        }
        let slots = self.values.len() as u32;
        self.free.retain(|&slot| slot < slots);

        self.values.shrink_to_fit();
        self.links.shrink_to_fit();
        self.generations.shrink_to_fit();
        self.free.shrink_to_fit();
        self.black.truncate(self.values.len());
    }

    /// Apply `f` to every value in order
    ///
    /// `f` must not change the ordering key.
    pub(crate) fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        if self.root == NIL {
            return;
        }
        let mut slot = self.minimum(self.root);
        while slot != NIL {
            let next = self.successor(slot);
            if let Some(value) = self.values[slot as usize].as_mut() {
                f(value);
            }
            slot = next;
        }
    }

    // --- slot helpers -----------------------------------------------------

    #[inline]
    fn index_of(&self, slot: u32) -> NodeIndex {
        NodeIndex::new(slot, self.generations[slot as usize])
    }

    #[inline]
    fn live_slot(&self, index: NodeIndex) -> Option<u32> {
        let slot = index.slot();
        let i = slot as usize;
        (i < self.values.len()
            && self.generations[i] == index.generation()
            && self.values[i].is_some())
        .then_some(slot)
    }

    #[inline]
    fn value(&self, slot: u32) -> &T {
        match &self.values[slot as usize] {
            Some(value) => value,
            None => unreachable!("vacant slot {} is linked into the tree", slot),
        }
    }

    #[inline]
    fn parent(&self, slot: u32) -> u32 {
        self.links[slot as usize].parent
    }

    #[inline]
    fn child(&self, slot: u32, side: usize) -> u32 {
        self.links[slot as usize].children[side]
    }

    #[inline]
    fn set_parent(&mut self, slot: u32, parent: u32) {
        self.links[slot as usize].parent = parent;
    }

    #[inline]
    fn set_child(&mut self, slot: u32, side: usize, child: u32) {
        self.links[slot as usize].children[side] = child;
    }

    #[inline]
    fn is_black(&self, slot: u32) -> bool {
        slot == NIL || self.black.get(slot)
    }

    #[inline]
    fn is_red(&self, slot: u32) -> bool {
        !self.is_black(slot)
    }

    #[inline]
    fn set_black(&mut self, slot: u32, black: bool) {
        if slot != NIL {
            self.black.set(slot, black);
        }
    }

    /// Which child slot of `parent` holds `child`
    #[inline]
    fn side_of(&self, parent: u32, child: u32) -> usize {
        if self.child(parent, LEFT) == child {
            LEFT
        } else {
            RIGHT
        }
    }

    fn minimum(&self, mut slot: u32) -> u32 {
        while self.child(slot, LEFT) != NIL {
            slot = self.child(slot, LEFT);
        }
        slot
    }

    fn maximum(&self, mut slot: u32) -> u32 {
        while self.child(slot, RIGHT) != NIL {
            slot = self.child(slot, RIGHT);
        }
        slot
    }

    fn successor(&self, slot: u32) -> u32 {
        self.step(slot, RIGHT)
    }

    fn predecessor(&self, slot: u32) -> u32 {
        self.step(slot, LEFT)
    }

    /// In-order neighbour in direction `side`
    fn step(&self, slot: u32, side: usize) -> u32 {
        let down = self.child(slot, side);
        if down != NIL {
            return if side == RIGHT {
                self.minimum(down)
            } else {
                self.maximum(down)
            };
        }
        let mut current = slot;
        let mut parent = self.parent(current);
        while parent != NIL && self.child(parent, side) == current {
            current = parent;
            parent = self.parent(current);
        }
        parent
    }

    fn allocate(&mut self, value: T) -> u32 {
        let slot = match self.free.pop() {
            Some(slot) => {
                self.values[slot as usize] = Some(value);
                self.links[slot as usize] = Link::DETACHED;
                slot
            }
            None => {
                let slot = self.values.len() as u32;
                debug_assert!(slot != NIL, "tree slot space exhausted");
                self.values.push(Some(value));
                self.links.push(Link::DETACHED);
                self.generations.push(self.base_generation);
                slot
            }
        };
        // New nodes start red
        self.black.set(slot, false);
        slot
    }

    fn release(&mut self, slot: u32) -> T {
        let i = slot as usize;
        self.links[i] = Link::DETACHED;
        self.generations[i] = self.generations[i].wrapping_add(1);
        self.free.push(slot);
        self.len -= 1;
        match self.values[i].take() {
            Some(value) => value,
            None => unreachable!("released vacant slot {}", slot),
        }
    }

    /// Rotate `node` down towards `side`
    ///
    /// `side == LEFT` is a left rotation: the right child takes `node`'s place.
    fn rotate(&mut self, node: u32, side: usize) {
        let other = 1 - side;
        let child = self.child(node, other);
        debug_assert!(child != NIL, "rotation without a child to promote");

        let inner = self.child(child, side);
        self.set_child(node, other, inner);
        if inner != NIL {
            self.set_parent(inner, node);
        }

        let parent = self.parent(node);
        self.set_parent(child, parent);
        if parent == NIL {
            self.root = child;
        } else {
            let slot_side = self.side_of(parent, node);
            self.set_child(parent, slot_side, child);
        }

        self.set_child(child, side, node);
        self.set_parent(node, child);
    }

    fn insert_fixup(&mut self, mut node: u32) {
        while node != self.root {
            let mut parent = self.parent(node);
            if self.is_black(parent) {
                break;
            }
            // A red parent is never the root, so the grandparent exists
            let grand = self.parent(parent);
            let parent_side = self.side_of(grand, parent);
            let uncle = self.child(grand, 1 - parent_side);

            if self.is_red(uncle) {
                self.set_black(parent, true);
                self.set_black(uncle, true);
                self.set_black(grand, false);
                node = grand;
                continue;
            }

            if self.side_of(parent, node) != parent_side {
                self.rotate(parent, parent_side);
                node = parent;
                parent = self.parent(node);
            }

            self.set_black(parent, true);
            self.set_black(grand, false);
            self.rotate(grand, 1 - parent_side);
            break;
        }
        let root = self.root;
        self.set_black(root, true);
    }

    /// Replace the subtree rooted at `old` with the one rooted at `new`
    fn transplant(&mut self, old: u32, new: u32) {
        let parent = self.parent(old);
        if parent == NIL {
            self.root = new;
        } else {
            let side = self.side_of(parent, old);
            self.set_child(parent, side, new);
        }
        if new != NIL {
            self.set_parent(new, parent);
        }
    }

    fn remove_slot(&mut self, node: u32) -> T {
        let removed_black;
        let fix;
        let fix_parent;

        if self.child(node, LEFT) == NIL {
            fix = self.child(node, RIGHT);
            fix_parent = self.parent(node);
            removed_black = self.is_black(node);
            self.transplant(node, fix);
        } else if self.child(node, RIGHT) == NIL {
            fix = self.child(node, LEFT);
            fix_parent = self.parent(node);
            removed_black = self.is_black(node);
            self.transplant(node, fix);
        } else {
            // Two children: splice out the in-order successor instead
            let next = self.minimum(self.child(node, RIGHT));
            removed_black = self.is_black(next);
            fix = self.child(next, RIGHT);

            if self.parent(next) == node {
                fix_parent = next;
            } else {
                fix_parent = self.parent(next);
                self.transplant(next, fix);
                let right = self.child(node, RIGHT);
                self.set_child(next, RIGHT, right);
                self.set_parent(right, next);
            }

            self.transplant(node, next);
            let left = self.child(node, LEFT);
            self.set_child(next, LEFT, left);
            self.set_parent(left, next);
            let node_black = self.is_black(node);
            self.set_black(next, node_black);
        }

        if removed_black {
            self.remove_fixup(fix, fix_parent);
        }

        self.release(node)
    }

    fn remove_fixup(&mut self, mut node: u32, mut parent: u32) {
        while node != self.root && self.is_black(node) {
            // `node` may be NIL, so its side comes from the parent. When it is
            // NIL its sibling cannot be, which keeps this test unambiguous.
            let side = if self.child(parent, LEFT) == node {
                LEFT
            } else {
                RIGHT
            };
            let other = 1 - side;
            let mut sibling = self.child(parent, other);

            if self.is_red(sibling) {
                self.set_black(sibling, true);
                self.set_black(parent, false);
                self.rotate(parent, side);
                sibling = self.child(parent, other);
            }

            let near = self.child(sibling, side);
            let far = self.child(sibling, other);

            if self.is_black(near) && self.is_black(far) {
                self.set_black(sibling, false);
                node = parent;
                parent = self.parent(node);
                continue;
            }

            if self.is_black(far) {
                self.set_black(near, true);
                self.set_black(sibling, false);
                self.rotate(sibling, other);
                sibling = self.child(parent, other);
            }

            let parent_black = self.is_black(parent);
            self.set_black(sibling, parent_black);
            self.set_black(parent, true);
            let far = self.child(sibling, other);
            self.set_black(far, true);
            self.rotate(parent, side);
            node = self.root;
            break;
        }
        self.set_black(node, true);
    }

    /// Black height of the subtree at `slot`, or `None` if it breaks an invariant
    fn verify_subtree(&self, slot: u32, count: &mut usize) -> Option<usize> {
        if slot == NIL {
            return Some(1);
        }
        *count += 1;
        self.values.get(slot as usize)?.as_ref()?;

        for side in [LEFT, RIGHT] {
            let child = self.child(slot, side);
            if child == NIL {
                continue;
            }
            if self.parent(child) != slot {
                return None;
            }
            if self.is_red(slot) && self.is_red(child) {
                return None;
            }
        }

        let left = self.verify_subtree(self.child(slot, LEFT), count)?;
        let right = self.verify_subtree(self.child(slot, RIGHT), count)?;
        if left != right {
            return None;
        }
        Some(left + usize::from(self.is_black(slot)))
    }
}

// Ordered operations: everything that compares keys.
impl<T, P, C> RbTree<T, P, C>
where
    P: KeyPolicy<T>,
    C: Compare<P::Key>,
{
    /// Find the node holding `key`
    pub fn find(&self, key: &P::Key) -> Option<NodeIndex> {
        let mut slot = self.root;
        while slot != NIL {
            match self.compare.compare(key, P::key(self.value(slot))) {
                Ordering::Less => slot = self.child(slot, LEFT),
                Ordering::Greater => slot = self.child(slot, RIGHT),
                Ordering::Equal => return Some(self.index_of(slot)),
            }
        }
        None
    }

    /// Insert `value` unless its key is already present
    ///
    /// Returns the index of the node holding the key and whether a new node
    /// was created. A duplicate key leaves the tree untouched and drops `value`.
    pub fn insert(&mut self, value: T) -> (NodeIndex, bool) {
        let mut parent = NIL;
        let mut side = LEFT;
        let mut slot = self.root;

        while slot != NIL {
            side = match self.compare.compare(P::key(&value), P::key(self.value(slot))) {
                Ordering::Less => LEFT,
                Ordering::Greater => RIGHT,
                Ordering::Equal => return (self.index_of(slot), false),
            };
            parent = slot;
            slot = self.child(slot, side);
        }

        let node = self.allocate(value);
        self.set_parent(node, parent);
        if parent == NIL {
            self.root = node;
        } else {
            self.set_child(parent, side, node);
        }
        self.len += 1;
        self.insert_fixup(node);

        (self.index_of(node), true)
    }

    /// Remove the value stored under `key`
    pub fn remove(&mut self, key: &P::Key) -> Option<T> {
        let index = self.find(key)?;
        self.remove_at(index)
    }

    /// Check every red-black and ordering invariant
    ///
    /// Intended for debug assertions and tests; the walk is linear in size.
    pub fn verify(&self) -> bool {
        if self.root == NIL {
            return self.len == 0;
        }
        if self.parent(self.root) != NIL || self.is_red(self.root) {
            return false;
        }

        let mut count = 0;
        if self.verify_subtree(self.root, &mut count).is_none() || count != self.len {
            return false;
        }

        let mut iter = self.iter();
        let Some(mut previous) = iter.next() else {
            return false;
        };
        for value in iter {
            if self.compare.compare(P::key(previous), P::key(value)) != Ordering::Less {
                return false;
            }
            previous = value;
        }
        true
    }
}

impl<T: Clone, P, C: Clone> Clone for RbTree<T, P, C> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
            links: self.links.clone(),
            black: self.black.clone(),
            generations: self.generations.clone(),
            free: self.free.clone(),
            root: self.root,
            len: self.len,
            base_generation: self.base_generation,
            compare: self.compare.clone(),
            _policy: PhantomData,
        }
    }
}

impl<T: fmt::Debug, P, C> fmt::Debug for RbTree<T, P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// In-order iterator over an [`RbTree`]
pub struct Iter<'a, T, P, C> {
    tree: &'a RbTree<T, P, C>,
    front: u32,
    back: u32,
    remaining: usize,
}

impl<'a, T, P, C> Iterator for Iter<'a, T, P, C> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.front;
        self.front = self.tree.successor(slot);
        self.remaining -= 1;
        Some(self.tree.value(slot))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T, P, C> DoubleEndedIterator for Iter<'_, T, P, C> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let slot = self.back;
        self.back = self.tree.predecessor(slot);
        self.remaining -= 1;
        Some(self.tree.value(slot))
    }
}

impl<T, P, C> ExactSizeIterator for Iter<'_, T, P, C> {}

impl<T, P, C> FusedIterator for Iter<'_, T, P, C> {}

impl<'a, T, P, C> IntoIterator for &'a RbTree<T, P, C> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T, P, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Tree = RbTree<i32, IdentityKey>;

    fn collect(tree: &Tree) -> Vec<i32> {
        tree.iter().copied().collect()
    }

    #[test]
    fn test_insert_keeps_order_and_balance() {
        let mut tree = Tree::new();
        for v in [50, 20, 80, 10, 30, 70, 90, 25, 27, 26] {
            assert!(tree.insert(v).1);
            assert!(tree.verify(), "invariant broken after inserting {}", v);
        }
        assert_eq!(collect(&tree), vec![10, 20, 25, 26, 27, 30, 50, 70, 80, 90]);
        assert_eq!(tree.len(), 10);
    }

    #[test]
    fn test_duplicate_insert_returns_existing() {
        let mut tree = Tree::new();
        let (first, inserted) = tree.insert(5);
        assert!(inserted);
        let slots = tree.capacity_slots();

        let (again, inserted) = tree.insert(5);
        assert!(!inserted);
        assert_eq!(first, again);
        assert_eq!(tree.capacity_slots(), slots);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_ascending_inserts_stay_balanced() {
        let mut tree = Tree::new();
        for v in 0..1000 {
            tree.insert(v);
        }
        assert!(tree.verify());
        assert_eq!(tree.iter().rev().next(), Some(&999));
    }

    #[test]
    fn test_remove_every_other() {
        let mut tree = Tree::new();
        for v in 0..200 {
            tree.insert(v);
        }
        for v in (0..200).step_by(2) {
            assert_eq!(tree.remove(&v), Some(v));
            assert!(tree.verify(), "invariant broken after removing {}", v);
        }
        assert_eq!(collect(&tree), (1..200).step_by(2).collect::<Vec<_>>());
        assert_eq!(tree.remove(&0), None);
    }

    #[test]
    fn test_remove_last_resets_root() {
        let mut tree = Tree::new();
        tree.insert(1);
        assert_eq!(tree.remove(&1), Some(1));
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert_eq!(tree.first(), None);
        assert!(tree.verify());
    }

    #[test]
    fn test_stale_index_rejected_after_slot_reuse() {
        let mut tree = Tree::new();
        let (old, _) = tree.insert(1);
        tree.remove_at(old);

        let (new, _) = tree.insert(2);
        assert_eq!(old.slot(), new.slot());
        assert_ne!(old.generation(), new.generation());
        assert_eq!(tree.get(old), None);
        assert_eq!(tree.get(new), Some(&2));
        assert_eq!(tree.remove_at(old), None);
    }

    #[test]
    fn test_navigation() {
        let mut tree = Tree::new();
        for v in [3, 1, 2] {
            tree.insert(v);
        }
        let first = tree.first().unwrap();
        assert_eq!(tree.get(first), Some(&1));
        let second = tree.next(first).unwrap();
        assert_eq!(tree.get(second), Some(&2));
        let last = tree.last().unwrap();
        assert_eq!(tree.prev(last), Some(second));
        assert_eq!(tree.next(last), None);
    }

    #[test]
    fn test_clear_invalidates_indices() {
        let mut tree = Tree::new();
        let (index, _) = tree.insert(4);
        tree.clear();
        assert!(tree.is_empty());
        assert!(!tree.contains_index(index));
        tree.insert(4);
        assert!(tree.verify());
        assert_eq!(tree.get(index), None);
    }

    #[test]
    fn test_trim_releases_trailing_slots() {
        let mut tree = Tree::new();
        let mut indices = Vec::new();
        for v in 0..10 {
            indices.push(tree.insert(v).0);
        }
        for v in 5..10 {
            tree.remove(&v);
        }
        let stale = indices[9];
        tree.trim();
        assert_eq!(tree.capacity_slots(), 5);
        assert_eq!(tree.get(indices[4]), Some(&4));

        // Slot 9 is recreated with a newer generation
        for v in 10..15 {
            tree.insert(v);
        }
        assert_eq!(tree.get(stale), None);
        assert!(tree.verify());
    }

    #[test]
    fn test_custom_comparator() {
        let descending: fn(&i32, &i32) -> Ordering = |a, b| b.cmp(a);
        let mut tree: RbTree<i32, IdentityKey, _> = RbTree::with_compare(FnCompare(descending));
        for v in [1, 3, 2] {
            tree.insert(v);
        }
        assert_eq!(tree.iter().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
        assert!(tree.verify());
    }

    #[test]
    fn test_pair_policy() {
        let mut tree: RbTree<(u32, &str), PairKey> = RbTree::new();
        tree.insert((2, "b"));
        tree.insert((1, "a"));
        assert!(!tree.insert((1, "z")).1);
        let found = tree.find(&1).unwrap();
        assert_eq!(tree.get(found), Some(&(1, "a")));
    }
}
