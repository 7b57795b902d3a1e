//! Generation-checked node indices and key policies
//!
//! Tree nodes are addressed by slot number instead of by pointer. A slot is
//! recycled after its node is removed, so every [`NodeIndex`] also carries the
//! slot's generation at the time it was handed out:
//!
//! ```text
//! ┌─────────────────────────────┬─────────────────────────────┐
//! │        slot (u32)           │      generation (u32)       │
//! └─────────────────────────────┴─────────────────────────────┘
//! ```
//!
//! Removing a node bumps its slot's generation, so an index taken before the
//! removal no longer resolves.

use std::cmp::Ordering;
use std::fmt;

/// Sentinel slot used for empty links and an empty root
pub(crate) const NIL: u32 = u32::MAX;

/// A stable reference to a tree node
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIndex {
    slot: u32,
    generation: u32,
}

impl NodeIndex {
    #[inline]
    pub(crate) const fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    /// Slot number in the tree's backing arrays
    #[inline]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Reuse counter of the slot when this index was created
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeIndex({}v{})", self.slot, self.generation)
    }
}

/// Extracts the ordering key from a stored value
///
/// One tree implementation serves both sets (the value is the key) and maps
/// (the key is the first half of a pair).
pub trait KeyPolicy<T> {
    type Key;

    fn key(value: &T) -> &Self::Key;
}

/// The stored value is its own key
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityKey;

impl<T> KeyPolicy<T> for IdentityKey {
    type Key = T;

    #[inline]
    fn key(value: &T) -> &T {
        value
    }
}

/// The key is the first element of a `(key, value)` pair
#[derive(Debug, Clone, Copy, Default)]
pub struct PairKey;

impl<K, V> KeyPolicy<(K, V)> for PairKey {
    type Key = K;

    #[inline]
    fn key(value: &(K, V)) -> &K {
        &value.0
    }
}

/// Key comparator used to order tree nodes
pub trait Compare<K> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdCompare;

impl<K: Ord> Compare<K> for OrdCompare {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Orders keys with a user supplied function
#[derive(Clone, Copy)]
pub struct FnCompare<F>(pub F);

impl<K, F> Compare<K> for FnCompare<F>
where
    F: Fn(&K, &K) -> Ordering,
{
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        (self.0)(a, b)
    }
}

impl<F> fmt::Debug for FnCompare<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnCompare")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_policies() {
        assert_eq!(*IdentityKey::key(&5), 5);
        assert_eq!(*PairKey::key(&("a", 1)), "a");
    }

    #[test]
    fn test_fn_compare_reverses() {
        let cmp = FnCompare(|a: &i32, b: &i32| b.cmp(a));
        assert_eq!(cmp.compare(&1, &2), Ordering::Greater);
        assert_eq!(OrdCompare.compare(&1, &2), Ordering::Less);
    }
}
