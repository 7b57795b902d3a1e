//! Ordered set and map built on [`RbTree`]

use std::fmt;

use super::{Compare, IdentityKey, Iter, NodeIndex, OrdCompare, PairKey, RbTree};

/// A set that iterates its keys in comparator order
pub struct SortedSet<K, C = OrdCompare> {
    tree: RbTree<K, IdentityKey, C>,
}

impl<K, C: Default> SortedSet<K, C> {
    pub fn new() -> Self {
        Self { tree: RbTree::new() }
    }
}

impl<K, C> SortedSet<K, C> {
    pub fn with_compare(compare: C) -> Self {
        Self {
            tree: RbTree::with_compare(compare),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, K, IdentityKey, C> {
        self.tree.iter()
    }

    pub fn first(&self) -> Option<&K> {
        self.tree.first().and_then(|i| self.tree.get(i))
    }

    pub fn last(&self) -> Option<&K> {
        self.tree.last().and_then(|i| self.tree.get(i))
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn reserve(&mut self, additional: usize) {
        self.tree.reserve(additional);
    }

    pub fn trim(&mut self) {
        self.tree.trim();
    }

    /// The backing tree, for index based navigation
    pub fn tree(&self) -> &RbTree<K, IdentityKey, C> {
        &self.tree
    }
}

impl<K, C: Compare<K>> SortedSet<K, C> {
    /// Insert a key, returning `false` if it was already present
    pub fn insert(&mut self, key: K) -> bool {
        self.tree.insert(key).1
    }

    pub fn contains(&self, key: &K) -> bool {
        self.tree.find(key).is_some()
    }

    pub fn find(&self, key: &K) -> Option<NodeIndex> {
        self.tree.find(key)
    }

    /// Remove a key, returning whether it was present
    pub fn remove(&mut self, key: &K) -> bool {
        self.tree.remove(key).is_some()
    }

    /// Remove and return the stored key equal to `key`
    pub fn take(&mut self, key: &K) -> Option<K> {
        self.tree.remove(key)
    }

    pub fn verify(&self) -> bool {
        self.tree.verify()
    }
}

impl<K, C: Default> Default for SortedSet<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, C: Clone> Clone for SortedSet<K, C> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: PartialEq, C> PartialEq for SortedSet<K, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, C> Eq for SortedSet<K, C> {}

impl<K: fmt::Debug, C> fmt::Debug for SortedSet<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<K, C: Compare<K>> Extend<K> for SortedSet<K, C> {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.insert(key);
        }
    }
}

impl<K, C: Compare<K> + Default> FromIterator<K> for SortedSet<K, C> {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<'a, K, C> IntoIterator for &'a SortedSet<K, C> {
    type Item = &'a K;
    type IntoIter = Iter<'a, K, IdentityKey, C>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A map that iterates its entries in key order
pub struct SortedMap<K, V, C = OrdCompare> {
    tree: RbTree<(K, V), PairKey, C>,
}

impl<K, V, C: Default> SortedMap<K, V, C> {
    pub fn new() -> Self {
        Self { tree: RbTree::new() }
    }
}

impl<K, V, C> SortedMap<K, V, C> {
    pub fn with_compare(compare: C) -> Self {
        Self {
            tree: RbTree::with_compare(compare),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Entries in key order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &V)> + ExactSizeIterator + '_ {
        self.tree.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = &K> + ExactSizeIterator + '_ {
        self.tree.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl DoubleEndedIterator<Item = &V> + ExactSizeIterator + '_ {
        self.tree.iter().map(|(_, v)| v)
    }

    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        let (k, v) = self.tree.first().and_then(|i| self.tree.get(i))?;
        Some((k, v))
    }

    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        let (k, v) = self.tree.last().and_then(|i| self.tree.get(i))?;
        Some((k, v))
    }

    /// Visit every entry in key order with mutable access to the value
    pub fn for_each_value_mut(&mut self, mut f: impl FnMut(&K, &mut V)) {
        self.tree.for_each_mut(|(k, v)| f(k, v));
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    pub fn reserve(&mut self, additional: usize) {
        self.tree.reserve(additional);
    }

    pub fn trim(&mut self) {
        self.tree.trim();
    }

    /// The backing tree, for index based navigation
    pub fn tree(&self) -> &RbTree<(K, V), PairKey, C> {
        &self.tree
    }
}

impl<K, V, C: Compare<K>> SortedMap<K, V, C> {
    /// Insert or replace, returning the previous value
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        if let Some(index) = self.tree.find(&key) {
            let slot = self.tree.get_mut(index)?;
            return Some(std::mem::replace(&mut slot.1, value));
        }
        self.tree.insert((key, value));
        None
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let index = self.tree.find(key)?;
        self.tree.get(index).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.tree.find(key)?;
        self.tree.get_mut(index).map(|(_, v)| v)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.tree.find(key).is_some()
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.tree.remove(key).map(|(_, v)| v)
    }

    /// Value for `key`, inserting `f()` first if the key is absent
    pub fn get_or_insert_with(&mut self, key: K, f: impl FnOnce() -> V) -> &mut V {
        let index = match self.tree.find(&key) {
            Some(index) => index,
            None => self.tree.insert((key, f())).0,
        };
        match self.tree.get_mut(index) {
            Some((_, v)) => v,
            None => unreachable!("freshly resolved index {:?} is live", index),
        }
    }

    pub fn verify(&self) -> bool {
        self.tree.verify()
    }
}

impl<K, V, C: Default> Default for SortedMap<K, V, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone, V: Clone, C: Clone> Clone for SortedMap<K, V, C> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
        }
    }
}

impl<K: PartialEq, V: PartialEq, C> PartialEq for SortedMap<K, V, C> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.tree.iter().eq(other.tree.iter())
    }
}

impl<K: Eq, V: Eq, C> Eq for SortedMap<K, V, C> {}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for SortedMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C: Compare<K>> Extend<(K, V)> for SortedMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.insert(k, v);
        }
    }
}

impl<K, V, C: Compare<K> + Default> FromIterator<(K, V)> for SortedMap<K, V, C> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}
