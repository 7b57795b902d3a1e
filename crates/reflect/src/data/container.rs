//! Container capabilities shared by array, set and map bindings

use std::collections::{BTreeSet, HashMap, HashSet};
use std::ptr::NonNull;

use tracing::warn;

use super::{create, Data, DataClass, DataValue, Key};
use crate::archive::{Archive, ArchiveError, ArchiveFlags, ArchiveResult};
use crate::rbtree::{SortedMap, SortedSet};

/// Operations common to every container binding
pub trait ContainerData {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);
}

/// Index addressed containers
pub trait ArrayContainer: ContainerData {
    fn item_class(&self) -> DataClass;

    /// Standalone copy of the item at `index`
    fn item(&self, index: usize) -> Option<Box<dyn Data>>;

    fn set_item(&mut self, index: usize, value: &dyn Data) -> bool;

    fn insert_item(&mut self, index: usize, value: &dyn Data) -> bool;

    fn push_item(&mut self, value: &dyn Data) -> bool {
        let len = self.len();
        self.insert_item(len, value)
    }

    fn remove_item(&mut self, index: usize) -> bool;

    /// Grow with default items or truncate
    fn resize(&mut self, len: usize);

    /// Move each selected item one slot towards the front
    ///
    /// `selected` is updated to the new positions. Items already at the front,
    /// or blocked by a selected neighbor that could not move, stay put.
    fn move_up(&mut self, selected: &mut BTreeSet<usize>);

    /// Move each selected item one slot towards the back
    fn move_down(&mut self, selected: &mut BTreeSet<usize>);
}

/// Unordered or sorted membership containers
pub trait SetContainer: ContainerData {
    fn item_class(&self) -> DataClass;

    fn add_item(&mut self, value: &dyn Data) -> bool;

    fn remove_item(&mut self, value: &dyn Data) -> bool;

    fn contains_item(&self, value: &dyn Data) -> bool;

    /// Standalone copies of every member, in storage order
    fn items(&self) -> Vec<Box<dyn Data>>;
}

/// Key to value containers
pub trait MapContainer: ContainerData {
    fn key_class(&self) -> DataClass;

    fn value_class(&self) -> DataClass;

    fn get_item(&self, key: &dyn Data) -> Option<Box<dyn Data>>;

    /// Insert or replace
    fn set_item(&mut self, key: &dyn Data, value: &dyn Data) -> bool;

    fn remove_item(&mut self, key: &dyn Data) -> bool;

    /// Standalone copies of every entry, in storage order
    fn items(&self) -> Vec<(Box<dyn Data>, Box<dyn Data>)>;
}

/// Shared view of a container binding
pub enum ContainerRef<'a> {
    Array(&'a dyn ArrayContainer),
    Set(&'a dyn SetContainer),
    Map(&'a dyn MapContainer),
}

/// Exclusive view of a container binding
pub enum ContainerMut<'a> {
    Array(&'a mut dyn ArrayContainer),
    Set(&'a mut dyn SetContainer),
    Map(&'a mut dyn MapContainer),
}

/// Backing storage of a set binding
pub trait SetStorage<K>: Default + Clone + PartialEq + 'static {
    const SORTED: bool;

    fn len(&self) -> usize;

    fn clear(&mut self);

    fn insert(&mut self, key: K) -> bool;

    fn remove(&mut self, key: &K) -> bool;

    fn contains(&self, key: &K) -> bool;

    fn keys(&self) -> Vec<&K>;
}

impl<K: Key> SetStorage<K> for HashSet<K> {
    const SORTED: bool = false;

    fn len(&self) -> usize {
        HashSet::len(self)
    }

    fn clear(&mut self) {
        HashSet::clear(self)
    }

    fn insert(&mut self, key: K) -> bool {
        HashSet::insert(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        HashSet::remove(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        HashSet::contains(self, key)
    }

    fn keys(&self) -> Vec<&K> {
        self.iter().collect()
    }
}

impl<K: Key> SetStorage<K> for SortedSet<K> {
    const SORTED: bool = true;

    fn len(&self) -> usize {
        SortedSet::len(self)
    }

    fn clear(&mut self) {
        SortedSet::clear(self)
    }

    fn insert(&mut self, key: K) -> bool {
        SortedSet::insert(self, key)
    }

    fn remove(&mut self, key: &K) -> bool {
        SortedSet::remove(self, key)
    }

    fn contains(&self, key: &K) -> bool {
        SortedSet::contains(self, key)
    }

    fn keys(&self) -> Vec<&K> {
        self.iter().collect()
    }
}

/// Backing storage of a map binding
pub trait MapStorage<K, V>: Default + Clone + 'static {
    const SORTED: bool;

    fn len(&self) -> usize;

    fn clear(&mut self);

    fn insert(&mut self, key: K, value: V) -> Option<V>;

    fn get(&self, key: &K) -> Option<&V>;

    fn remove(&mut self, key: &K) -> Option<V>;

    fn entries(&self) -> Vec<(&K, &V)>;

    fn for_each_value_mut(&mut self, f: &mut dyn FnMut(&K, &mut V));
}

impl<K: Key, V: Clone + 'static> MapStorage<K, V> for HashMap<K, V> {
    const SORTED: bool = false;

    fn len(&self) -> usize {
        HashMap::len(self)
    }

    fn clear(&mut self) {
        HashMap::clear(self)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        HashMap::insert(self, key, value)
    }

    fn get(&self, key: &K) -> Option<&V> {
        HashMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        HashMap::remove(self, key)
    }

    fn entries(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }

    fn for_each_value_mut(&mut self, f: &mut dyn FnMut(&K, &mut V)) {
        for (k, v) in self.iter_mut() {
            f(k, v);
        }
    }
}

impl<K: Key, V: Clone + 'static> MapStorage<K, V> for SortedMap<K, V> {
    const SORTED: bool = true;

    fn len(&self) -> usize {
        SortedMap::len(self)
    }

    fn clear(&mut self) {
        SortedMap::clear(self)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        SortedMap::insert(self, key, value)
    }

    fn get(&self, key: &K) -> Option<&V> {
        SortedMap::get(self, key)
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        SortedMap::remove(self, key)
    }

    fn entries(&self) -> Vec<(&K, &V)> {
        self.iter().collect()
    }

    fn for_each_value_mut(&mut self, f: &mut dyn FnMut(&K, &mut V)) {
        SortedMap::for_each_value_mut(self, f)
    }
}

/// Serialize borrowed items as archive components
///
/// Each item is wrapped in a cached Data connected to the item itself, so
/// nothing is copied.
pub(crate) fn serialize_items<'a, 'c, A, T>(
    archive: &mut A,
    items: impl IntoIterator<Item = &'a T>,
) -> ArchiveResult<()>
where
    A: Archive<'c>,
    T: DataValue,
{
    let mut components = Vec::new();
    for item in items {
        let mut data = archive.cache().take(T::data_class(), create::<T>);
        // SAFETY: the item outlives this call and the component is only read
        unsafe { data.connect(NonNull::from(item).cast()) };
        components.push(data);
    }
    let result = archive.serialize_components(&components);
    for data in components {
        archive.cache().give(data);
    }
    result
}

/// Serialize map entries as alternating key and value components
pub(crate) fn serialize_pairs<'a, 'c, A, K, V>(
    archive: &mut A,
    entries: impl IntoIterator<Item = (&'a K, &'a V)>,
) -> ArchiveResult<()>
where
    A: Archive<'c>,
    K: DataValue,
    V: DataValue,
{
    let mut components = Vec::new();
    for (key, value) in entries {
        let mut key_data = archive.cache().take(K::data_class(), create::<K>);
        let mut value_data = archive.cache().take(V::data_class(), create::<V>);
        // SAFETY: the entry outlives this call and the components are only read
        unsafe {
            key_data.connect(NonNull::from(key).cast());
            value_data.connect(NonNull::from(value).cast());
        }
        components.push(key_data);
        components.push(value_data);
    }
    let result = archive.serialize_components(&components);
    for data in components {
        archive.cache().give(data);
    }
    result
}

fn extract<'c, A: Archive<'c>, T: DataValue>(archive: &mut A, component: Box<dyn Data>) -> Option<T> {
    let value = archive.context().get_value::<T>(&*component);
    if value.is_none() {
        warn!(
            "Discarding {} component, expected {}",
            component.data_class(),
            T::data_class()
        );
    }
    archive.cache().give(component);
    value
}

/// Read components and convert each to `T`, dropping the ones that do not convert
pub(crate) fn deserialize_values<'c, A, T>(archive: &mut A) -> ArchiveResult<Vec<T>>
where
    A: Archive<'c>,
    T: DataValue,
{
    let components = archive.deserialize_components(ArchiveFlags::empty())?;
    let mut values = Vec::with_capacity(components.len());
    for component in components.into_iter().flatten() {
        if let Some(value) = extract::<A, T>(archive, component) {
            values.push(value);
        }
    }
    Ok(values)
}

/// Read alternating key and value components
///
/// An odd component count is a format error; a pair with a null or
/// unconvertible half is dropped.
pub(crate) fn deserialize_pairs<'c, A, K, V>(archive: &mut A) -> ArchiveResult<Vec<(K, V)>>
where
    A: Archive<'c>,
    K: DataValue,
    V: DataValue,
{
    let components = archive.deserialize_components(ArchiveFlags::SPARSE)?;
    if components.len() % 2 != 0 {
        return Err(ArchiveError::data_format(format!(
            "Unmatched map objects: {} components",
            components.len()
        )));
    }

    let mut pairs = Vec::with_capacity(components.len() / 2);
    let mut iter = components.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        let (Some(key), Some(value)) = (key, value) else {
            continue;
        };
        let key = extract::<A, K>(archive, key);
        let value = extract::<A, V>(archive, value);
        if let (Some(key), Some(value)) = (key, value) {
            pairs.push((key, value));
        }
    }
    Ok(pairs)
}

/// Shift selected indices one towards the front
pub(crate) fn move_up<T>(items: &mut [T], selected: &mut BTreeSet<usize>) {
    let mut moved = BTreeSet::new();
    for &index in selected.iter() {
        if index == 0 || index >= items.len() || moved.contains(&(index - 1)) {
            moved.insert(index);
            continue;
        }
        items.swap(index - 1, index);
        moved.insert(index - 1);
    }
    *selected = moved;
}

/// Shift selected indices one towards the back
pub(crate) fn move_down<T>(items: &mut [T], selected: &mut BTreeSet<usize>) {
    let mut moved = BTreeSet::new();
    for &index in selected.iter().rev() {
        if index + 1 >= items.len() || moved.contains(&(index + 1)) {
            moved.insert(index);
            continue;
        }
        items.swap(index, index + 1);
        moved.insert(index + 1);
    }
    *selected = moved;
}

/// Lines of a text block, trimmed, without blanks
pub(crate) fn text_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Quote one entry of a string block, escaping line breaks and backslashes
pub(crate) fn quote_entry(entry: &str) -> String {
    let mut out = String::with_capacity(entry.len() + 2);
    out.push('"');
    for c in entry.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Entries of a block written with [`quote_entry`], one per non-blank line
///
/// Returns `None` if a line is not a complete quoted entry or holds an
/// unknown escape.
pub(crate) fn quoted_lines(text: &str) -> Option<Vec<String>> {
    text_lines(text).map(unquote_entry).collect()
}

fn unquote_entry(line: &str) -> Option<String> {
    let inner = line.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            '\\' => out.push('\\'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            _ => return None,
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_up_blocked_by_front() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        let mut selected: BTreeSet<usize> = [0, 1, 3].into_iter().collect();
        move_up(&mut items, &mut selected);

        assert_eq!(items, vec!['a', 'b', 'd', 'c']);
        assert_eq!(selected.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_move_down() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        let mut selected: BTreeSet<usize> = [0, 2, 3].into_iter().collect();
        move_down(&mut items, &mut selected);

        assert_eq!(items, vec!['b', 'a', 'c', 'd']);
        assert_eq!(selected.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_quoted_lines() {
        let text = "\n  \"first\"\n  \"with \"inner\" quotes\"\n  \n  \"\"\n";
        assert_eq!(
            quoted_lines(text).unwrap(),
            vec!["first", "with \"inner\" quotes", ""]
        );
    }

    #[test]
    fn test_quote_entry_escapes_line_breaks() {
        let entries = ["a\nb", "c:\\path", "\r\n", ""];
        let block: Vec<String> = entries.iter().map(|e| quote_entry(e)).collect();
        assert_eq!(block[0], "\"a\\nb\"");
        assert!(block.iter().all(|line| !line.contains('\n')));
        assert_eq!(quoted_lines(&block.join("\n")).unwrap(), entries);
    }

    #[test]
    fn test_quoted_lines_reject_broken_entries() {
        assert!(quoted_lines("\"open\n\"").is_none());
        assert!(quoted_lines("bare").is_none());
        assert!(quoted_lines("\"bad \\x escape\"").is_none());
    }

    #[test]
    fn test_text_lines_skip_blanks() {
        let lines: Vec<_> = text_lines("\n  1\n\n  2  \n").collect();
        assert_eq!(lines, vec!["1", "2"]);
    }
}
