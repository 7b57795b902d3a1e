//! Hash and sorted sets of keys

use std::collections::HashSet;
use std::marker::PhantomData;

use super::container::text_lines;
use super::{
    create_with, deserialize_values, serialize_items, ContainerData, ContainerMut, ContainerRef,
    Data, DataClass, DataFlags, DataPtr, DataValue, Key, SetContainer, SetStorage, SimpleData,
    TypedData,
};
use crate::archive::{ArchiveBinary, ArchiveResult, ArchiveXml};
use crate::rbtree::SortedSet;

/// Data binding for a set of keys, generic over hash or sorted storage
///
/// Members are archived as components. A member that fails to convert on read
/// is dropped with a warning.
pub struct SetData<K: Key, S: SetStorage<K> = HashSet<K>> {
    data: DataPtr<S>,
    _key: PhantomData<fn() -> K>,
}

/// Data binding for [`SortedSet`]
pub type SortedSetData<K> = SetData<K, SortedSet<K>>;

impl<K: Key, S: SetStorage<K>> Default for SetData<K, S> {
    fn default() -> Self {
        Self {
            data: DataPtr::default(),
            _key: PhantomData,
        }
    }
}

impl<K: Key, S: SetStorage<K>> SetData<K, S> {
    fn class() -> DataClass {
        if S::SORTED {
            DataClass::SortedSet(K::KIND)
        } else {
            DataClass::Set(K::KIND)
        }
    }

    fn replace(&mut self, keys: Vec<K>) {
        let set = self.data.get_mut();
        set.clear();
        for key in keys {
            set.insert(key);
        }
    }
}

impl<K: Key, S: SetStorage<K>> TypedData for SetData<K, S> {
    type Value = S;

    fn with_value(value: S) -> Self {
        Self {
            data: DataPtr::new(value),
            _key: PhantomData,
        }
    }

    fn value(&self) -> &S {
        self.data.get()
    }

    fn value_mut(&mut self) -> &mut S {
        self.data.get_mut()
    }
}

impl<K: Key> DataValue for HashSet<K> {
    type Data = SetData<K, HashSet<K>>;

    fn data_class() -> DataClass {
        DataClass::Set(K::KIND)
    }
}

impl<K: Key> DataValue for SortedSet<K> {
    type Data = SetData<K, SortedSet<K>>;

    fn data_class() -> DataClass {
        DataClass::SortedSet(K::KIND)
    }
}

impl<K: Key, S: SetStorage<K>> Data for SetData<K, S> {
    data_plumbing!();

    fn data_class(&self) -> DataClass {
        Self::class()
    }

    fn set(&mut self, src: &dyn Data, _flags: DataFlags) -> bool {
        match src.downcast_ref::<Self>() {
            Some(src) => {
                self.data.set(src.data.get().clone());
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn Data) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|other| other.data.get() == self.data.get())
    }

    fn clone_data(&self) -> Box<dyn Data> {
        Box::new(Self::with_value(self.data.get().clone()))
    }

    fn serialize_binary(&self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        serialize_items(archive, self.data.get().keys())
    }

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        let keys = deserialize_values::<_, K>(archive)?;
        self.replace(keys);
        Ok(())
    }

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        serialize_items(archive, self.data.get().keys())
    }

    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        let keys = deserialize_values::<_, K>(archive)?;
        self.replace(keys);
        Ok(())
    }

    fn to_text(&self) -> String {
        let lines: Vec<String> = self
            .data
            .get()
            .keys()
            .into_iter()
            .map(|key| {
                let mut out = String::new();
                key.write_text(&mut out);
                out
            })
            .collect();
        lines.join("\n")
    }

    fn from_text(&mut self, text: &str) -> bool {
        let keys: Option<Vec<K>> = text_lines(text).map(K::parse_text).collect();
        match keys {
            Some(keys) => {
                self.replace(keys);
                true
            }
            None => false,
        }
    }

    fn should_serialize(&self) -> bool {
        self.data.get().len() > 0
    }

    fn as_container(&self) -> Option<ContainerRef<'_>> {
        Some(ContainerRef::Set(self))
    }

    fn as_container_mut(&mut self) -> Option<ContainerMut<'_>> {
        Some(ContainerMut::Set(self))
    }
}

impl<K: Key, S: SetStorage<K>> ContainerData for SetData<K, S> {
    fn len(&self) -> usize {
        self.data.get().len()
    }

    fn clear(&mut self) {
        self.data.get_mut().clear();
    }
}

impl<K: Key, S: SetStorage<K>> SetContainer for SetData<K, S> {
    fn item_class(&self) -> DataClass {
        DataClass::Scalar(K::KIND)
    }

    fn add_item(&mut self, value: &dyn Data) -> bool {
        match value.downcast_ref::<SimpleData<K>>() {
            Some(value) => {
                self.data.get_mut().insert(value.get().clone());
                true
            }
            None => false,
        }
    }

    fn remove_item(&mut self, value: &dyn Data) -> bool {
        value
            .downcast_ref::<SimpleData<K>>()
            .is_some_and(|value| self.data.get_mut().remove(value.get()))
    }

    fn contains_item(&self, value: &dyn Data) -> bool {
        value
            .downcast_ref::<SimpleData<K>>()
            .is_some_and(|value| self.data.get().contains(value.get()))
    }

    fn items(&self) -> Vec<Box<dyn Data>> {
        self.data
            .get()
            .keys()
            .into_iter()
            .map(|key| create_with(key.clone()))
            .collect()
    }
}
