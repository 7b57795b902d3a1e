//! Hash and sorted maps of scalars

use std::collections::HashMap;
use std::marker::PhantomData;

use super::{
    create_with, deserialize_pairs, serialize_pairs, ContainerData, ContainerMut, ContainerRef,
    Data, DataClass, DataFlags, DataPtr, DataValue, Key, MapContainer, MapStorage, Scalar,
    SimpleData, TypedData,
};
use crate::archive::{ArchiveBinary, ArchiveResult, ArchiveXml};
use crate::rbtree::SortedMap;

/// Data binding for a scalar map, generic over hash or sorted storage
///
/// Entries are archived as alternating key and value components. Reading is
/// all or nothing: the map is only replaced once every pair has been read.
pub struct MapData<K: Key, V: Scalar, M: MapStorage<K, V> = HashMap<K, V>> {
    data: DataPtr<M>,
    _entry: PhantomData<fn() -> (K, V)>,
}

/// Data binding for [`SortedMap`]
pub type SortedMapData<K, V> = MapData<K, V, SortedMap<K, V>>;

impl<K: Key, V: Scalar, M: MapStorage<K, V>> Default for MapData<K, V, M> {
    fn default() -> Self {
        Self {
            data: DataPtr::default(),
            _entry: PhantomData,
        }
    }
}

impl<K: Key, V: Scalar, M: MapStorage<K, V>> MapData<K, V, M> {
    fn class() -> DataClass {
        if M::SORTED {
            DataClass::SortedMap(K::KIND, V::KIND)
        } else {
            DataClass::Map(K::KIND, V::KIND)
        }
    }

    fn replace(&mut self, pairs: Vec<(K, V)>) {
        let map = self.data.get_mut();
        map.clear();
        for (key, value) in pairs {
            map.insert(key, value);
        }
    }
}

impl<K: Key, V: Scalar, M: MapStorage<K, V>> TypedData for MapData<K, V, M> {
    type Value = M;

    fn with_value(value: M) -> Self {
        Self {
            data: DataPtr::new(value),
            _entry: PhantomData,
        }
    }

    fn value(&self) -> &M {
        self.data.get()
    }

    fn value_mut(&mut self) -> &mut M {
        self.data.get_mut()
    }
}

impl<K: Key, V: Scalar> DataValue for HashMap<K, V> {
    type Data = MapData<K, V, HashMap<K, V>>;

    fn data_class() -> DataClass {
        DataClass::Map(K::KIND, V::KIND)
    }
}

impl<K: Key, V: Scalar> DataValue for SortedMap<K, V> {
    type Data = MapData<K, V, SortedMap<K, V>>;

    fn data_class() -> DataClass {
        DataClass::SortedMap(K::KIND, V::KIND)
    }
}

impl<K: Key, V: Scalar, M: MapStorage<K, V>> Data for MapData<K, V, M> {
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
        let Some(other) = other.downcast_ref::<Self>() else {
            return false;
        };
        let (a, b) = (self.data.get(), other.data.get());
        a.len() == b.len()
            && a
                .entries()
                .into_iter()
                .all(|(key, value)| b.get(key) == Some(value))
    }

    fn clone_data(&self) -> Box<dyn Data> {
        Box::new(Self::with_value(self.data.get().clone()))
    }

    fn serialize_binary(&self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        serialize_pairs(archive, self.data.get().entries())
    }

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        let pairs = deserialize_pairs::<_, K, V>(archive)?;
        self.replace(pairs);
        Ok(())
    }

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        serialize_pairs(archive, self.data.get().entries())
    }

    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        let pairs = deserialize_pairs::<_, K, V>(archive)?;
        self.replace(pairs);
        Ok(())
    }

    fn to_text(&self) -> String {
        let lines: Vec<String> = self
            .data
            .get()
            .entries()
            .into_iter()
            .map(|(key, value)| {
                let mut out = String::new();
                key.write_text(&mut out);
                out.push_str(" = ");
                value.write_text(&mut out);
                out
            })
            .collect();
        lines.join("\n")
    }

    fn from_text(&mut self, text: &str) -> bool {
        let pairs: Option<Vec<(K, V)>> = super::container::text_lines(text)
            .map(|line| {
                let (key, value) = line.split_once('=')?;
                Some((K::parse_text(key.trim())?, V::parse_text(value.trim())?))
            })
            .collect();
        match pairs {
            Some(pairs) => {
                self.replace(pairs);
                true
            }
            None => false,
        }
    }

    fn should_serialize(&self) -> bool {
        self.data.get().len() > 0
    }

    fn as_container(&self) -> Option<ContainerRef<'_>> {
        Some(ContainerRef::Map(self))
    }

    fn as_container_mut(&mut self) -> Option<ContainerMut<'_>> {
        Some(ContainerMut::Map(self))
    }
}

impl<K: Key, V: Scalar, M: MapStorage<K, V>> ContainerData for MapData<K, V, M> {
    fn len(&self) -> usize {
        self.data.get().len()
    }

    fn clear(&mut self) {
        self.data.get_mut().clear();
    }
}

impl<K: Key, V: Scalar, M: MapStorage<K, V>> MapContainer for MapData<K, V, M> {
    fn key_class(&self) -> DataClass {
        DataClass::Scalar(K::KIND)
    }

    fn value_class(&self) -> DataClass {
        DataClass::Scalar(V::KIND)
    }

    fn get_item(&self, key: &dyn Data) -> Option<Box<dyn Data>> {
        let key = key.downcast_ref::<SimpleData<K>>()?;
        self.data.get().get(key.get()).cloned().map(create_with)
    }

    fn set_item(&mut self, key: &dyn Data, value: &dyn Data) -> bool {
        let (Some(key), Some(value)) = (
            key.downcast_ref::<SimpleData<K>>(),
            value.downcast_ref::<SimpleData<V>>(),
        ) else {
            return false;
        };
        self.data
            .get_mut()
            .insert(key.get().clone(), value.get().clone());
        true
    }

    fn remove_item(&mut self, key: &dyn Data) -> bool {
        key.downcast_ref::<SimpleData<K>>()
            .is_some_and(|key| self.data.get_mut().remove(key.get()).is_some())
    }

    fn items(&self) -> Vec<(Box<dyn Data>, Box<dyn Data>)> {
        self.data
            .get()
            .entries()
            .into_iter()
            .map(|(key, value)| (create_with(key.clone()), create_with(value.clone())))
            .collect()
    }
}
