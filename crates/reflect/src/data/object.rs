//! Bindings for fields that reference objects
//!
//! `set` deep-copies referenced objects through their class creator unless
//! [`DataFlags::SHALLOW`] is given, in which case the references are shared.
//! Equality compares referenced objects field by field. Object sets hold their
//! members by identity but compare them the same way, pairing each member with
//! a distinct equal member of the other set.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::marker::PhantomData;

use super::container::{move_down, move_up};
use super::{
    create_with, deserialize_pairs, serialize_pairs, ArrayContainer, ContainerData, ContainerMut,
    ContainerRef, Data, DataClass, DataFlags, DataPtr, DataValue, Key, MapContainer, MapStorage,
    SetContainer, SimpleData, TypedData,
};
use crate::archive::{Archive, ArchiveBinary, ArchiveFlags, ArchiveResult, ArchiveXml};
use crate::object::{copy_ref, refs_equal, ObjectHandle, ObjectPtr};
use crate::rbtree::SortedMap;
use crate::visitor::{visit_reference, Visitor};

fn describe(reference: &Option<ObjectPtr>) -> String {
    match reference {
        Some(object) => match object.try_read() {
            Some(object) => object.class().name().to_string(),
            None => "<locked>".to_string(),
        },
        None => "null".to_string(),
    }
}

/// Data binding for `Option<ObjectPtr>`
#[derive(Default)]
pub struct PointerData {
    data: DataPtr<Option<ObjectPtr>>,
}

impl TypedData for PointerData {
    type Value = Option<ObjectPtr>;

    fn with_value(value: Option<ObjectPtr>) -> Self {
        Self {
            data: DataPtr::new(value),
        }
    }

    fn value(&self) -> &Option<ObjectPtr> {
        self.data.get()
    }

    fn value_mut(&mut self) -> &mut Option<ObjectPtr> {
        self.data.get_mut()
    }
}

impl DataValue for Option<ObjectPtr> {
    type Data = PointerData;

    fn data_class() -> DataClass {
        DataClass::Pointer
    }
}

impl PointerData {
    fn read_from<'c, A: Archive<'c>>(&mut self, archive: &mut A) -> ArchiveResult<()> {
        let objects = archive.deserialize_objects(ArchiveFlags::SPARSE)?;
        self.data.set(objects.into_iter().next().flatten());
        Ok(())
    }
}

impl Data for PointerData {
    data_plumbing!();

    fn data_class(&self) -> DataClass {
        DataClass::Pointer
    }

    fn set(&mut self, src: &dyn Data, flags: DataFlags) -> bool {
        match src.downcast_ref::<Self>() {
            Some(src) => {
                let copy = copy_ref(src.data.get(), flags);
                self.data.set(copy);
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn Data) -> bool {
        other
            .downcast_ref::<Self>()
            .is_some_and(|other| refs_equal(self.data.get(), other.data.get()))
    }

    fn clone_data(&self) -> Box<dyn Data> {
        Box::new(Self::with_value(self.data.get().clone()))
    }

    fn serialize_binary(&self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        archive.serialize_objects(std::slice::from_ref(self.data.get()))
    }

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        self.read_from(archive)
    }

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        archive.serialize_objects(std::slice::from_ref(self.data.get()))
    }

    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        self.read_from(archive)
    }

    fn to_text(&self) -> String {
        describe(self.data.get())
    }

    fn from_text(&mut self, _text: &str) -> bool {
        false
    }

    fn accept(&mut self, visitor: &mut dyn Visitor) {
        if let Some(object) = self.data.get_mut() {
            visit_reference(object, visitor);
        }
    }
}

/// Data binding for `Vec<Option<ObjectPtr>>`
///
/// Null entries are kept in place when archived.
#[derive(Default)]
pub struct ObjectDynArrayData {
    data: DataPtr<Vec<Option<ObjectPtr>>>,
}

impl TypedData for ObjectDynArrayData {
    type Value = Vec<Option<ObjectPtr>>;

    fn with_value(value: Vec<Option<ObjectPtr>>) -> Self {
        Self {
            data: DataPtr::new(value),
        }
    }

    fn value(&self) -> &Vec<Option<ObjectPtr>> {
        self.data.get()
    }

    fn value_mut(&mut self) -> &mut Vec<Option<ObjectPtr>> {
        self.data.get_mut()
    }
}

impl DataValue for Vec<Option<ObjectPtr>> {
    type Data = ObjectDynArrayData;

    fn data_class() -> DataClass {
        DataClass::ObjectDynArray
    }
}

impl Data for ObjectDynArrayData {
    data_plumbing!();

    fn data_class(&self) -> DataClass {
        DataClass::ObjectDynArray
    }

    fn set(&mut self, src: &dyn Data, flags: DataFlags) -> bool {
        match src.downcast_ref::<Self>() {
            Some(src) => {
                let copy = src
                    .data
                    .get()
                    .iter()
                    .map(|item| copy_ref(item, flags))
                    .collect();
                self.data.set(copy);
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
        a.len() == b.len() && a.iter().zip(b).all(|(a, b)| refs_equal(a, b))
    }

    fn clone_data(&self) -> Box<dyn Data> {
        Box::new(Self::with_value(self.data.get().clone()))
    }

    fn serialize_binary(&self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        archive.serialize_objects(self.data.get())
    }

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        let objects = archive.deserialize_objects(ArchiveFlags::SPARSE)?;
        self.data.set(objects);
        Ok(())
    }

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        archive.serialize_objects(self.data.get())
    }

    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        let objects = archive.deserialize_objects(ArchiveFlags::SPARSE)?;
        self.data.set(objects);
        Ok(())
    }

    fn to_text(&self) -> String {
        let names: Vec<String> = self.data.get().iter().map(describe).collect();
        names.join("\n")
    }

    fn from_text(&mut self, _text: &str) -> bool {
        false
    }

    fn accept(&mut self, visitor: &mut dyn Visitor) {
        for object in self.data.get_mut().iter_mut().flatten() {
            visit_reference(object, visitor);
        }
    }

    fn should_serialize(&self) -> bool {
        !self.data.get().is_empty()
    }

    fn as_container(&self) -> Option<ContainerRef<'_>> {
        Some(ContainerRef::Array(self))
    }

    fn as_container_mut(&mut self) -> Option<ContainerMut<'_>> {
        Some(ContainerMut::Array(self))
    }
}

impl ContainerData for ObjectDynArrayData {
    fn len(&self) -> usize {
        self.data.get().len()
    }

    fn clear(&mut self) {
        self.data.get_mut().clear();
    }
}

impl ArrayContainer for ObjectDynArrayData {
    fn item_class(&self) -> DataClass {
        DataClass::Pointer
    }

    fn item(&self, index: usize) -> Option<Box<dyn Data>> {
        self.data.get().get(index).cloned().map(create_with)
    }

    fn set_item(&mut self, index: usize, value: &dyn Data) -> bool {
        let Some(value) = value.downcast_ref::<PointerData>() else {
            return false;
        };
        match self.data.get_mut().get_mut(index) {
            Some(slot) => {
                *slot = value.value().clone();
                true
            }
            None => false,
        }
    }

    fn insert_item(&mut self, index: usize, value: &dyn Data) -> bool {
        let Some(value) = value.downcast_ref::<PointerData>() else {
            return false;
        };
        let items = self.data.get_mut();
        if index > items.len() {
            return false;
        }
        items.insert(index, value.value().clone());
        true
    }

    fn remove_item(&mut self, index: usize) -> bool {
        let items = self.data.get_mut();
        if index >= items.len() {
            return false;
        }
        items.remove(index);
        true
    }

    fn resize(&mut self, len: usize) {
        self.data.get_mut().resize(len, None);
    }

    fn move_up(&mut self, selected: &mut BTreeSet<usize>) {
        move_up(self.data.get_mut(), selected);
    }

    fn move_down(&mut self, selected: &mut BTreeSet<usize>) {
        move_down(self.data.get_mut(), selected);
    }
}

/// Data binding for `HashSet<ObjectHandle>`
#[derive(Default)]
pub struct ObjectSetData {
    data: DataPtr<HashSet<ObjectHandle>>,
}

impl TypedData for ObjectSetData {
    type Value = HashSet<ObjectHandle>;

    fn with_value(value: HashSet<ObjectHandle>) -> Self {
        Self {
            data: DataPtr::new(value),
        }
    }

    fn value(&self) -> &HashSet<ObjectHandle> {
        self.data.get()
    }

    fn value_mut(&mut self) -> &mut HashSet<ObjectHandle> {
        self.data.get_mut()
    }
}

impl DataValue for HashSet<ObjectHandle> {
    type Data = ObjectSetData;

    fn data_class() -> DataClass {
        DataClass::ObjectSet
    }
}

impl ObjectSetData {
    fn members(&self) -> Vec<Option<ObjectPtr>> {
        self.data
            .get()
            .iter()
            .map(|handle| Some(handle.0.clone()))
            .collect()
    }

    fn replace(&mut self, objects: Vec<Option<ObjectPtr>>) {
        let set = self.data.get_mut();
        set.clear();
        set.extend(objects.into_iter().flatten().map(ObjectHandle));
    }
}

impl Data for ObjectSetData {
    data_plumbing!();

    fn data_class(&self) -> DataClass {
        DataClass::ObjectSet
    }

    fn set(&mut self, src: &dyn Data, flags: DataFlags) -> bool {
        match src.downcast_ref::<Self>() {
            Some(src) => {
                let copies = src
                    .members()
                    .iter()
                    .map(|member| copy_ref(member, flags))
                    .collect();
                self.replace(copies);
                true
            }
            None => false,
        }
    }

    fn equals(&self, other: &dyn Data) -> bool {
        let Some(other) = other.downcast_ref::<Self>() else {
            return false;
        };
        let (a, b) = (self.members(), other.members());
        if a.len() != b.len() {
            return false;
        }
        let mut paired = vec![false; b.len()];
        a.iter().all(|member| {
            let partner = b
                .iter()
                .enumerate()
                .position(|(i, candidate)| !paired[i] && refs_equal(member, candidate));
            match partner {
                Some(i) => {
                    paired[i] = true;
                    true
                }
                None => false,
            }
        })
    }

    fn clone_data(&self) -> Box<dyn Data> {
        Box::new(Self::with_value(self.data.get().clone()))
    }

    fn serialize_binary(&self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        archive.serialize_objects(&self.members())
    }

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        let objects = archive.deserialize_objects(ArchiveFlags::empty())?;
        self.replace(objects);
        Ok(())
    }

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        archive.serialize_objects(&self.members())
    }

    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        let objects = archive.deserialize_objects(ArchiveFlags::empty())?;
        self.replace(objects);
        Ok(())
    }

    fn to_text(&self) -> String {
        let names: Vec<String> = self.members().iter().map(describe).collect();
        names.join("\n")
    }

    fn from_text(&mut self, _text: &str) -> bool {
        false
    }

    fn accept(&mut self, visitor: &mut dyn Visitor) {
        let set = self.data.get_mut();
        let members: Vec<ObjectHandle> = set.drain().collect();
        for mut member in members {
            visit_reference(&mut member.0, visitor);
            set.insert(member);
        }
    }

    fn should_serialize(&self) -> bool {
        !self.data.get().is_empty()
    }

    fn as_container(&self) -> Option<ContainerRef<'_>> {
        Some(ContainerRef::Set(self))
    }

    fn as_container_mut(&mut self) -> Option<ContainerMut<'_>> {
        Some(ContainerMut::Set(self))
    }
}

impl ContainerData for ObjectSetData {
    fn len(&self) -> usize {
        self.data.get().len()
    }

    fn clear(&mut self) {
        self.data.get_mut().clear();
    }
}

/// The referenced object of a pointer binding
fn referenced(value: &dyn Data) -> Option<ObjectHandle> {
    let value = value.downcast_ref::<PointerData>()?;
    value.value().clone().map(ObjectHandle)
}

impl SetContainer for ObjectSetData {
    fn item_class(&self) -> DataClass {
        DataClass::Pointer
    }

    /// Null references are not members
    fn add_item(&mut self, value: &dyn Data) -> bool {
        match referenced(value) {
            Some(handle) => {
                self.data.get_mut().insert(handle);
                true
            }
            None => false,
        }
    }

    fn remove_item(&mut self, value: &dyn Data) -> bool {
        referenced(value).is_some_and(|handle| self.data.get_mut().remove(&handle))
    }

    fn contains_item(&self, value: &dyn Data) -> bool {
        referenced(value).is_some_and(|handle| self.data.get().contains(&handle))
    }

    fn items(&self) -> Vec<Box<dyn Data>> {
        self.members().into_iter().map(create_with).collect()
    }
}

/// Data binding for maps from scalar keys to object references
pub struct ObjectMapData<K: Key, M: MapStorage<K, Option<ObjectPtr>> = HashMap<K, Option<ObjectPtr>>>
{
    data: DataPtr<M>,
    _key: PhantomData<fn() -> K>,
}

/// Data binding for [`SortedMap`] of object references
pub type ObjectSortedMapData<K> = ObjectMapData<K, SortedMap<K, Option<ObjectPtr>>>;

impl<K: Key, M: MapStorage<K, Option<ObjectPtr>>> Default for ObjectMapData<K, M> {
    fn default() -> Self {
        Self {
            data: DataPtr::default(),
            _key: PhantomData,
        }
    }
}

impl<K: Key, M: MapStorage<K, Option<ObjectPtr>>> TypedData for ObjectMapData<K, M> {
    type Value = M;

    fn with_value(value: M) -> Self {
        Self {
            data: DataPtr::new(value),
            _key: PhantomData,
        }
    }

    fn value(&self) -> &M {
        self.data.get()
    }

    fn value_mut(&mut self) -> &mut M {
        self.data.get_mut()
    }
}

impl<K: Key> DataValue for HashMap<K, Option<ObjectPtr>> {
    type Data = ObjectMapData<K, HashMap<K, Option<ObjectPtr>>>;

    fn data_class() -> DataClass {
        DataClass::ObjectMap(K::KIND)
    }
}

impl<K: Key> DataValue for SortedMap<K, Option<ObjectPtr>> {
    type Data = ObjectMapData<K, SortedMap<K, Option<ObjectPtr>>>;

    fn data_class() -> DataClass {
        DataClass::ObjectSortedMap(K::KIND)
    }
}

impl<K: Key, M: MapStorage<K, Option<ObjectPtr>>> ObjectMapData<K, M> {
    fn replace(&mut self, pairs: Vec<(K, Option<ObjectPtr>)>) {
        let map = self.data.get_mut();
        map.clear();
        for (key, value) in pairs {
            map.insert(key, value);
        }
    }
}

impl<K: Key, M: MapStorage<K, Option<ObjectPtr>>> Data for ObjectMapData<K, M> {
    data_plumbing!();

    fn data_class(&self) -> DataClass {
        if M::SORTED {
            DataClass::ObjectSortedMap(K::KIND)
        } else {
            DataClass::ObjectMap(K::KIND)
        }
    }

    fn set(&mut self, src: &dyn Data, flags: DataFlags) -> bool {
        match src.downcast_ref::<Self>() {
            Some(src) => {
                let pairs = src
                    .data
                    .get()
                    .entries()
                    .into_iter()
                    .map(|(key, value)| (key.clone(), copy_ref(value, flags)))
                    .collect();
                self.replace(pairs);
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
                .all(|(key, value)| b.get(key).is_some_and(|other| refs_equal(value, other)))
    }

    fn clone_data(&self) -> Box<dyn Data> {
        Box::new(Self::with_value(self.data.get().clone()))
    }

    fn serialize_binary(&self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        serialize_pairs(archive, self.data.get().entries())
    }

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        let pairs = deserialize_pairs::<_, K, Option<ObjectPtr>>(archive)?;
        self.replace(pairs);
        Ok(())
    }

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        serialize_pairs(archive, self.data.get().entries())
    }

    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        let pairs = deserialize_pairs::<_, K, Option<ObjectPtr>>(archive)?;
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
                out.push_str(&describe(value));
                out
            })
            .collect();
        lines.join("\n")
    }

    fn from_text(&mut self, _text: &str) -> bool {
        false
    }

    fn accept(&mut self, visitor: &mut dyn Visitor) {
        self.data.get_mut().for_each_value_mut(&mut |_, value| {
            if let Some(object) = value {
                visit_reference(object, visitor);
            }
        });
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

impl<K: Key, M: MapStorage<K, Option<ObjectPtr>>> ContainerData for ObjectMapData<K, M> {
    fn len(&self) -> usize {
        self.data.get().len()
    }

    fn clear(&mut self) {
        self.data.get_mut().clear();
    }
}

impl<K: Key, M: MapStorage<K, Option<ObjectPtr>>> MapContainer for ObjectMapData<K, M> {
    fn key_class(&self) -> DataClass {
        DataClass::Scalar(K::KIND)
    }

    fn value_class(&self) -> DataClass {
        DataClass::Pointer
    }

    fn get_item(&self, key: &dyn Data) -> Option<Box<dyn Data>> {
        let key = key.downcast_ref::<SimpleData<K>>()?;
        self.data.get().get(key.get()).cloned().map(create_with)
    }

    fn set_item(&mut self, key: &dyn Data, value: &dyn Data) -> bool {
        let (Some(key), Some(value)) = (
            key.downcast_ref::<SimpleData<K>>(),
            value.downcast_ref::<PointerData>(),
        ) else {
            return false;
        };
        self.data
            .get_mut()
            .insert(key.get().clone(), value.value().clone());
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
