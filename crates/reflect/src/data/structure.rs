//! Nested reflected structures

use std::ptr::NonNull;

use super::{Data, DataClass, DataFlags, DataPtr, TypedData};
use crate::archive::{ArchiveBinary, ArchiveResult, ArchiveXml};
use crate::registry::Reflect;
use crate::visitor::{walk_composite, Visitor};

/// Data binding for a structure value embedded in a field
///
/// Copy, equality and archiving go field by field through the structure's
/// composite, so object references inside a structure follow the same deep or
/// shallow rules as top-level fields.
pub struct StructureData<T: Reflect + Clone + Default> {
    data: DataPtr<T>,
}

impl<T: Reflect + Clone + Default> Default for StructureData<T> {
    fn default() -> Self {
        Self {
            data: DataPtr::default(),
        }
    }
}

impl<T: Reflect + Clone + Default> StructureData<T> {
    fn ptr(&self) -> NonNull<u8> {
        NonNull::from(self.data.get()).cast()
    }

    fn ptr_mut(&mut self) -> NonNull<u8> {
        NonNull::from(self.data.get_mut()).cast()
    }
}

impl<T: Reflect + Clone + Default> TypedData for StructureData<T> {
    type Value = T;

    fn with_value(value: T) -> Self {
        Self {
            data: DataPtr::new(value),
        }
    }

    fn value(&self) -> &T {
        self.data.get()
    }

    fn value_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

impl<T: Reflect + Clone + Default> Data for StructureData<T> {
    data_plumbing!();

    fn data_class(&self) -> DataClass {
        DataClass::Structure(T::composite().name())
    }

    fn set(&mut self, src: &dyn Data, flags: DataFlags) -> bool {
        let Some(src) = src.downcast_ref::<Self>() else {
            return false;
        };
        let from = src.ptr();
        // SAFETY: both values are `T`, described by `T::composite()`, and are
        // distinct because `self` is borrowed exclusively
        unsafe { T::composite().copy_instance(from, self.ptr_mut(), flags) };
        true
    }

    fn equals(&self, other: &dyn Data) -> bool {
        let Some(other) = other.downcast_ref::<Self>() else {
            return false;
        };
        // SAFETY: both values are `T` and borrowed for the call
        unsafe { T::composite().instances_equal(self.ptr(), other.ptr()) }
    }

    fn clone_data(&self) -> Box<dyn Data> {
        Box::new(Self::with_value(self.data.get().clone()))
    }

    fn serialize_binary(&self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        // SAFETY: the value is a live `T` for the duration of the call
        unsafe { archive.serialize_composite(T::composite(), self.ptr()) }
    }

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()> {
        let ptr = self.ptr_mut();
        // SAFETY: the value is a live `T`, borrowed exclusively
        unsafe { archive.deserialize_composite(T::composite(), ptr) }
    }

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        archive.begin_block();
        // SAFETY: the value is a live `T` for the duration of the call
        unsafe { archive.serialize_composite(T::composite(), self.ptr())? };
        archive.end_block();
        Ok(())
    }

    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()> {
        let element = archive.current()?;
        let ptr = self.ptr_mut();
        // SAFETY: the value is a live `T`, borrowed exclusively
        unsafe { archive.deserialize_composite(T::composite(), ptr, &element) }
    }

    fn to_text(&self) -> String {
        let ptr = self.ptr();
        let fields: Vec<String> = T::composite()
            .fields()
            .iter()
            .map(|field| {
                // SAFETY: the field belongs to `T::composite()` and the value is live
                let data = unsafe { field.bind_raw(ptr) };
                format!("{}: {}", field.name(), data.to_text())
            })
            .collect();
        format!("{{ {} }}", fields.join(", "))
    }

    fn from_text(&mut self, _text: &str) -> bool {
        false
    }

    fn accept(&mut self, visitor: &mut dyn Visitor) {
        let ptr = self.ptr_mut();
        // SAFETY: the value is a live `T`, borrowed exclusively
        unsafe { walk_composite(T::composite(), ptr, visitor) }
    }
}
