//! Data bindings
//!
//! A [`Data`] is a type-erased handle over one value. It either owns the value
//! (standalone) or is connected to a field inside an object or structure, and
//! it knows how to copy, compare, convert, and archive that value.
//!
//! Every bindable Rust type implements [`DataValue`], which names the concrete
//! Data type used to wrap it:
//!
//! ```ignore
//! let mut count = 3u32;
//! let mut data = helium_reflect::data::bind(&mut count);
//! data.from_text("42");
//! drop(data);
//! assert_eq!(count, 42);
//! ```

// Forwards the connection methods of a Data type to its `data: DataPtr<_>` field
macro_rules! data_plumbing {
    () => {
        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
            self
        }

        unsafe fn connect(&mut self, target: ::std::ptr::NonNull<u8>) {
            self.data.connect(target.cast())
        }

        fn disconnect(&mut self) {
            self.data.disconnect()
        }

        fn is_connected(&self) -> bool {
            self.data.is_connected()
        }

        fn reset(&mut self) {
            self.data.reset()
        }
    };
}

mod builtin;
mod cast;
mod class;
mod container;
mod dyn_array;
mod map;
mod object;
mod pointer;
mod scalar;
mod set;
mod structure;

use std::any::Any;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use bitflags::bitflags;

use crate::archive::{ArchiveBinary, ArchiveResult, ArchiveXml};
use crate::visitor::Visitor;

pub use builtin::*;
pub use cast::{CastFn, CastTable};
pub use class::{ContainerKind, DataClass, ScalarKind};
pub use container::{
    ArrayContainer, ContainerData, ContainerMut, ContainerRef, MapContainer, MapStorage,
    SetContainer, SetStorage,
};
pub use dyn_array::DynArrayData;
pub use map::{MapData, SortedMapData};
pub use object::{
    ObjectDynArrayData, ObjectMapData, ObjectSetData, ObjectSortedMapData, PointerData,
};
pub use pointer::DataPtr;
pub use scalar::{Key, Readable, Scalar, SimpleData, Writable};
pub use set::{SetData, SortedSetData};
pub use structure::StructureData;

pub(crate) use builtin::register_builtin_data;
pub(crate) use cast::{cast_supported, cast_value};
pub(crate) use container::{
    deserialize_pairs, deserialize_values, quote_entry, serialize_items, serialize_pairs,
};

bitflags! {
    /// Options for [`Data::set`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DataFlags: u32 {
        /// Share object references instead of deep-copying the objects
        const SHALLOW = 1 << 0;
    }
}

/// Type-erased binding over one value
pub trait Data: Any + 'static {
    fn data_class(&self) -> DataClass;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Point this binding at external storage
    ///
    /// # Safety
    /// `target` must point to a live value of this binding's Rust type and
    /// stay valid until [`disconnect`](Data::disconnect). If the storage was
    /// only borrowed shared, the binding must not be written while connected.
    unsafe fn connect(&mut self, target: NonNull<u8>);

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    /// Disconnect and return the owned value to its default
    fn reset(&mut self);

    /// Copy the value of `src`, which must have the same class
    ///
    /// Returns `false` if the classes differ. Object-holding variants deep-copy
    /// referenced objects unless `flags` contains [`DataFlags::SHALLOW`].
    fn set(&mut self, src: &dyn Data, flags: DataFlags) -> bool;

    /// Value equality; objects are compared field by field
    fn equals(&self, other: &dyn Data) -> bool;

    /// Standalone copy of the current value
    fn clone_data(&self) -> Box<dyn Data>;

    fn serialize_binary(&self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()>;

    fn deserialize_binary(&mut self, archive: &mut ArchiveBinary<'_>) -> ArchiveResult<()>;

    fn serialize_xml(&self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()>;

    /// Read the value from the archive's current element
    fn deserialize_xml(&mut self, archive: &mut ArchiveXml<'_>) -> ArchiveResult<()>;

    fn to_text(&self) -> String;

    /// Parse a value from text, leaving the value untouched on failure
    fn from_text(&mut self, text: &str) -> bool;

    /// Walk object references held by this value
    fn accept(&mut self, _visitor: &mut dyn Visitor) {}

    /// Whether an archive should write this value (empty containers are skipped)
    fn should_serialize(&self) -> bool {
        true
    }

    fn as_container(&self) -> Option<ContainerRef<'_>> {
        None
    }

    fn as_container_mut(&mut self) -> Option<ContainerMut<'_>> {
        None
    }
}

impl dyn Data {
    pub fn downcast_ref<T: Data>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Data>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    pub fn is<T: Data>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// A Data type with typed access to its value
pub trait TypedData: Data + Sized {
    type Value;

    fn with_value(value: Self::Value) -> Self;

    fn value(&self) -> &Self::Value;

    fn value_mut(&mut self) -> &mut Self::Value;
}

/// A Rust type that can be bound by a Data
pub trait DataValue: Clone + 'static {
    type Data: TypedData<Value = Self> + Default;

    fn data_class() -> DataClass;
}

/// New standalone Data holding a default `T`
pub fn create<T: DataValue>() -> Box<dyn Data> {
    Box::new(T::Data::default())
}

/// New standalone Data holding `value`
pub fn create_with<T: DataValue>(value: T) -> Box<dyn Data> {
    Box::new(T::Data::with_value(value))
}

/// Bind a Data to `value` for the lifetime of the borrow
pub fn bind<T: DataValue>(value: &mut T) -> Bound<'_> {
    let mut data = create::<T>();
    // SAFETY: the Bound guard holds the exclusive borrow and disconnects on drop
    unsafe { data.connect(NonNull::from(value).cast()) };
    Bound::new(data, None)
}

/// Read-only binding to `value`
pub fn bind_ref<T: DataValue>(value: &T) -> BoundRef<'_> {
    let mut data = create::<T>();
    // SAFETY: BoundRef only hands out shared access to the Data
    unsafe { data.connect(NonNull::from(value).cast()) };
    BoundRef::new(data)
}

/// Field a binding was created from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    pub name: &'static str,
    pub index: usize,
}

/// A Data connected to borrowed storage, disconnected on drop
pub struct Bound<'a> {
    data: Box<dyn Data>,
    field: Option<FieldRef>,
    _target: PhantomData<&'a mut ()>,
}

impl Bound<'_> {
    pub(crate) fn new(data: Box<dyn Data>, field: Option<FieldRef>) -> Self {
        Self {
            data,
            field,
            _target: PhantomData,
        }
    }

    /// The reflected field this binding targets, if it came from one
    pub fn field(&self) -> Option<FieldRef> {
        self.field
    }
}

impl Deref for Bound<'_> {
    type Target = dyn Data;

    fn deref(&self) -> &Self::Target {
        &*self.data
    }
}

impl DerefMut for Bound<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.data
    }
}

impl Drop for Bound<'_> {
    fn drop(&mut self) {
        self.data.disconnect();
    }
}

/// A Data connected to shared storage
pub struct BoundRef<'a> {
    data: Box<dyn Data>,
    _target: PhantomData<&'a ()>,
}

impl BoundRef<'_> {
    pub(crate) fn new(data: Box<dyn Data>) -> Self {
        Self {
            data,
            _target: PhantomData,
        }
    }
}

impl Deref for BoundRef<'_> {
    type Target = dyn Data;

    fn deref(&self) -> &Self::Target {
        &*self.data
    }
}

impl Drop for BoundRef<'_> {
    fn drop(&mut self) {
        self.data.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_writes_through() {
        let mut count = 3u32;
        {
            let mut data = bind(&mut count);
            assert!(data.is_connected());
            assert!(data.from_text("42"));
        }
        assert_eq!(count, 42);
    }

    #[test]
    fn test_standalone_data() {
        let mut data = create::<String>();
        assert!(!data.is_connected());
        assert_eq!(data.data_class(), DataClass::Scalar(ScalarKind::String));
        assert!(data.from_text("hello"));
        assert_eq!(data.to_text(), "hello");
    }

    #[test]
    fn test_set_requires_same_class() {
        let source = create_with(7i32);
        let mut same = create::<i32>();
        let mut other = create::<u8>();

        assert!(same.set(&*source, DataFlags::empty()));
        assert!(same.equals(&*source));
        assert!(!other.set(&*source, DataFlags::empty()));
    }

    #[test]
    fn test_bind_ref_reads() {
        let names = vec!["a".to_string(), "b".to_string()];
        let data = bind_ref(&names);
        assert_eq!(data.data_class(), DataClass::DynArray(ScalarKind::String));
        assert_eq!(data.to_text(), "a\nb");
    }
}
