//! Composite type descriptions
//!
//! A [`Composite`] describes a reflected class or structure: its name, base,
//! and the ordered list of fields with their byte offsets. Composites are
//! built once per type, normally by `#[derive(Reflect)]`, and live for the
//! whole program.

use std::any::TypeId;
use std::fmt;
use std::ptr::NonNull;

use bitflags::bitflags;

use crate::data::{
    create, Bound, BoundRef, Data, DataClass, DataFlags, DataValue, FieldRef,
};
use crate::hash::hash_str;
use crate::object::{Object, ObjectPtr};

bitflags! {
    /// Per-field archive behavior
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FieldFlags: u32 {
        /// Never written to archives
        const DISCARD = 1 << 0;
        /// Written even when the value reports nothing to serialize
        const FORCE = 1 << 1;
        /// Holds a nested structure; set automatically
        const STRUCTURE = 1 << 2;
    }
}

/// Whether a composite is an object class or a value structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Class,
    Structure,
}

/// Implemented by every reflected type
pub trait Reflect: 'static {
    fn composite() -> &'static Composite;
}

/// One reflected field of a composite
#[derive(Debug, Clone)]
pub struct Field {
    name: &'static str,
    index: usize,
    offset: usize,
    data_class: DataClass,
    flags: FieldFlags,
    create: fn() -> Box<dyn Data>,
}

impl Field {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Position within the owning composite, bases first
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Byte offset from the start of the owning instance
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn data_class(&self) -> DataClass {
        self.data_class
    }

    #[inline]
    pub fn flags(&self) -> FieldFlags {
        self.flags
    }

    pub(crate) fn creator(&self) -> fn() -> Box<dyn Data> {
        self.create
    }

    /// New standalone Data of this field's class
    pub fn create_data(&self) -> Box<dyn Data> {
        (self.create)()
    }

    pub(crate) fn field_ref(&self) -> FieldRef {
        FieldRef {
            name: self.name,
            index: self.index,
        }
    }

    /// Data connected to this field inside `instance`
    ///
    /// # Safety
    /// `instance` must point to a live instance of the composite this field
    /// belongs to, valid for as long as the returned Data stays connected. The
    /// Data must not be written unless the instance is borrowed exclusively.
    pub unsafe fn bind_raw(&self, instance: NonNull<u8>) -> Box<dyn Data> {
        let mut data = (self.create)();
        data.connect(instance.add(self.offset));
        data
    }

    /// Bind this field of `object` for reading and writing
    ///
    /// # Panics
    /// If the field does not belong to the object's class.
    pub fn bind<'a>(&self, object: &'a mut dyn Object) -> Bound<'a> {
        self.check_owner(&*object);
        // SAFETY: the field belongs to the object's class, and the guard keeps
        // the exclusive borrow alive while connected
        let data = unsafe { self.bind_raw(object.instance_ptr_mut()) };
        Bound::new(data, Some(self.field_ref()))
    }

    /// Bind this field of `object` for reading
    ///
    /// # Panics
    /// If the field does not belong to the object's class.
    pub fn bind_ref<'a>(&self, object: &'a dyn Object) -> BoundRef<'a> {
        self.check_owner(object);
        // SAFETY: the field belongs to the object's class; BoundRef only
        // exposes shared access
        let data = unsafe { self.bind_raw(object.instance_ptr()) };
        BoundRef::new(data)
    }

    fn check_owner(&self, object: &dyn Object) {
        let class = object.class();
        assert!(
            class.owns_field(self),
            "field {} does not belong to class {}",
            self.name,
            class.name()
        );
    }
}

/// Description of a reflected class or structure
pub struct Composite {
    name: &'static str,
    hash: u32,
    kind: CompositeKind,
    type_id: TypeId,
    size: usize,
    base: Option<&'static Composite>,
    fields: Vec<Field>,
    creator: Option<fn() -> ObjectPtr>,
    data_creator: Option<fn() -> Box<dyn Data>>,
}

impl Composite {
    /// Start describing `T`
    pub fn builder<T: 'static>(name: &'static str, kind: CompositeKind) -> CompositeBuilder {
        CompositeBuilder {
            composite: Composite {
                name,
                hash: hash_str(name),
                kind,
                type_id: TypeId::of::<T>(),
                size: std::mem::size_of::<T>(),
                base: None,
                fields: Vec::new(),
                creator: None,
                data_creator: None,
            },
        }
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    #[inline]
    pub fn kind(&self) -> CompositeKind {
        self.kind
    }

    #[inline]
    pub fn is_class(&self) -> bool {
        self.kind == CompositeKind::Class
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn base(&self) -> Option<&'static Composite> {
        self.base
    }

    /// All fields, inherited ones first
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Fields declared by this composite itself
    pub fn declared_fields(&self) -> &[Field] {
        let inherited = self.base.map_or(0, |base| base.fields.len());
        &self.fields[inherited..]
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Whether `field` is one of this composite's own field records
    pub fn owns_field(&self, field: &Field) -> bool {
        self.fields
            .get(field.index)
            .is_some_and(|own| std::ptr::eq(own, field))
    }

    /// The base chain, starting with the direct base
    pub fn bases(&self) -> impl Iterator<Item = &'static Composite> {
        std::iter::successors(self.base, |composite| composite.base)
    }

    /// Whether this composite is `other` or derives from it
    pub fn is_type(&self, other: &Composite) -> bool {
        std::ptr::eq(self, other) || self.bases().any(|base| std::ptr::eq(base, other))
    }

    /// New default instance, for classes with a creator
    pub fn create_instance(&self) -> Option<ObjectPtr> {
        self.creator.map(|create| create())
    }

    /// Standalone Data holding a default value, for structures
    pub fn create_data(&self) -> Option<Box<dyn Data>> {
        self.data_creator.map(|create| create())
    }

    pub(crate) fn data_creator(&self) -> Option<fn() -> Box<dyn Data>> {
        self.data_creator
    }

    /// Field-wise equality of two instances
    ///
    /// # Safety
    /// Both pointers must reference live instances described by this composite.
    pub(crate) unsafe fn instances_equal(&self, a: NonNull<u8>, b: NonNull<u8>) -> bool {
        self.fields.iter().all(|field| {
            let a = field.bind_raw(a);
            let b = field.bind_raw(b);
            a.equals(&*b)
        })
    }

    /// Copy every field from `src` into `dest`
    ///
    /// # Safety
    /// Both pointers must reference live, distinct instances described by this
    /// composite, and `dest` must be writable.
    pub(crate) unsafe fn copy_instance(&self, src: NonNull<u8>, dest: NonNull<u8>, flags: DataFlags) {
        for field in &self.fields {
            let from = field.bind_raw(src);
            let mut to = field.bind_raw(dest);
            to.set(&*from, flags);
        }
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base", &self.base.map(|base| base.name))
            .field(
                "fields",
                &self.fields.iter().map(|f| f.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder returned by [`Composite::builder`]
pub struct CompositeBuilder {
    composite: Composite,
}

impl CompositeBuilder {
    /// Inherit every field of `B`, which lives `offset` bytes into this type
    pub fn base<B: Reflect>(mut self, offset: usize) -> Self {
        let base = B::composite();
        for field in &base.fields {
            let index = self.composite.fields.len();
            self.composite.fields.push(Field {
                index,
                offset: field.offset + offset,
                ..field.clone()
            });
        }
        self.composite.base = Some(base);
        self
    }

    /// Add a field of type `T` at `offset`
    pub fn field<T: DataValue>(mut self, name: &'static str, offset: usize, flags: FieldFlags) -> Self {
        let data_class = T::data_class();
        let mut flags = flags;
        if matches!(data_class, DataClass::Structure(_)) {
            flags |= FieldFlags::STRUCTURE;
        }
        let index = self.composite.fields.len();
        self.composite.fields.push(Field {
            name,
            index,
            offset,
            data_class,
            flags,
            create: create::<T>,
        });
        self
    }

    /// Function creating default instances, for classes
    pub fn creator(mut self, creator: fn() -> ObjectPtr) -> Self {
        self.composite.creator = Some(creator);
        self
    }

    /// Function creating standalone Data, for structures
    pub fn data_creator(mut self, creator: fn() -> Box<dyn Data>) -> Self {
        self.composite.data_creator = Some(creator);
        self
    }

    pub fn build(self) -> Composite {
        let fields = &self.composite.fields;
        for (i, field) in fields.iter().enumerate() {
            debug_assert!(
                fields[..i].iter().all(|other| other.name != field.name),
                "duplicate field {} in {}",
                field.name,
                self.composite.name
            );
        }
        self.composite
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;

    #[derive(Default)]
    struct Base {
        id: u32,
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
        name: String,
        scale: f32,
    }

    impl Reflect for Base {
        fn composite() -> &'static Composite {
            static COMPOSITE: OnceLock<Composite> = OnceLock::new();
            COMPOSITE.get_or_init(|| {
                Composite::builder::<Base>("Base", CompositeKind::Structure)
                    .field::<u32>("id", std::mem::offset_of!(Base, id), FieldFlags::empty())
                    .build()
            })
        }
    }

    impl Reflect for Derived {
        fn composite() -> &'static Composite {
            static COMPOSITE: OnceLock<Composite> = OnceLock::new();
            COMPOSITE.get_or_init(|| {
                Composite::builder::<Derived>("Derived", CompositeKind::Structure)
                    .base::<Base>(std::mem::offset_of!(Derived, base))
                    .field::<String>("name", std::mem::offset_of!(Derived, name), FieldFlags::empty())
                    .field::<f32>("scale", std::mem::offset_of!(Derived, scale), FieldFlags::DISCARD)
                    .build()
            })
        }
    }

    #[test]
    fn test_fields_flattened_base_first() {
        let composite = Derived::composite();
        let names: Vec<_> = composite.fields().iter().map(Field::name).collect();
        assert_eq!(names, vec!["id", "name", "scale"]);
        assert_eq!(composite.declared_fields().len(), 2);
        assert_eq!(composite.field(1).map(Field::index), Some(1));
        assert!(composite.find_field("scale").unwrap().flags().contains(FieldFlags::DISCARD));
    }

    #[test]
    fn test_is_type_follows_base_chain() {
        assert!(Derived::composite().is_type(Base::composite()));
        assert!(!Base::composite().is_type(Derived::composite()));
        assert_eq!(Derived::composite().hash(), hash_str("Derived"));
    }

    #[test]
    fn test_base_field_offsets_adjusted() {
        let mut value = Derived::default();
        value.base.id = 17;
        let field = Derived::composite().find_field("id").unwrap();
        let data = unsafe { field.bind_raw(NonNull::from(&mut value).cast()) };
        assert_eq!(data.to_text(), "17");
    }

    #[test]
    fn test_owns_field() {
        let inherited = Derived::composite().find_field("id").unwrap();
        let original = Base::composite().find_field("id").unwrap();
        assert!(Derived::composite().owns_field(inherited));
        assert!(!Derived::composite().owns_field(original));
    }
}
