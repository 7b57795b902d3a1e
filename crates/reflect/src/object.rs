//! Reflected objects
//!
//! An [`Object`] is an instance of a registered class. Objects are shared
//! through [`ObjectPtr`], a reference-counted lock, so archives, visitors and
//! documents can hold the same instance.
//!
//! Most types get their `Object` impl from `#[derive(Reflect)]`. Implement it
//! by hand (with `#[reflect(manual_object)]`) to receive serialization hooks:
//!
//! ```ignore
//! impl Object for Mesh {
//!     fn class(&self) -> &'static Composite { Self::composite() }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//!
//!     fn post_deserialize(&mut self) {
//!         self.rebuild_bounds();
//!     }
//! }
//! ```

use std::any::Any;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::data::DataFlags;
use crate::registry::{Composite, Field};

/// An instance of a reflected class
pub trait Object: Any + Send + Sync + 'static {
    /// The composite describing this instance's concrete class
    fn class(&self) -> &'static Composite;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn pre_serialize(&mut self) {}

    fn post_serialize(&mut self) {}

    fn pre_deserialize(&mut self) {}

    fn post_deserialize(&mut self) {}

    /// Called after a field was written through the reflection context
    fn field_changed(&mut self, _field: &Field) {}
}

/// Shared, lockable object reference
pub type ObjectPtr = Arc<RwLock<dyn Object>>;

/// Wrap an object for sharing
pub fn object_ptr<T: Object>(object: T) -> ObjectPtr {
    Arc::new(RwLock::new(object))
}

/// Identity comparison
#[inline]
pub fn ptr_eq(a: &ObjectPtr, b: &ObjectPtr) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[inline]
pub(crate) fn address_of(object: &ObjectPtr) -> usize {
    Arc::as_ptr(object) as *const () as usize
}

/// Equality of two optional references: identical, or field-wise equal
pub fn refs_equal(a: &Option<ObjectPtr>, b: &Option<ObjectPtr>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => ptr_eq(a, b) || a.read().equals(&*b.read()),
        _ => false,
    }
}

/// Copy a reference, sharing it when shallow and cloning the object otherwise
pub fn copy_ref(src: &Option<ObjectPtr>, flags: DataFlags) -> Option<ObjectPtr> {
    let src = src.as_ref()?;
    if flags.contains(DataFlags::SHALLOW) {
        return Some(src.clone());
    }
    src.read().clone_object()
}

/// Object reference hashed and compared by identity, for object sets
#[derive(Clone)]
pub struct ObjectHandle(pub ObjectPtr);

impl ObjectHandle {
    pub fn new(object: ObjectPtr) -> Self {
        Self(object)
    }

    pub fn into_inner(self) -> ObjectPtr {
        self.0
    }
}

impl Deref for ObjectHandle {
    type Target = ObjectPtr;

    fn deref(&self) -> &ObjectPtr {
        &self.0
    }
}

impl From<ObjectPtr> for ObjectHandle {
    fn from(object: ObjectPtr) -> Self {
        Self(object)
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ObjectHandle {}

impl Hash for ObjectHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        address_of(&self.0).hash(state);
    }
}

impl std::fmt::Debug for dyn Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {{ .. }}", self.class().name())
    }
}

impl std::fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ObjectHandle")
            .field(&format_args!("{:#x}", address_of(&self.0)))
            .finish()
    }
}

impl dyn Object {
    /// Whether this object's class is `composite` or derives from it
    pub fn is_type(&self, composite: &Composite) -> bool {
        self.class().is_type(composite)
    }

    pub fn downcast_ref<T: Object>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Object>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Address of the concrete instance, the base for field offsets
    pub(crate) fn instance_ptr(&self) -> NonNull<u8> {
        NonNull::from(self).cast()
    }

    pub(crate) fn instance_ptr_mut(&mut self) -> NonNull<u8> {
        NonNull::from(self).cast()
    }

    /// Field-wise equality; objects of different classes are never equal
    pub fn equals(&self, other: &dyn Object) -> bool {
        let class = self.class();
        if !std::ptr::eq(class, other.class()) {
            return false;
        }
        // SAFETY: both instances are borrowed for the duration of the call and
        // share the composite whose offsets are used
        unsafe { class.instances_equal(self.instance_ptr(), other.instance_ptr()) }
    }

    /// Copy every field from `src`, which must be of the same class
    pub fn copy_from(&mut self, src: &dyn Object, flags: DataFlags) -> bool {
        let class = self.class();
        if !std::ptr::eq(class, src.class()) {
            return false;
        }
        // SAFETY: `self` is borrowed exclusively and `src` shared; they are
        // distinct objects because both borrows are live
        unsafe { class.copy_instance(src.instance_ptr(), self.instance_ptr_mut(), flags) };
        true
    }

    /// Deep copy through the class's creator
    ///
    /// Returns `None` for classes without a creator. Referenced objects are
    /// cloned as well; cyclic graphs are not supported.
    pub fn clone_object(&self) -> Option<ObjectPtr> {
        let clone = self.class().create_instance()?;
        clone.write().copy_from(self, DataFlags::empty());
        Some(clone)
    }
}
