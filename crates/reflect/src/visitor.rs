//! Object graph visitation
//!
//! A [`Visitor`] walks the objects reachable from a root through reflected
//! fields. Only fields whose class may hold objects are bound; every object
//! reference is offered to [`Visitor::visit_pointer`], which decides whether
//! the walk descends into it (and may replace the reference).
//!
//! References are entered through a write lock. An object already locked by
//! the current walk is not entered again, so cycles end the descent instead of
//! deadlocking.

use std::collections::HashSet;
use std::ptr::NonNull;

use tracing::trace;

use crate::object::{Object, ObjectPtr};
use crate::registry::{Composite, Field};

/// Callbacks raised while walking an object graph
pub trait Visitor {
    /// Called when an object is entered; `false` skips its fields
    fn visit_object(&mut self, _object: &mut dyn Object) -> bool {
        true
    }

    /// Called for each object-holding field; `false` skips the field
    fn visit_field(&mut self, _field: &Field) -> bool {
        true
    }

    /// Called for each held reference; `true` descends into the object
    fn visit_pointer(&mut self, object: &mut ObjectPtr) -> bool;
}

impl dyn Object {
    /// Walk this object's fields with `visitor`
    pub fn accept(&mut self, visitor: &mut dyn Visitor) {
        if !visitor.visit_object(self) {
            return;
        }
        let class = self.class();
        // SAFETY: `self` is borrowed exclusively and described by its class
        unsafe { walk_composite(class, self.instance_ptr_mut(), visitor) }
    }
}

/// Offer `object` to the visitor and descend into it when accepted
pub fn visit_reference(object: &mut ObjectPtr, visitor: &mut dyn Visitor) {
    if !visitor.visit_pointer(object) {
        return;
    }
    match object.try_write() {
        Some(mut guard) => guard.accept(visitor),
        None => trace!("Skipping object locked by the current walk"),
    }
}

/// Walk every object reachable from `roots`, the roots included
pub fn walk(roots: &mut [ObjectPtr], visitor: &mut dyn Visitor) {
    for root in roots {
        visit_reference(root, visitor);
    }
}

/// Bind the object-holding fields of an instance and let them accept `visitor`
///
/// # Safety
/// `instance` must point to a live instance described by `composite`,
/// borrowed exclusively.
pub(crate) unsafe fn walk_composite(
    composite: &'static Composite,
    instance: NonNull<u8>,
    visitor: &mut dyn Visitor,
) {
    for field in composite.fields() {
        if !field.data_class().may_hold_objects() || !visitor.visit_field(field) {
            continue;
        }
        let mut data = field.bind_raw(instance);
        data.accept(visitor);
    }
}

/// Collects every reachable object whose class is exactly `class`
#[derive(Debug)]
pub struct FindByTypeVisitor {
    class: &'static Composite,
    found: Vec<ObjectPtr>,
}

impl FindByTypeVisitor {
    pub fn new(class: &'static Composite) -> Self {
        Self {
            class,
            found: Vec::new(),
        }
    }

    pub fn found(&self) -> &[ObjectPtr] {
        &self.found
    }

    pub fn into_found(self) -> Vec<ObjectPtr> {
        self.found
    }
}

impl Visitor for FindByTypeVisitor {
    fn visit_pointer(&mut self, object: &mut ObjectPtr) -> bool {
        let Some(guard) = object.try_read() else {
            return false;
        };
        if std::ptr::eq(guard.class(), self.class) {
            self.found.push(object.clone());
        }
        true
    }
}

/// Collects every reachable object whose class is one of a set
#[derive(Debug, Default)]
pub struct FindByTypeSetVisitor {
    classes: HashSet<u32>,
    found: Vec<ObjectPtr>,
}

impl FindByTypeSetVisitor {
    pub fn new(classes: impl IntoIterator<Item = &'static Composite>) -> Self {
        Self {
            classes: classes.into_iter().map(Composite::hash).collect(),
            found: Vec::new(),
        }
    }

    pub fn found(&self) -> &[ObjectPtr] {
        &self.found
    }

    pub fn into_found(self) -> Vec<ObjectPtr> {
        self.found
    }
}

impl Visitor for FindByTypeSetVisitor {
    fn visit_pointer(&mut self, object: &mut ObjectPtr) -> bool {
        let Some(guard) = object.try_read() else {
            return false;
        };
        if self.classes.contains(&guard.class().hash()) {
            self.found.push(object.clone());
        }
        true
    }
}

/// Objects reachable from `root` (itself included) of exactly `class`
pub fn find_by_type(root: &ObjectPtr, class: &'static Composite) -> Vec<ObjectPtr> {
    let mut visitor = FindByTypeVisitor::new(class);
    visit_reference(&mut root.clone(), &mut visitor);
    visitor.into_found()
}

/// Objects reachable from `root` (itself included) whose class is in `classes`
pub fn find_by_type_set(
    root: &ObjectPtr,
    classes: impl IntoIterator<Item = &'static Composite>,
) -> Vec<ObjectPtr> {
    let mut visitor = FindByTypeSetVisitor::new(classes);
    visit_reference(&mut root.clone(), &mut visitor);
    visitor.into_found()
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::mem::offset_of;
    use std::sync::OnceLock;

    use super::*;
    use crate::object::{object_ptr, ptr_eq};
    use crate::registry::{CompositeKind, FieldFlags, Reflect};

    #[derive(Default)]
    struct Group {
        name: String,
        children: Vec<Option<ObjectPtr>>,
    }

    #[derive(Default)]
    struct Leaf {
        value: u32,
    }

    impl Reflect for Group {
        fn composite() -> &'static Composite {
            static COMPOSITE: OnceLock<Composite> = OnceLock::new();
            COMPOSITE.get_or_init(|| {
                Composite::builder::<Group>("Group", CompositeKind::Class)
                    .field::<String>("name", offset_of!(Group, name), FieldFlags::empty())
                    .field::<Vec<Option<ObjectPtr>>>(
                        "children",
                        offset_of!(Group, children),
                        FieldFlags::empty(),
                    )
                    .creator(|| object_ptr(Group::default()))
                    .build()
            })
        }
    }

    impl Reflect for Leaf {
        fn composite() -> &'static Composite {
            static COMPOSITE: OnceLock<Composite> = OnceLock::new();
            COMPOSITE.get_or_init(|| {
                Composite::builder::<Leaf>("Leaf", CompositeKind::Class)
                    .field::<u32>("value", offset_of!(Leaf, value), FieldFlags::empty())
                    .creator(|| object_ptr(Leaf::default()))
                    .build()
            })
        }
    }

    macro_rules! impl_object {
        ($($ty:ty),*) => {$(
            impl Object for $ty {
                fn class(&self) -> &'static Composite {
                    <$ty>::composite()
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn Any {
                    self
                }
            }
        )*};
    }

    impl_object!(Group, Leaf);

    fn tree() -> ObjectPtr {
        let inner = Group {
            name: "inner".into(),
            children: vec![Some(object_ptr(Leaf { value: 2 })), None],
        };
        object_ptr(Group {
            name: "root".into(),
            children: vec![Some(object_ptr(Leaf { value: 1 })), Some(object_ptr(inner))],
        })
    }

    #[test]
    fn test_find_by_type() {
        let root = tree();
        let leaves = find_by_type(&root, Leaf::composite());
        let values: Vec<u32> = leaves
            .iter()
            .map(|leaf| leaf.read().downcast_ref::<Leaf>().unwrap().value)
            .collect();
        assert_eq!(values, vec![1, 2]);

        let groups = find_by_type(&root, Group::composite());
        assert_eq!(groups.len(), 2);
        assert!(ptr_eq(&groups[0], &root));
    }

    #[test]
    fn test_find_by_type_set() {
        let root = tree();
        let all = find_by_type_set(&root, [Leaf::composite(), Group::composite()]);
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_pointer_pruning() {
        struct Count(usize);

        impl Visitor for Count {
            fn visit_pointer(&mut self, _object: &mut ObjectPtr) -> bool {
                self.0 += 1;
                // Only the root is entered
                self.0 == 1
            }
        }

        let mut count = Count(0);
        walk(&mut [tree()], &mut count);
        assert_eq!(count.0, 3);
    }

    #[test]
    fn test_pointer_replacement() {
        struct Swap;

        impl Visitor for Swap {
            fn visit_pointer(&mut self, object: &mut ObjectPtr) -> bool {
                let is_leaf = object.read().downcast_ref::<Leaf>().is_some();
                if is_leaf {
                    *object = object_ptr(Leaf { value: 7 });
                    return false;
                }
                true
            }
        }

        let root = tree();
        visit_reference(&mut root.clone(), &mut Swap);
        let values: Vec<u32> = find_by_type(&root, Leaf::composite())
            .iter()
            .map(|leaf| leaf.read().downcast_ref::<Leaf>().unwrap().value)
            .collect();
        assert_eq!(values, vec![7, 7]);
    }

    #[test]
    fn test_cycle_terminates() {
        let root = object_ptr(Group::default());
        root.write()
            .downcast_mut::<Group>()
            .unwrap()
            .children
            .push(Some(root.clone()));

        assert_eq!(find_by_type(&root, Group::composite()).len(), 1);
        root.write().downcast_mut::<Group>().unwrap().children.clear();
    }
}
