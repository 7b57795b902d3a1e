//! Type registry
//!
//! The [`Registry`] maps type names (and aliases) to composites and Data class
//! names to Data creators. Archives use it to turn the names they read back
//! into instances.
//!
//! Lookups are keyed by the FNV-1a hash of the name, so callers holding only a
//! hash can resolve types too. Lookups by name also compare the stored name, and
//! a name whose hash is already taken by a different name is refused.

mod composite;

use std::ptr;

use dashmap::DashMap;
use tracing::{debug, warn};

pub use composite::{Composite, CompositeBuilder, CompositeKind, Field, FieldFlags, Reflect};

use crate::data::{create, Data, DataClass, DataValue};
use crate::hash::hash_str;
use crate::object::ObjectPtr;

/// Type registry errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The name or alias already refers to a different composite
    #[error("{name} is already registered as {existing}")]
    AlreadyRegistered { name: String, existing: &'static str },

    /// No composite with that name is registered
    #[error("Type not registered: {0}")]
    NotRegistered(String),

    /// A different name already occupies the name's hash
    #[error("{name} hashes to {hash:#010x}, already used by {existing}")]
    HashCollision {
        name: String,
        existing: String,
        hash: u32,
    },
}

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// A Data class with its creator
#[derive(Debug, Clone, Copy)]
pub struct DataCreator {
    pub class: DataClass,
    pub create: fn() -> Box<dyn Data>,
}

/// A registered name or alias
#[derive(Debug, Clone)]
struct TypeEntry {
    name: String,
    composite: &'static Composite,
}

/// Name to type lookup for composites and Data classes
#[derive(Default)]
pub struct Registry {
    types: DashMap<u32, TypeEntry>,
    data: DashMap<u32, DataCreator>,
}

impl Registry {
    /// An empty registry, without built-in Data classes
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a composite, its bases, and the Data classes of its fields
    ///
    /// Registering the same composite again is a no-op.
    pub fn register_type(&self, composite: &'static Composite) -> RegistryResult<()> {
        if let Some(base) = composite.base() {
            self.register_type(base)?;
        }
        self.insert_name(composite.name(), composite)?;

        for field in composite.fields() {
            self.register_data_creator(DataCreator {
                class: field.data_class(),
                create: field.creator(),
            });
        }
        if let Some(create) = composite.data_creator() {
            self.register_data_creator(DataCreator {
                class: DataClass::Structure(composite.name()),
                create,
            });
        }
        Ok(())
    }

    /// Register `T`'s composite
    pub fn register<T: Reflect>(&self) -> RegistryResult<()> {
        self.register_type(T::composite())
    }

    /// Remove a composite and every alias that refers to it
    pub fn unregister_type(&self, composite: &'static Composite) -> bool {
        let before = self.types.len();
        self.types
            .retain(|_, entry| !ptr::eq(entry.composite, composite));
        if composite.data_creator().is_some() {
            let class = DataClass::Structure(composite.name());
            self.data
                .remove_if(&class.hash(), |_, creator| creator.class == class);
        }
        let removed = self.types.len() < before;
        if removed {
            debug!("Unregistered type {}", composite.name());
        }
        removed
    }

    /// Make `alias` resolve to `composite`
    pub fn alias_type(&self, composite: &'static Composite, alias: &str) -> RegistryResult<()> {
        self.insert_name(alias, composite)
    }

    /// Remove an alias; the composite's own name cannot be unaliased
    pub fn unalias_type(&self, alias: &str) -> bool {
        self.types
            .remove_if(&hash_str(alias), |_, entry| {
                entry.name == alias && entry.composite.name() != alias
            })
            .is_some()
    }

    fn insert_name(&self, name: &str, composite: &'static Composite) -> RegistryResult<()> {
        let hash = hash_str(name);
        match self.types.entry(hash) {
            dashmap::Entry::Occupied(entry) => {
                let existing = entry.get();
                if existing.name != name {
                    warn!(
                        "Refusing to register {}, hash {:#010x} belongs to {}",
                        name, hash, existing.name
                    );
                    return Err(RegistryError::HashCollision {
                        name: name.to_string(),
                        existing: existing.name.clone(),
                        hash,
                    });
                }
                if ptr::eq(existing.composite, composite) {
                    return Ok(());
                }
                warn!(
                    "Refusing to register {} as {}, already {}",
                    composite.name(),
                    name,
                    existing.composite.name()
                );
                Err(RegistryError::AlreadyRegistered {
                    name: name.to_string(),
                    existing: existing.composite.name(),
                })
            }
            dashmap::Entry::Vacant(entry) => {
                entry.insert(TypeEntry {
                    name: name.to_string(),
                    composite,
                });
                debug!("Registered type {} as {}", composite.name(), name);
                Ok(())
            }
        }
    }

    pub fn get_type(&self, name: &str) -> Option<&'static Composite> {
        self.types
            .get(&hash_str(name))
            .filter(|entry| entry.name == name)
            .map(|entry| entry.composite)
    }

    /// Resolve a hash read from a stream; the name is not rechecked
    pub fn get_type_by_hash(&self, hash: u32) -> Option<&'static Composite> {
        self.types.get(&hash).map(|entry| entry.composite)
    }

    pub fn get_class(&self, name: &str) -> Option<&'static Composite> {
        self.get_type(name).filter(|composite| composite.is_class())
    }

    pub fn get_structure(&self, name: &str) -> Option<&'static Composite> {
        self.get_type(name).filter(|composite| !composite.is_class())
    }

    /// Every registered composite deriving from `base`, excluding `base`
    pub fn derived_types(&self, base: &Composite) -> Vec<&'static Composite> {
        let mut derived: Vec<&'static Composite> = Vec::new();
        for entry in self.types.iter() {
            let composite = entry.value().composite;
            if !ptr::eq(composite, base)
                && composite.is_type(base)
                && !derived.iter().any(|known| ptr::eq(*known, composite))
            {
                derived.push(composite);
            }
        }
        derived.sort_by_key(|composite| composite.name());
        derived
    }

    /// Default instance of the class registered under `name`
    pub fn create_instance(&self, name: &str) -> Option<ObjectPtr> {
        self.get_class(name)?.create_instance()
    }

    /// Number of registered names, aliases included
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Register the Data class for `T`
    pub fn register_data<T: DataValue>(&self) {
        self.register_data_creator(DataCreator {
            class: T::data_class(),
            create: create::<T>,
        });
    }

    /// Register a Data creator; a class whose hash is taken by another class is dropped
    pub fn register_data_creator(&self, creator: DataCreator) {
        let entry = self.data.entry(creator.class.hash()).or_insert(creator);
        if entry.class != creator.class {
            warn!(
                "Dropping Data class {}, hash {:#010x} belongs to {}",
                creator.class,
                creator.class.hash(),
                entry.class
            );
        }
    }

    pub fn data_creator(&self, name: &str) -> Option<DataCreator> {
        self.data
            .get(&hash_str(name))
            .map(|entry| *entry.value())
            .filter(|creator| creator.class.name() == name)
    }

    /// New standalone Data of `class`
    pub fn create_data(&self, class: DataClass) -> Option<Box<dyn Data>> {
        self.data
            .get(&class.hash())
            .filter(|entry| entry.class == class)
            .map(|entry| (entry.value().create)())
    }

    /// New standalone Data of the class named `name`
    pub fn create_data_by_name(&self, name: &str) -> Option<Box<dyn Data>> {
        self.data_creator(name).map(|creator| (creator.create)())
    }

    pub fn data_count(&self) -> usize {
        self.data.len()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types.len())
            .field("data", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::OnceLock;

    use super::*;
    use crate::data::ScalarKind;

    struct Shape;
    struct Circle;

    impl Reflect for Shape {
        fn composite() -> &'static Composite {
            static COMPOSITE: OnceLock<Composite> = OnceLock::new();
            COMPOSITE.get_or_init(|| Composite::builder::<Shape>("Shape", CompositeKind::Class).build())
        }
    }

    impl Reflect for Circle {
        fn composite() -> &'static Composite {
            static COMPOSITE: OnceLock<Composite> = OnceLock::new();
            COMPOSITE.get_or_init(|| {
                Composite::builder::<Circle>("Circle", CompositeKind::Class)
                    .base::<Shape>(0)
                    .build()
            })
        }
    }

    #[test]
    fn test_register_includes_bases() {
        let registry = Registry::new();
        registry.register::<Circle>().unwrap();

        assert!(registry.get_type("Shape").is_some());
        assert!(ptr::eq(registry.get_type("Circle").unwrap(), Circle::composite()));
        assert!(registry.get_type_by_hash(hash_str("Circle")).is_some());
        // Idempotent
        registry.register::<Circle>().unwrap();
        assert_eq!(registry.type_count(), 2);
    }

    #[test]
    fn test_derived_types() {
        let registry = Registry::new();
        registry.register::<Circle>().unwrap();
        let derived = registry.derived_types(Shape::composite());
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].name(), "Circle");
        assert!(registry.derived_types(Circle::composite()).is_empty());
    }

    #[test]
    fn test_alias_and_unregister() {
        let registry = Registry::new();
        registry.register::<Circle>().unwrap();
        registry.alias_type(Circle::composite(), "Disc").unwrap();
        assert_eq!(registry.get_type("Disc").map(Composite::name), Some("Circle"));

        let conflict = registry.alias_type(Shape::composite(), "Disc");
        assert!(matches!(conflict, Err(RegistryError::AlreadyRegistered { .. })));

        assert!(!registry.unalias_type("Circle"));
        assert!(registry.unalias_type("Disc"));
        assert!(registry.get_type("Disc").is_none());

        registry.alias_type(Circle::composite(), "Disc").unwrap();
        assert!(registry.unregister_type(Circle::composite()));
        assert!(registry.get_type("Circle").is_none());
        assert!(registry.get_type("Disc").is_none());
        assert!(registry.get_type("Shape").is_some());
    }

    #[test]
    fn test_colliding_names_stay_apart() {
        // Distinct names with the same FNV-1a hash
        assert_eq!(hash_str("costarring"), hash_str("liquid"));

        let registry = Registry::new();
        registry.register::<Circle>().unwrap();
        registry.alias_type(Circle::composite(), "costarring").unwrap();

        let collision = registry.alias_type(Shape::composite(), "liquid");
        assert!(matches!(
            collision,
            Err(RegistryError::HashCollision { ref existing, .. }) if existing == "costarring"
        ));
        assert!(registry.get_type("liquid").is_none());
        assert!(!registry.unalias_type("liquid"));
        assert_eq!(registry.get_type("costarring").map(Composite::name), Some("Circle"));

        registry.register_data_creator(DataCreator {
            class: DataClass::Structure("costarring"),
            create: create::<u32>,
        });
        registry.register_data_creator(DataCreator {
            class: DataClass::Structure("liquid"),
            create: create::<u32>,
        });
        assert!(registry.data_creator("costarring").is_some());
        assert!(registry.data_creator("liquid").is_none());
        assert!(registry.create_data(DataClass::Structure("liquid")).is_none());
        assert!(registry.create_data(DataClass::Structure("costarring")).is_some());
    }

    #[test]
    fn test_data_creators() {
        let registry = Registry::new();
        registry.register_data::<Vec<u32>>();

        let data = registry.create_data_by_name("UInt32DynArray").unwrap();
        assert_eq!(data.data_class(), DataClass::DynArray(ScalarKind::UInt32));
        assert!(registry.create_data(DataClass::Scalar(ScalarKind::Bool)).is_none());
    }
}
