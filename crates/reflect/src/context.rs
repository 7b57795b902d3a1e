//! Reflection context
//!
//! [`ReflectionContext`] owns everything the reflection core needs at runtime:
//! the type registry, the cast table and the configuration. Build one at
//! startup and pass it to archives; several contexts can coexist.
//!
//! ```ignore
//! let ctx = ReflectionContext::new();
//! ctx.register::<Mesh>()?;
//!
//! let bytes = archive::to_binary(&ctx, &[mesh])?;
//! ```

use tracing::{debug, info};

use crate::config::ReflectConfig;
use crate::data::{
    self, cast_value, register_builtin_data, CastTable, Data, DataClass, DataFlags, DataValue,
    TypedData,
};
use crate::object::{Object, ObjectPtr};
use crate::registry::{Field, Reflect, Registry, RegistryResult};

/// Registry, cast table and configuration shared by every operation
#[derive(Debug)]
pub struct ReflectionContext {
    registry: Registry,
    casts: CastTable,
    config: ReflectConfig,
}

impl ReflectionContext {
    /// Context with the default configuration
    pub fn new() -> Self {
        Self::with_config(ReflectConfig::default())
    }

    /// Context with every built-in Data class and cast registered
    pub fn with_config(config: ReflectConfig) -> Self {
        let registry = Registry::new();
        register_builtin_data(&registry);
        let casts = CastTable::with_builtin();

        info!(
            "Reflection context ready: {} data classes, {} casts",
            registry.data_count(),
            casts.len()
        );
        if config.debug {
            debug!("Reflection config: {:?}", config);
        }

        Self {
            registry,
            casts,
            config,
        }
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[inline]
    pub fn casts(&self) -> &CastTable {
        &self.casts
    }

    /// Mutable cast table, for registering application casts
    #[inline]
    pub fn casts_mut(&mut self) -> &mut CastTable {
        &mut self.casts
    }

    #[inline]
    pub fn config(&self) -> &ReflectConfig {
        &self.config
    }

    /// Register `T` and everything it needs
    pub fn register<T: Reflect>(&self) -> RegistryResult<()> {
        self.registry.register::<T>()
    }

    /// Default instance of the class registered under `name`
    pub fn create_instance(&self, name: &str) -> Option<ObjectPtr> {
        self.registry.create_instance(name)
    }

    /// Whether a value of class `src` can be converted to `dest`
    pub fn cast_supported(&self, src: DataClass, dest: DataClass) -> bool {
        data::cast_supported(&self.casts, src, dest)
    }

    /// Convert `src` into `dest`
    ///
    /// Same classes copy directly, known pairs go through the cast table, and
    /// containers of the same family convert element by element. Returns
    /// `false` and leaves `dest` untouched when no conversion applies.
    pub fn cast_value(&self, src: &dyn Data, dest: &mut dyn Data, flags: DataFlags) -> bool {
        cast_value(self, src, dest, flags)
    }

    /// Read `data` as a `T`, converting if needed
    pub fn get_value<T: DataValue>(&self, data: &dyn Data) -> Option<T> {
        if let Some(typed) = data.downcast_ref::<T::Data>() {
            return Some(typed.value().clone());
        }
        let mut scratch = T::Data::default();
        self.cast_value(data, &mut scratch, DataFlags::SHALLOW)
            .then(|| scratch.value().clone())
    }

    /// Write `value` into `data`, converting if needed
    pub fn set_value<T: DataValue>(&self, data: &mut dyn Data, value: T) -> bool {
        if let Some(typed) = data.downcast_mut::<T::Data>() {
            *typed.value_mut() = value;
            return true;
        }
        let source = T::Data::with_value(value);
        self.cast_value(&source, data, DataFlags::SHALLOW)
    }

    /// Read a field of `object` as a `T`
    pub fn get_field_value<T: DataValue>(&self, object: &dyn Object, field: &Field) -> Option<T> {
        let data = field.bind_ref(object);
        self.get_value::<T>(&*data)
    }

    /// Write a field of `object` and notify it through [`Object::field_changed`]
    pub fn set_field_value<T: DataValue>(
        &self,
        object: &mut dyn Object,
        field: &Field,
        value: T,
    ) -> bool {
        let written = {
            let mut data = field.bind(object);
            self.set_value(&mut *data, value)
        };
        if written {
            object.field_changed(field);
        }
        written
    }
}

impl Default for ReflectionContext {
    fn default() -> Self {
        Self::new()
    }
}
