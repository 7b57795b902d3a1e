//! Helium Reflect - Reflection and serialization core
//!
//! This crate describes Rust types at runtime and persists graphs of them:
//!
//! - [`registry`] - Classes, structures and their fields
//! - [`data`] - Type-erased bindings over values, and the cast table
//! - [`archive`] - Binary and XML archives
//! - [`visitor`] - Object graph traversal
//! - [`dom`] - Document trees with change notification
//! - [`rbtree`] - The red-black tree behind the sorted containers
//!
//! # Re-exports
//!
//! - [`types`] - Leaf value types (vectors, colors, ids, paths)
//!
//! # Example
//!
//! ```ignore
//! use helium_reflect::{archive, object_ptr, Reflect, ReflectionContext};
//!
//! #[derive(Reflect, Default)]
//! struct Mesh {
//!     name: String,
//!     tags: Vec<String>,
//! }
//!
//! let ctx = ReflectionContext::new();
//! ctx.register::<Mesh>()?;
//!
//! let xml = archive::to_xml(&ctx, &[object_ptr(Mesh::default())])?;
//! let loaded = archive::from_xml(&ctx, &xml)?;
//! ```

// Allow the crate to refer to itself as `helium_reflect` for proc macro compatibility
extern crate self as helium_reflect;

pub use helium_types as types;

pub mod archive;
pub mod config;
pub mod context;
pub mod data;
pub mod dom;
pub mod hash;
pub mod object;
pub mod rbtree;
pub mod registry;
pub mod visitor;

// Re-export commonly used items
pub use archive::{ArchiveBinary, ArchiveError, ArchiveResult, ArchiveXml};
pub use config::{ConfigError, ConfigResult, ReflectConfig};
pub use context::ReflectionContext;
pub use data::{bind, create, Data, DataClass, DataFlags, DataValue, ScalarKind};
pub use dom::{Document, DocumentError, NodeKey, Veto};
pub use object::{object_ptr, ptr_eq, Object, ObjectHandle, ObjectPtr};
pub use rbtree::{SortedMap, SortedSet};
pub use registry::{
    Composite, CompositeKind, Field, FieldFlags, Reflect, Registry, RegistryError, RegistryResult,
};
pub use visitor::{find_by_type, find_by_type_set, Visitor};

// Re-export the derive macro
pub use helium_macros::Reflect;
