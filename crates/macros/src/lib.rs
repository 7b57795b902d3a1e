//! Helium Reflect Proc Macros
//!
//! This crate provides `#[derive(Reflect)]`, which describes a struct to the
//! reflection core: its registered name, its fields with their byte offsets,
//! and how to create instances.
//!
//! # Example
//!
//! ```ignore
//! use helium_reflect::Reflect;
//!
//! #[derive(Reflect, Default, Clone)]
//! #[reflect(structure)]
//! pub struct Bounds {
//!     min: Vector3,
//!     max: Vector3,
//! }
//!
//! #[derive(Reflect, Default)]
//! pub struct Mesh {
//!     #[reflect(base)]
//!     node: SceneNode,
//!
//!     name: String,
//!     bounds: Bounds,
//!
//!     #[reflect(rename = "mat")]
//!     material: Option<ObjectPtr>,
//!
//!     #[reflect(skip)]
//!     gpu_handle: u64,
//! }
//!
//! // Generated:
//! // - impl Reflect for Mesh (composite built once, on first use)
//! // - impl Object for Mesh (classes only)
//! // - impl DataValue for Bounds (structures only)
//! // - Mesh::TYPE_NAME / Mesh::TYPE_HASH
//! ```
//!
//! # Attributes
//!
//! ## Struct Attributes
//!
//! - `#[reflect(name = "Name")]` - Registered name (default: the struct name).
//! - `#[reflect(class)]` - Describe as a class, shared through `ObjectPtr` (default).
//! - `#[reflect(structure)]` - Describe as a structure, embedded by value. Requires `Clone`.
//! - `#[reflect(manual_object)]` - Skip the `Object` impl, to implement hooks by hand.
//! - `#[reflect(no_default)]` - The type has no `Default`; no creator is registered.
//!
//! ## Field Attributes
//!
//! - `#[reflect(base)]` - The field holds the base type; its fields are inherited.
//! - `#[reflect(skip)]` - Not reflected.
//! - `#[reflect(rename = "name")]` - Name used in archives.
//! - `#[reflect(discard)]` - Reflected but never archived.
//! - `#[reflect(force)]` - Archived even when empty.

mod parse;
mod reflect;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derive macro for reflected classes and structures
///
/// Field offsets come from `core::mem::offset_of!`, so the struct layout is
/// whatever the compiler picks; no `#[repr]` is required. Every reflected
/// field type must implement `DataValue`.
///
/// # Example
///
/// ```ignore
/// #[derive(Reflect, Default)]
/// #[reflect(name = "Light")]
/// pub struct PointLight {
///     color: Color3,
///     #[reflect(force)]
///     intensity: f32,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(reflect))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    reflect::derive_reflect(input).into()
}
