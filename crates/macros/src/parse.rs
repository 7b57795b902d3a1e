//! Attribute parsing for the Reflect derive macro

use darling::{FromDeriveInput, FromField};
use syn::ext::IdentExt;
use syn::{DeriveInput, Generics, Ident, Type};

/// Parsed #[reflect(...)] attributes on the struct
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(reflect), supports(struct_named))]
pub struct ReflectArgs {
    /// Struct identifier
    pub ident: Ident,

    pub generics: Generics,

    /// Struct fields
    pub data: darling::ast::Data<(), ReflectFieldArgs>,

    /// Registered type name (defaults to the struct name)
    pub name: Option<String>,

    /// Describe the type as a class (the default)
    #[darling(default)]
    pub class: bool,

    /// Describe the type as a structure, embedded by value in other types
    #[darling(default)]
    pub structure: bool,

    /// The `Object` impl is written by hand
    #[darling(default)]
    pub manual_object: bool,

    /// The type has no `Default` impl; the registry cannot create instances
    #[darling(default)]
    pub no_default: bool,
}

impl ReflectArgs {
    /// Name written to archives and used for registry lookups
    pub fn type_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.ident.to_string())
    }
}

/// Parsed #[reflect(...)] attributes on a field
#[derive(Debug, FromField)]
#[darling(attributes(reflect))]
pub struct ReflectFieldArgs {
    /// Field identifier
    pub ident: Option<Ident>,

    /// Field type
    pub ty: Type,

    /// The field embeds the base type whose fields are inherited
    #[darling(default)]
    pub base: bool,

    /// Not reflected at all
    #[darling(default)]
    pub skip: bool,

    /// Field name used in archives (defaults to the Rust name)
    pub rename: Option<String>,

    /// Reflected but never archived
    #[darling(default)]
    pub discard: bool,

    /// Archived even when it holds its default value
    #[darling(default)]
    pub force: bool,
}

impl ReflectFieldArgs {
    /// Check if this field is described in the composite
    pub fn is_reflected(&self) -> bool {
        !self.skip && !self.base
    }

    pub fn field_name(&self) -> String {
        match (&self.rename, &self.ident) {
            (Some(name), _) => name.clone(),
            (None, Some(ident)) => ident.unraw().to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Parse a DeriveInput into ReflectArgs
pub fn parse_reflect(input: &DeriveInput) -> darling::Result<ReflectArgs> {
    ReflectArgs::from_derive_input(input)
}
