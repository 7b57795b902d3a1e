//! Reflect derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::DeriveInput;

use crate::parse::{parse_reflect, ReflectArgs, ReflectFieldArgs};

/// FNV-1a 32-bit hash (compile-time computation in proc macro)
const fn fnv1a_32(data: &[u8]) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 0x811c9dc5;
    const FNV_PRIME: u32 = 0x01000193;

    let mut hash = FNV_OFFSET_BASIS;
    let mut i = 0;
    while i < data.len() {
        hash ^= data[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}

/// Generate the Reflect implementation
pub fn derive_reflect(input: DeriveInput) -> TokenStream {
    match parse_reflect(&input) {
        Ok(args) => match generate_impl(&args) {
            Ok(tokens) => tokens,
            Err(e) => e.to_compile_error(),
        },
        Err(e) => e.write_errors(),
    }
}

fn generate_impl(args: &ReflectArgs) -> syn::Result<TokenStream> {
    let struct_name = &args.ident;

    if !args.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &args.generics,
            "Reflect cannot be derived for generic types",
        ));
    }
    if args.class && args.structure {
        return Err(syn::Error::new_spanned(
            struct_name,
            "a type is either a class or a structure",
        ));
    }

    let fields = match &args.data {
        darling::ast::Data::Struct(fields) => &fields.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                struct_name,
                "Reflect can only be derived for structs",
            ))
        }
    };

    let bases: Vec<&ReflectFieldArgs> = fields.iter().filter(|f| f.base && !f.skip).collect();
    if bases.len() > 1 {
        return Err(syn::Error::new_spanned(
            &bases[1].ty,
            "only one #[reflect(base)] field is allowed",
        ));
    }

    let type_name = args.type_name();
    let type_hash = fnv1a_32(type_name.as_bytes());
    let is_structure = args.structure;

    // Inherited fields come first
    let base_call = bases.first().map(|base| {
        let ident = &base.ident;
        let ty = &base.ty;
        quote! {
            .base::<#ty>(::std::mem::offset_of!(#struct_name, #ident))
        }
    });

    let field_calls: Vec<_> = fields
        .iter()
        .filter(|f| f.is_reflected())
        .map(|f| generate_field(struct_name, f))
        .collect();

    let kind = if is_structure {
        quote!(::helium_reflect::registry::CompositeKind::Structure)
    } else {
        quote!(::helium_reflect::registry::CompositeKind::Class)
    };

    let creator = if args.no_default {
        quote! {}
    } else if is_structure {
        quote! {
            .data_creator(::helium_reflect::data::create::<#struct_name>)
        }
    } else {
        quote! {
            .creator(|| ::helium_reflect::object::object_ptr(
                <#struct_name as ::std::default::Default>::default(),
            ))
        }
    };

    let reflect_impl = quote! {
        impl ::helium_reflect::registry::Reflect for #struct_name {
            fn composite() -> &'static ::helium_reflect::registry::Composite {
                static COMPOSITE: ::std::sync::OnceLock<::helium_reflect::registry::Composite> =
                    ::std::sync::OnceLock::new();
                COMPOSITE.get_or_init(|| {
                    ::helium_reflect::registry::Composite::builder::<#struct_name>(#type_name, #kind)
                        #base_call
                        #(#field_calls)*
                        #creator
                        .build()
                })
            }
        }
    };

    let object_impl = if is_structure || args.manual_object {
        quote! {}
    } else {
        quote! {
            impl ::helium_reflect::object::Object for #struct_name {
                fn class(&self) -> &'static ::helium_reflect::registry::Composite {
                    <Self as ::helium_reflect::registry::Reflect>::composite()
                }

                fn as_any(&self) -> &dyn ::std::any::Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                    self
                }
            }
        }
    };

    let data_value_impl = if is_structure {
        quote! {
            impl ::helium_reflect::data::DataValue for #struct_name {
                type Data = ::helium_reflect::data::StructureData<#struct_name>;

                fn data_class() -> ::helium_reflect::data::DataClass {
                    ::helium_reflect::data::DataClass::Structure(#type_name)
                }
            }
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #struct_name {
            /// Registered type name
            pub const TYPE_NAME: &'static str = #type_name;
            /// FNV-1a hash of the type name
            pub const TYPE_HASH: u32 = #type_hash;
        }

        #reflect_impl
        #object_impl
        #data_value_impl
    })
}

fn generate_field(struct_name: &syn::Ident, field: &ReflectFieldArgs) -> TokenStream {
    let ident = &field.ident;
    let ty = &field.ty;
    let name = field.field_name();

    let mut flags = Vec::new();
    if field.discard {
        flags.push(quote!(::helium_reflect::registry::FieldFlags::DISCARD));
    }
    if field.force {
        flags.push(quote!(::helium_reflect::registry::FieldFlags::FORCE));
    }
    let flags = if flags.is_empty() {
        quote!(::helium_reflect::registry::FieldFlags::empty())
    } else {
        quote!(#(#flags)|*)
    };

    quote! {
        .field::<#ty>(#name, ::std::mem::offset_of!(#struct_name, #ident), #flags)
    }
}
