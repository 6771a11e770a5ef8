//! Record derive macro implementation

mod attrs;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

use crate::common::syn_types::{Embedding, embedding};
use attrs::{column_name, get_field_attr};

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record can only be derived for structs",
            ));
        }
    };

    let mut registrations = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attr = get_field_attr(field)?;

        if attr.flatten {
            if attr.skip {
                continue;
            }
            if attr.column.is_some() || attr.auto {
                return Err(syn::Error::new_spanned(
                    field,
                    "#[orm(flatten)] cannot be combined with `column` or `auto`",
                ));
            }
            registrations.push(embed_tokens(ident, &field.ty));
            continue;
        }

        let Some(column) = column_name(field, &attr) else {
            continue;
        };
        let auto = attr.auto;
        registrations.push(quote! {
            schema.column(
                #column,
                #auto,
                |r: &Self| ::fluentdb::Value::from(::core::clone::Clone::clone(&r.#ident)),
                |r: &mut Self, v: ::fluentdb::Value| {
                    r.#ident = ::fluentdb::FromValue::from_value(v)?;
                    ::core::result::Result::Ok(())
                },
            )?;
        });
    }

    Ok(quote! {
        impl #impl_generics ::fluentdb::Record for #name #ty_generics #where_clause {
            fn describe(
                schema: &mut ::fluentdb::SchemaBuilder<Self>,
            ) -> ::fluentdb::OrmResult<()> {
                #(#registrations)*
                ::core::result::Result::Ok(())
            }
        }

        impl #impl_generics ::fluentdb::InsertRow for #name #ty_generics #where_clause {
            fn insert_values(
                &self,
            ) -> ::fluentdb::OrmResult<::std::vec::Vec<(::std::string::String, ::fluentdb::Value)>> {
                ::core::result::Result::Ok(::fluentdb::schema_of::<Self>()?.insert_values(self))
            }
        }

        impl #impl_generics ::fluentdb::InsertSource for #name #ty_generics #where_clause {
            fn insert_rows(
                &self,
            ) -> ::fluentdb::OrmResult<
                ::std::vec::Vec<::std::vec::Vec<(::std::string::String, ::fluentdb::Value)>>,
            > {
                ::core::result::Result::Ok(::std::vec![::fluentdb::InsertRow::insert_values(self)?])
            }
        }
    })
}

/// `schema.embed(..)` for a flattened field, with accessors matching how the
/// embedded record is held.
fn embed_tokens(ident: &syn::Ident, ty: &syn::Type) -> TokenStream {
    let (shape, record) = embedding(ty);
    let (get, get_mut) = match shape {
        Embedding::Plain => (
            quote! { ::core::option::Option::Some(&r.#ident) },
            quote! { &mut r.#ident },
        ),
        Embedding::Boxed => (
            quote! { ::core::option::Option::Some(&*r.#ident) },
            quote! { &mut *r.#ident },
        ),
        Embedding::Optional => (
            quote! { r.#ident.as_ref() },
            quote! { r.#ident.get_or_insert_with(::core::default::Default::default) },
        ),
        Embedding::OptionalBoxed => (
            quote! { r.#ident.as_deref() },
            quote! { &mut **r.#ident.get_or_insert_with(::core::default::Default::default) },
        ),
    };

    quote! {
        schema.embed::<#record, _, _>(
            |r: &Self| #get,
            |r: &mut Self| #get_mut,
        )?;
    }
}
