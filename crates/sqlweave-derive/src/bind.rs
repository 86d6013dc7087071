//! Bind derive macro implementation

use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, LitStr, Result};

enum Mapping {
    Column(String),
    Flatten,
    Skip,
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Bind can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Bind can only be derived for structs",
            ));
        }
    };

    let mut entries = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let entry = match mapping(field)? {
            Mapping::Column(column) => quote! {
                map.field(#column, |v: &mut Self| &mut v.#ident);
            },
            Mapping::Flatten => quote! {
                map.flatten(|v: &mut Self| &mut v.#ident);
            },
            Mapping::Skip => continue,
        };
        entries.push(entry);
    }

    Ok(quote! {
        impl #impl_generics ::sqlweave::Bind for #name #ty_generics #where_clause {
            fn describe(map: &mut ::sqlweave::FieldMap<Self>) {
                #(#entries)*
            }
        }
    })
}

fn mapping(field: &syn::Field) -> Result<Mapping> {
    let mut column = None;
    let mut flatten = false;
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("column") {
                let lit: LitStr = meta.value()?.parse()?;
                column = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("flatten") {
                flatten = true;
                Ok(())
            } else if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `column = \"...\"`, `flatten` or `skip`"))
            }
        })?;
    }

    if skip {
        return Ok(Mapping::Skip);
    }
    if flatten {
        if column.is_some() {
            return Err(syn::Error::new_spanned(
                field,
                "`flatten` and `column` cannot be combined",
            ));
        }
        return Ok(Mapping::Flatten);
    }
    let column = match column {
        Some(column) => column,
        None => field
            .ident
            .as_ref()
            .map(|ident| ident.unraw().to_string())
            .unwrap_or_default(),
    };
    Ok(Mapping::Column(column))
}
