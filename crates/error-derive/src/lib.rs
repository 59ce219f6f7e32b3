//! `#[derive(Error)]` for error enums.
//!
//! Every variant carries a `#[msg = "..."]` attribute that becomes its [Display](std::fmt::Display)
//! output.
//!
//! * Unit variants print the message as-is.
//! * Variants with a single unnamed field additionally get a `From` implementation
//!   and report the field as their [source](std::error::Error::source).
//! * Variants with named fields may refer to those fields from the message, like `{length}`
//!   or `{length:#x}`.

use proc_macro::TokenStream;
use quote::quote;

#[proc_macro_derive(Error, attributes(msg))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    let item: syn::ItemEnum = syn::parse(input).expect("Could not parse input as enum");

    let name = item.ident;
    let mut variant_displays = vec![];
    let mut from_impls = vec![];
    let mut variant_sources = vec![];

    for variant in &item.variants {
        let ident = &variant.ident;

        let Some(message) = message_of(variant) else {
            panic!("variant {ident} needs a #[msg = \"...\"] attribute");
        };

        match &variant.fields {
            syn::Fields::Unit => {
                variant_displays.push(quote!(Self::#ident => f.write_str(#message)));
            },
            syn::Fields::Unnamed(unnamed_fields) => {
                if unnamed_fields.unnamed.len() != 1 {
                    panic!("Need exactly one field");
                }

                let field = &unnamed_fields.unnamed[0];
                let ty = &field.ty;

                from_impls.push(quote!(
                    #[automatically_derived]
                    impl From<#ty> for #name {
                        fn from(value: #ty) -> Self {
                            Self::#ident(value)
                        }
                    }
                ));
                variant_displays.push(quote!(Self::#ident(_) => f.write_str(#message)));
                variant_sources.push(quote!(Self::#ident(ref value) => Some(value)));
            },
            syn::Fields::Named(named_fields) => {
                let text = message.value();

                // Only bind the fields that the message refers to, otherwise
                // the generated code would trigger unused variable warnings
                let used_fields: Vec<&syn::Ident> = named_fields
                    .named
                    .iter()
                    .filter_map(|field| field.ident.as_ref())
                    .filter(|field| is_referenced(&text, &field.to_string()))
                    .collect();

                variant_displays.push(quote!(
                    Self::#ident { #(#used_fields,)* .. } => {
                        write!(f, #message, #(#used_fields = #used_fields),*)
                    }
                ));
            },
        }
    }

    quote!(
        #[automatically_derived]
        impl ::std::fmt::Display for #name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> Result<(), ::std::fmt::Error> {
                match self {
                    #(
                        #variant_displays,
                    )*
                }
            }
        }

        #(
            #from_impls
        )*

        #[automatically_derived]
        impl ::std::error::Error for #name {
            fn source(&self) -> Option<&(dyn ::std::error::Error + 'static)> {
                match self {
                    #(
                        #variant_sources,
                    )*
                    _ => None,
                }
            }
        }
    )
    .into()
}

fn message_of(variant: &syn::Variant) -> Option<syn::LitStr> {
    variant
        .attrs
        .iter()
        .flat_map(|attr| match &attr.meta {
            syn::Meta::NameValue(name_value) => Some(name_value),
            _ => None,
        })
        .find(|name_value| name_value.path.is_ident("msg"))
        .map(|name_value| match &name_value.value {
            syn::Expr::Lit(syn::ExprLit {
                lit: syn::Lit::Str(message),
                ..
            }) => message.clone(),
            _ => panic!("#[msg] must be a string literal"),
        })
}

fn is_referenced(message: &str, field: &str) -> bool {
    message.contains(&format!("{{{field}}}")) || message.contains(&format!("{{{field}:"))
}
