//! Derive macro for error types.
//!
//! Generates `std::fmt::Display`, `std::error::Error` and, for fields tagged
//! `#[from]`, `From` conversions plus `Error::source`.
//!
//! # Usage
//!
//! ```ignore
//! use ssc_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum EmitError {
//!     #[error("unknown variable {0}")]
//!     UnknownVariable(u16),
//!
//!     #[error("offset {offset} exceeds {size}")]
//!     Size { offset: u16, size: u16, operand: String },
//!
//!     #[error("io error: {0}")]
//!     Io(#[from] std::io::Error),
//! }
//! ```
//!
//! Only the fields a message actually names are passed to `write!`, so a
//! variant may carry context that its message leaves out.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Destructuring pattern and `write!` arguments for one field list.
struct Bindings {
    pattern: TokenStream2,
    format: String,
    args: Vec<TokenStream2>,
}

/// A field marked `#[from]`, together with how to rebuild its owner from it.
struct FromField {
    ty: syn::Type,
    construct: TokenStream2,
    pattern: TokenStream2,
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut display_arms = Vec::new();
    let mut source_arms = Vec::new();
    let mut from_impls = Vec::new();

    let display_body = match &input.data {
        Data::Enum(data_enum) => {
            for variant in &data_enum.variants {
                let variant_name = &variant.ident;
                let message = extract_error_message(
                    &variant.attrs,
                    variant_name,
                    &format!("variant `{}`", variant_name),
                )?;
                let path = quote!(Self::#variant_name);
                let Bindings {
                    pattern,
                    format,
                    args,
                } = bind_fields(&variant.fields, &message);

                display_arms.push(quote! {
                    #path #pattern => write!(f, #format #(, #args)*),
                });

                if let Some(from) = find_from_field(&variant.fields, &path)? {
                    let FromField {
                        ty,
                        construct,
                        pattern,
                    } = from;
                    source_arms.push(quote! {
                        #path #pattern => ::std::option::Option::Some(
                            source as &(dyn ::std::error::Error + 'static)
                        ),
                    });
                    from_impls.push(quote! {
                        impl #impl_generics ::std::convert::From<#ty> for #name #ty_generics #where_clause {
                            fn from(source: #ty) -> Self {
                                #construct
                            }
                        }
                    });
                }
            }

            quote! {
                match self {
                    #(#display_arms)*
                }
            }
        }
        Data::Struct(data_struct) => {
            let message = extract_error_message(
                &input.attrs,
                name,
                &format!("type `{}`", name),
            )?;
            let Bindings {
                pattern,
                format,
                args,
            } = bind_fields(&data_struct.fields, &message);

            if let Some(from) = find_from_field(&data_struct.fields, &quote!(Self))? {
                let FromField {
                    ty,
                    construct,
                    pattern,
                } = from;
                source_arms.push(quote! {
                    Self #pattern => ::std::option::Option::Some(
                        source as &(dyn ::std::error::Error + 'static)
                    ),
                });
                from_impls.push(quote! {
                    impl #impl_generics ::std::convert::From<#ty> for #name #ty_generics #where_clause {
                        fn from(source: #ty) -> Self {
                            #construct
                        }
                    }
                });
            }

            quote! {
                let Self #pattern = self;
                write!(f, #format #(, #args)*)
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    let source_fn = if source_arms.is_empty() {
        quote!()
    } else {
        quote! {
            #[allow(unreachable_patterns)]
            fn source(&self) -> ::std::option::Option<&(dyn ::std::error::Error + 'static)> {
                match self {
                    #(#source_arms)*
                    _ => ::std::option::Option::None,
                }
            }
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #display_body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {
            #source_fn
        }

        #(#from_impls)*
    })
}

/// Binds only the fields the message refers to; positional `{0}` becomes `{f0}`.
fn bind_fields(fields: &Fields, message: &str) -> Bindings {
    match fields {
        Fields::Unit => Bindings {
            pattern: quote!(),
            format: message.to_string(),
            args: Vec::new(),
        },
        Fields::Named(named) => {
            let used: Vec<&syn::Ident> = named
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .filter(|ident| references_field(message, &ident.to_string()))
                .collect();
            Bindings {
                pattern: quote!({ #(#used,)* .. }),
                format: message.to_string(),
                args: used.iter().map(|ident| quote!(#ident = #ident)).collect(),
            }
        }
        Fields::Unnamed(unnamed) => {
            let mut format = message.to_string();
            let mut elems = Vec::with_capacity(unnamed.unnamed.len());
            let mut args = Vec::new();
            for index in 0..unnamed.unnamed.len() {
                if references_field(message, &index.to_string()) {
                    let ident = format_ident!("f{}", index);
                    format = format
                        .replace(&format!("{{{}}}", index), &format!("{{f{}}}", index))
                        .replace(&format!("{{{}:", index), &format!("{{f{}:", index));
                    args.push(quote!(#ident = #ident));
                    elems.push(ident.into_token_stream());
                } else {
                    elems.push(quote!(_));
                }
            }
            Bindings {
                pattern: quote!((#(#elems),*)),
                format,
                args,
            }
        }
    }
}

/// True when `message` contains `{name}` or `{name:...}` outside a `{{` escape.
fn references_field(message: &str, name: &str) -> bool {
    let open = format!("{{{}", name);
    message.match_indices(&open).any(|(at, _)| {
        let escaped = message[..at].ends_with('{');
        let rest = &message[at + open.len()..];
        !escaped && (rest.starts_with('}') || rest.starts_with(':'))
    })
}

/// Locates the `#[from]` field, which must be the only field of its owner.
fn find_from_field(fields: &Fields, path: &TokenStream2) -> syn::Result<Option<FromField>> {
    let Some(field) = fields
        .iter()
        .find(|field| field.attrs.iter().any(|attr| attr.path().is_ident("from")))
    else {
        return Ok(None);
    };

    if fields.len() != 1 {
        return Err(syn::Error::new_spanned(
            fields,
            "#[from] requires the variant to have exactly one field",
        ));
    }

    let ty = field.ty.clone();
    let (construct, pattern) = match &field.ident {
        Some(ident) => (
            quote!(#path { #ident: source }),
            quote!({ #ident: source }),
        ),
        None => (quote!(#path(source)), quote!((source))),
    };

    Ok(Some(FromField {
        ty,
        construct,
        pattern,
    }))
}

/// Reads the message from an `#[error("...")]` attribute.
fn extract_error_message<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            format!(
                "missing #[error(\"...\")] attribute on {}; every error variant must declare a display message",
                target_desc
            ),
        ));
    };

    let Meta::List(meta_list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "invalid #[error] attribute; use #[error(\"message\")] to describe the error",
        ));
    };

    match syn::parse2::<Lit>(meta_list.tokens.clone()) {
        Ok(Lit::Str(lit_str)) => Ok(lit_str.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "invalid #[error] attribute: message must be a string literal, e.g. #[error(\"size {size} exceeded\")]",
        )),
    }
}
