//! Derive macros for the ssc crate.
//!
//! Provides:
//! - `#[derive(Error)]` - `Display`, `std::error::Error` and `From` conversions
//!   for error enums and structs

mod error;

use proc_macro::TokenStream;

/// Implements `Display`, `Error` and any `#[from]` conversions for error types.
#[proc_macro_derive(Error, attributes(error, from))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
