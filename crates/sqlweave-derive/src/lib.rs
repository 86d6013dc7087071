//! Derive macros for sqlweave
//!
//! Provides `#[derive(Bind)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod bind;

/// Derive `Bind` for a struct with named fields.
///
/// # Example
///
/// ```ignore
/// use sqlweave::Bind;
///
/// #[derive(Default, Bind)]
/// struct Offer {
///     id: i64,
///     #[orm(column = "product_id")]
///     product: i64,
///     #[orm(flatten)]
///     audit: Audit,
///     #[orm(skip)]
///     cached_total: f64,
/// }
/// ```
///
/// # Attributes
///
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(flatten)]` - Splice in the columns of a nested `Bind` type
/// - `#[orm(skip)]` - Leave the field out; it keeps its `Default` value
#[proc_macro_derive(Bind, attributes(orm))]
pub fn derive_bind(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    bind::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
