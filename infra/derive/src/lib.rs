#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Procedural macros shared by the Passio crates.
//!
//! Only one macro lives here today: [`passio_error`], which turns a plain enum into a
//! `thiserror`-backed error type with context support.
//!
//! ## Usage
//! ```toml
//! [dependencies]
//! passio-derive = { path = "../../infra/derive" }
//! thiserror = "2"
//! ```

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Attribute macro for defining crate-level error enums.
///
/// # Features
///
/// * **Automatic Derives**: Injects `#[derive(Debug, thiserror::Error)]` unless already present.
/// * **Context Support**: Generates a companion `<Name>Ext` trait that adds `.context()`
///   to `Result<T, Name>` and to `Result<T, Source>` for every auto-converted source type.
/// * **Source Conversions**: Implements `From<T>` for variants whose wrapped error field is
///   named `source`. A field that is only marked `#[source]` is still chained by `thiserror`
///   but gets no `From`, leaving the conversion to a hand-written impl.
/// * **Internal Fallback**: Provides `From<&'static str>` and `From<String>` when an
///   `Internal` variant is present.
/// * **Kind**: Adds `kind(&self) -> &'static str` returning the variant name, suitable as a
///   structured log field.
///
/// # Requirements
///
/// 1. The macro must be applied to an **enum** with **named-field** variants.
/// 2. Context fields must be typed `Option<Cow<'static, str>>`.
/// 3. Variants wrapping another error must carry a `context` field.
/// 4. `#[from]` is rejected; name the field `source` instead.
/// 5. One error enum per module (the `format_context` helper is module-scoped).
///
/// # Example
///
/// ```rust,ignore
/// use passio_derive::passio_error;
/// use std::borrow::Cow;
///
/// #[passio_error]
/// pub enum StoreError {
///     #[error("I/O failure{}: {source}", format_context(.context))]
///     Io { source: std::io::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Rejected{}: {cause}", format_context(.context))]
///     Rejected {
///         #[source]
///         cause: std::io::Error,
///         context: Option<Cow<'static, str>>,
///     },
///
///     #[error("Internal fault{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load(path: &str) -> Result<Vec<u8>, StoreError> {
///     std::fs::read(path).context("reading record")
/// }
/// ```
#[proc_macro_attribute]
pub fn passio_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand_derive(input).into()
}
