//! Derive macros for the `selfrel` crate.

mod attrs;
mod bases;

use proc_macro::TokenStream;
use syn::parse_macro_input;

/// Derive `Subobject<Base>` for every field tagged `#[base]`.
///
/// Each tagged field is treated as an embedded base: a pointer to the struct
/// can be converted into a pointer to the field's type, with the field's
/// offset (`core::mem::offset_of!`) added to the address. Untagged fields are
/// ordinary members.
///
/// # Field attributes
///
/// ## `#[base]`
///
/// Marks the field as a base subobject. Takes no arguments. Two base fields of
/// the same type produce conflicting impls, which is an error (the base would
/// be ambiguous).
///
/// ```ignore
/// #[derive(Bases)]
/// #[repr(C)]
/// struct C {
///   #[base]
///   a: A,
///   #[base]
///   b: B,
///   c: u64,
/// }
///
/// // Generates:
/// //   unsafe impl Subobject<A> for C { fn displacement() -> usize { offset_of!(Self, a) } }
/// //   unsafe impl Subobject<B> for C { fn displacement() -> usize { offset_of!(Self, b) } }
/// ```
///
/// Tuple structs and generic structs are supported. Enums and unions are not:
/// a variant field has no fixed offset in every value of the type.
#[proc_macro_derive(Bases, attributes(base))]
pub fn derive_bases(input: TokenStream) -> TokenStream {
  let input = parse_macro_input!(input as syn::DeriveInput);
  if let Err(err) = attrs::validate_type_attrs(&input) {
    return TokenStream::from(err.to_compile_error());
  }
  TokenStream::from(bases::gen_bases_impl(&input))
}
