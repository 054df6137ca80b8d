use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DataStruct, DeriveInput, Member};

use crate::attrs;

/// A field tagged `#[base]`: its member (name or tuple index) and type.
struct BaseField<'a> {
  member: Member,
  ty: &'a syn::Type,
}

/// Collect all `#[base]` fields in declaration order.
fn collect_bases(data: &DataStruct) -> syn::Result<Vec<BaseField<'_>>> {
  let mut bases = Vec::new();
  for (i, field) in data.fields.iter().enumerate() {
    if !attrs::is_base(&field.attrs)? {
      continue;
    }
    let member = match &field.ident {
      Some(ident) => Member::Named(ident.clone()),
      None => Member::Unnamed(i.into()),
    };
    bases.push(BaseField { member, ty: &field.ty });
  }
  Ok(bases)
}

/// Generate one `Subobject<Base>` impl per `#[base]` field.
///
/// The displacement is `offset_of!(Self, field)`: the compiler's own answer
/// for where the field lives, whatever the type's `repr`.
pub fn gen_bases_impl(input: &DeriveInput) -> TokenStream {
  let name = &input.ident;
  let Data::Struct(data) = &input.data else {
    return syn::Error::new_spanned(name, "Bases can only be derived for structs")
      .to_compile_error();
  };

  let bases = match collect_bases(data) {
    Ok(bases) => bases,
    Err(err) => return err.to_compile_error(),
  };
  if bases.is_empty() {
    return syn::Error::new_spanned(name, "Bases derive: expected at least one `#[base]` field")
      .to_compile_error();
  }

  let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
  // Each base is a field of `Self` with exactly the base type, so the pointer
  // adjustment lands on a valid `Base` inside every valid `Self`.
  let impls = bases.iter().map(|BaseField { member, ty }| {
    quote! {
      unsafe impl #impl_generics ::selfrel::Subobject<#ty> for #name #ty_generics #where_clause {
        #[inline]
        fn displacement() -> usize {
          ::core::mem::offset_of!(Self, #member)
        }
      }
    }
  });

  quote! { #(#impls)* }
}
