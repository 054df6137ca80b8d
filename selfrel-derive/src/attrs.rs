use syn::{Attribute, DeriveInput};

/// Returns `true` if the field carries a bare `#[base]` attribute.
///
/// `#[base(...)]` and `#[base = ...]` are rejected: a base field takes no
/// arguments.
pub fn is_base(attrs: &[Attribute]) -> syn::Result<bool> {
  let mut found = false;
  for attr in attrs {
    if !attr.path().is_ident("base") {
      continue;
    }
    attr.meta.require_path_only().map_err(|_| {
      syn::Error::new_spanned(attr, "expected bare `#[base]` with no arguments")
    })?;
    if found {
      return Err(syn::Error::new_spanned(attr, "duplicate `#[base]` attribute"));
    }
    found = true;
  }
  Ok(found)
}

/// Reject `#[base]` on the type itself.
///
/// Field-level attributes are checked by [`is_base`] while collecting bases.
pub fn validate_type_attrs(input: &DeriveInput) -> syn::Result<()> {
  for attr in &input.attrs {
    if attr.path().is_ident("base") {
      return Err(syn::Error::new_spanned(attr, "`#[base]` belongs on a field, not on the type"));
    }
  }
  Ok(())
}
