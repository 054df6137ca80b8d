use core::ptr::NonNull;

use crate::{OffsetPtr, Subobject};

/// A source of an absolute target address for a pointer to `T`.
///
/// Everything that can be stored into an [`OffsetPtr<T>`] or an
/// [`AtomicOffsetPtr<T>`](crate::AtomicOffsetPtr) implements this trait:
/// raw pointers, references, and other self-relative pointers (which are
/// resolved first, then re-encoded at the destination). Each impl accepts any
/// `U: Subobject<T>`, so a pointer-to-derived converts into a pointer-to-base
/// with the subobject displacement applied.
///
/// | Source                   | Resolves to                         |
/// |--------------------------|-------------------------------------|
/// | `*mut U`, `*const U`     | the pointer, upcast                 |
/// | `NonNull<U>`             | the pointer, upcast                 |
/// | `Option<NonNull<U>>`     | the pointer or null                 |
/// | `&mut U`                 | the referent, upcast                |
/// | `&OffsetPtr<U>`          | the resolved target, upcast         |
pub trait Target<T> {
  /// The absolute address of the `T` this value designates, or null.
  fn into_target(self) -> *mut T;
}

impl<T, U: Subobject<T>> Target<T> for *mut U {
  #[inline]
  fn into_target(self) -> *mut T {
    <U as Subobject<T>>::upcast(self)
  }
}

impl<T, U: Subobject<T>> Target<T> for *const U {
  #[inline]
  fn into_target(self) -> *mut T {
    <U as Subobject<T>>::upcast(self.cast_mut())
  }
}

impl<T, U: Subobject<T>> Target<T> for NonNull<U> {
  #[inline]
  fn into_target(self) -> *mut T {
    <U as Subobject<T>>::upcast(self.as_ptr())
  }
}

impl<T, U: Subobject<T>> Target<T> for Option<NonNull<U>> {
  #[inline]
  fn into_target(self) -> *mut T {
    self.map_or(core::ptr::null_mut(), |p| <U as Subobject<T>>::upcast(p.as_ptr()))
  }
}

impl<T, U: Subobject<T>> Target<T> for &mut U {
  #[inline]
  fn into_target(self) -> *mut T {
    <U as Subobject<T>>::upcast(core::ptr::from_mut(self))
  }
}

impl<T, U: Subobject<T>> Target<T> for &OffsetPtr<U> {
  #[inline]
  fn into_target(self) -> *mut T {
    <U as Subobject<T>>::upcast(self.get())
  }
}
