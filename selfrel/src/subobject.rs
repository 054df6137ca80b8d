/// Layout relation between a derived type and one of its embedded bases.
///
/// `Self` contains a `Base` subobject at a fixed byte displacement. Casting a
/// pointer-to-`Self` into a pointer-to-`Base` adds that displacement before the
/// address is re-encoded relative to the destination slot; reinterpreting the
/// stored offset alone is wrong whenever the base does not sit at offset 0.
///
/// A blanket identity impl (`T: Subobject<T>`, displacement `0`) makes every
/// same-type assignment a degenerate cast. Types with no relation have no impl,
/// so casting between them is rejected at compile time.
///
/// # Deriving
///
/// `#[derive(Bases)]` implements this trait for every field tagged `#[base]`,
/// computing the displacement with `core::mem::offset_of!`:
///
/// ```
/// use selfrel::{Bases, Subobject};
///
/// #[repr(C)]
/// struct A { a: u64 }
/// #[repr(C)]
/// struct B { b: u64 }
///
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
/// assert_eq!(<C as Subobject<A>>::displacement(), 0);
/// assert_eq!(<C as Subobject<B>>::displacement(), size_of::<A>());
/// ```
///
/// # Rejected at compile time
///
/// Assigning between unrelated types:
///
/// ```compile_fail,E0277
/// use selfrel::OffsetPtr;
///
/// struct A(u64);
/// struct B(u64);
///
/// let mut a = A(1);
/// let mut p = OffsetPtr::<B>::null();
/// p.set(&mut a);
/// ```
///
/// Implicit conversion from base to derived (use
/// [`OffsetPtr::downcast`](crate::OffsetPtr::downcast)):
///
/// ```compile_fail,E0277
/// use selfrel::{Bases, OffsetPtr};
///
/// struct B(u64);
///
/// #[derive(Bases)]
/// struct C {
///   #[base]
///   b: B,
/// }
///
/// let mut b = B(1);
/// let mut p = OffsetPtr::<C>::null();
/// p.set(&mut b);
/// ```
///
/// Two bases of the same type, which would make the conversion ambiguous:
///
/// ```compile_fail,E0119
/// use selfrel::Bases;
///
/// struct A(u64);
///
/// #[derive(Bases)]
/// struct C {
///   #[base]
///   x: A,
///   #[base]
///   y: A,
/// }
/// ```
///
/// Deriving on an enum, on a struct with no `#[base]` field, or with
/// arguments on the attribute. These are macro diagnostics without an error
/// code; the derive crate's unit tests check their messages.
///
/// ```compile_fail
/// use selfrel::Bases;
///
/// #[derive(Bases)]
/// enum E {
///   V(#[base] u64),
/// }
/// ```
///
/// ```compile_fail
/// use selfrel::Bases;
///
/// #[derive(Bases)]
/// struct C {
///   a: u64,
/// }
/// ```
///
/// ```compile_fail
/// use selfrel::Bases;
///
/// #[derive(Bases)]
/// struct C {
///   #[base(virtual)]
///   a: u64,
/// }
/// ```
///
/// # Safety
///
/// For every valid, non-null `*mut Self` `p`, `p` plus
/// [`displacement`](Self::displacement) bytes must address a valid `Base`
/// that lives inside the object at `p`, and `displacement` must return the
/// same value on every call.
pub unsafe trait Subobject<Base>: Sized {
  /// Byte displacement of the `Base` subobject from the start of `Self`.
  fn displacement() -> usize;

  /// Adjust a pointer-to-`Self` into a pointer to its `Base` subobject.
  ///
  /// Null maps to null. Only the address changes; the pointer is never
  /// dereferenced.
  #[inline]
  fn upcast(derived: *mut Self) -> *mut Base {
    if derived.is_null() {
      return core::ptr::null_mut();
    }
    derived.wrapping_byte_add(Self::displacement()).cast()
  }

  /// Adjust a pointer to a `Base` subobject back to its enclosing `Self`.
  ///
  /// Null maps to null.
  ///
  /// # Safety
  ///
  /// A non-null `base` must address the `Base` subobject of a live `Self`.
  /// Any other pointer produces an address that is not a `Self`.
  #[inline]
  unsafe fn downcast(base: *mut Base) -> *mut Self {
    if base.is_null() {
      return core::ptr::null_mut();
    }
    base.wrapping_byte_sub(Self::displacement()).cast()
  }
}

// SAFETY: A value is its own subobject at displacement 0.
unsafe impl<T> Subobject<T> for T {
  #[inline]
  fn displacement() -> usize {
    0
  }
}
