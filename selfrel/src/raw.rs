use core::{fmt, marker::PhantomPinned};

use crate::{OffsetError, OffsetPtr};

/// Encode the absolute address `target` as a biased displacement from `slot`:
/// `target - slot - 1`.
///
/// `target == 0` encodes null as `0`. The bias keeps the slot's own address
/// encodable (as `-1`), so a one-past-the-end position that happens to be the
/// slot is a regular target. The only non-null target whose encoding collides
/// with null is `slot + 1`, inside the pointer's own storage, and it is
/// rejected.
#[inline]
pub(crate) fn encode(slot: usize, target: usize) -> Result<isize, OffsetError> {
  if target == 0 {
    return Ok(0);
  }
  match target.wrapping_sub(slot).wrapping_sub(1).cast_signed() {
    0 => Err(OffsetError::InsideSlot { slot }),
    offset => Ok(offset),
  }
}

/// Resolve a stored displacement against the address of its slot.
#[inline]
pub(crate) const fn decode(slot: usize, offset: isize) -> usize {
  if offset == 0 { 0 } else { slot.wrapping_add_signed(offset).wrapping_add(1) }
}

/// Recover a pointer with the provenance exposed when the address was stored.
#[inline]
pub(crate) fn resolve<T>(addr: usize) -> *mut T {
  if addr == 0 {
    return core::ptr::null_mut();
  }
  core::ptr::with_exposed_provenance_mut::<T>(addr)
}

/// An untyped self-relative pointer.
///
/// # Layout
///
/// `#[repr(transparent)]`, one pointer-sized word:
///
/// | Offset | Field    | Type    |
/// |--------|----------|---------|
/// | 0      | `offset` | `isize` |
///
/// `offset` is the target address minus the address of `offset` itself,
/// minus one. `0` is null and `-1` is the slot's own address, which is where
/// a one-past-the-end pointer lands when the slot directly follows its array.
/// Only `slot + 1` cannot be stored; see [`OffsetError::InsideSlot`].
///
/// [`OffsetPtr<T>`] is `#[repr(transparent)]` over this type, so an array of
/// `RawOffsetPtr` can hold pointers to differently-typed targets and each
/// slot can be reinterpreted with [`cast`](Self::cast) in place.
///
/// `RawOffsetPtr` is **not** `Copy` or `Clone`: the stored bits are only
/// meaningful at the address they were written for. Copying a pointer to a new
/// slot goes through [`assign`](Self::assign), which re-encodes the resolved
/// target against the destination.
///
/// # Soundness
///
/// Every store exposes the target's provenance and every resolve recovers it
/// with `with_exposed_provenance_mut`. A pointer derived from `&self.offset`
/// would carry provenance over only the 8 bytes of the slot.
#[repr(transparent)]
pub struct RawOffsetPtr {
  offset: isize,
  _pin: PhantomPinned,
}

impl RawOffsetPtr {
  /// A null pointer. Location-independent, so it is safe to move.
  #[must_use]
  pub const fn null() -> Self {
    Self { offset: 0, _pin: PhantomPinned }
  }

  /// Returns `true` if the pointer is null.
  #[must_use]
  pub const fn is_null(&self) -> bool {
    self.offset == 0
  }

  /// The raw stored displacement, relative to this slot and biased by one
  /// (`target - slot - 1`).
  ///
  /// Two pointers at different slots that resolve to the same address have
  /// different offsets. Compare resolved addresses, not offsets.
  #[must_use]
  pub const fn offset(&self) -> isize {
    self.offset
  }

  #[inline]
  pub(crate) fn slot(&self) -> usize {
    core::ptr::from_ref(self).addr()
  }

  /// Resolved absolute address, `0` for null.
  #[inline]
  pub(crate) fn addr(&self) -> usize {
    decode(self.slot(), self.offset)
  }

  /// Resolve the pointer to an untyped byte address.
  ///
  /// # Examples
  ///
  /// ```
  /// use selfrel::RawOffsetPtr;
  ///
  /// let mut value = 7u32;
  /// let mut ptr = RawOffsetPtr::null();
  /// assert!(ptr.to_byte_ptr().is_null());
  ///
  /// ptr.set_raw((&raw mut value).cast());
  /// assert_eq!(ptr.to_byte_ptr(), (&raw mut value).cast::<u8>());
  /// ```
  #[must_use]
  pub fn to_byte_ptr(&self) -> *mut u8 {
    resolve(self.addr())
  }

  /// Resolve the pointer with its type erased. Null stays null.
  #[must_use]
  pub fn to_void_ptr(&self) -> *mut () {
    resolve(self.addr())
  }

  /// Point at `target`, encoding it relative to this slot.
  ///
  /// # Errors
  ///
  /// Returns [`OffsetError::InsideSlot`] if `target` is `slot + 1`. The
  /// stored offset is left unchanged.
  pub fn try_set_raw(&mut self, target: *mut u8) -> Result<(), OffsetError> {
    let slot = self.slot();
    self.offset = encode(slot, target.expose_provenance())?;
    Ok(())
  }

  /// Point at `target`, encoding it relative to this slot.
  ///
  /// # Panics
  ///
  /// Panics if `target` is `slot + 1`, inside this slot.
  pub fn set_raw(&mut self, target: *mut u8) {
    if let Err(err) = self.try_set_raw(target) {
      panic!("{err}");
    }
  }

  /// Reset to null.
  pub const fn set_null(&mut self) {
    self.offset = 0;
  }

  /// Copy `src` into this slot: resolve `src`, then re-encode the address
  /// relative to `self`. A null source yields null regardless of location.
  ///
  /// # Panics
  ///
  /// Panics if `src` resolves to the inside of this slot.
  pub fn assign(&mut self, src: &Self) {
    self.set_raw(src.to_byte_ptr());
  }

  /// Exchange the resolved targets of two pointers. Each keeps living at its
  /// own address, so both offsets are recomputed.
  ///
  /// # Panics
  ///
  /// Panics if either pointer resolves to the inside of the other's slot.
  pub fn swap(&mut self, other: &mut Self) {
    let mine = self.to_byte_ptr();
    let theirs = other.to_byte_ptr();
    self.set_raw(theirs);
    other.set_raw(mine);
  }

  /// Signed byte displacement from `first`'s resolved address to `second`'s.
  ///
  /// When both pointers view the same object through different subobject
  /// types, this is the subobject displacement.
  ///
  /// # Examples
  ///
  /// ```
  /// use selfrel::{OffsetPtr, RawOffsetPtr};
  ///
  /// let mut arr = [0u64; 4];
  /// let mut first = OffsetPtr::<u64>::null();
  /// let mut last = OffsetPtr::<u64>::null();
  /// first.set(&raw mut arr[0]);
  /// last.set(&raw mut arr[3]);
  ///
  /// assert_eq!(RawOffsetPtr::distance_between(first.as_raw(), last.as_raw()), 24);
  /// assert_eq!(RawOffsetPtr::distance_between(last.as_raw(), first.as_raw()), -24);
  /// ```
  #[must_use]
  pub fn distance_between(first: &Self, second: &Self) -> isize {
    second.addr().wrapping_sub(first.addr()).cast_signed()
  }

  /// View this slot as a typed pointer.
  ///
  /// The resolved address is unchanged; only the element type used by
  /// arithmetic and dereference differs. Nothing checks that the target
  /// actually is a `T`: dereferencing the result is `unsafe` for that reason.
  #[must_use]
  pub const fn cast<T>(&self) -> &OffsetPtr<T> {
    // SAFETY: `OffsetPtr<T>` is `repr(transparent)` over `RawOffsetPtr`, so
    // the reference points to a valid `OffsetPtr<T>` at the same address.
    unsafe { &*core::ptr::from_ref(self).cast::<OffsetPtr<T>>() }
  }

  /// Mutable variant of [`cast`](Self::cast).
  #[must_use]
  pub const fn cast_mut<T>(&mut self) -> &mut OffsetPtr<T> {
    // SAFETY: Same layout argument as `cast`.
    unsafe { &mut *core::ptr::from_mut(self).cast::<OffsetPtr<T>>() }
  }
}

impl Default for RawOffsetPtr {
  fn default() -> Self {
    Self::null()
  }
}

impl PartialEq for RawOffsetPtr {
  fn eq(&self, other: &Self) -> bool {
    self.addr() == other.addr()
  }
}

impl Eq for RawOffsetPtr {}

impl fmt::Debug for RawOffsetPtr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Pointer::fmt(&self.to_void_ptr(), f)
  }
}

impl fmt::Pointer for RawOffsetPtr {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Pointer::fmt(&self.to_void_ptr(), f)
  }
}
