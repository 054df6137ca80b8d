use core::{
  cmp::Ordering,
  fmt,
  hash::{Hash, Hasher},
  marker::PhantomData,
  ops::{Add, AddAssign, Sub, SubAssign},
  ptr::NonNull,
};

use crate::{OffsetError, RawOffsetPtr, Subobject, Target, raw};

/// A typed self-relative pointer.
///
/// # Layout
///
/// `#[repr(transparent)]` over [`RawOffsetPtr`], one pointer-sized word:
///
/// | Offset | Field    | Type    |
/// |--------|----------|---------|
/// | 0      | `offset` | `isize` |
///
/// The offset is relative to the address of the pointer itself, so a structure
/// holding both the pointer and its target can be mapped at any base address
/// and the link stays valid with no fixup. `0` is null.
///
/// # Relocation
///
/// `OffsetPtr<T>` is **not** `Copy` or `Clone`. A Rust move is a byte copy,
/// and a byte copy of a non-null pointer to a different slot resolves to the
/// wrong address. Pointers live where they are written (inside a mapped
/// region, a struct field, a stack slot) and are written in place:
///
/// - [`set`](Self::set) stores a target encoded against `self`'s address.
///   Passing another `&OffsetPtr` copies it: the source is resolved, then
///   re-encoded at the destination.
/// - [`null`](Self::null) is the only by-value constructor. A null pointer is
///   location-independent and may be moved freely.
///
/// Moving the whole block that contains both pointer and pointee is fine: the
/// displacement between them does not change.
///
/// # Arithmetic
///
/// `+=`, `-=`, [`inc`](Self::inc), [`dec`](Self::dec),
/// [`post_inc`](Self::post_inc) and [`post_dec`](Self::post_dec) move the
/// pointer in place by whole elements of `T`, like native pointer arithmetic.
/// `&p + n` and `&p - n` produce the resolved `*mut T` without touching `p`;
/// storing that into another slot is that slot's [`set`](Self::set). `&p - &q`
/// is the element distance. None of these are bounds-checked.
///
/// # Examples
///
/// ```
/// use selfrel::OffsetPtr;
///
/// let mut arr = [10u32, 20, 30, 40];
/// let mut p = OffsetPtr::<u32>::null();
/// assert!(p.is_null());
///
/// p.set(&raw mut arr[0]);
/// assert_eq!(p.get(), &raw mut arr[0]);
///
/// p += 2;
/// // SAFETY: `p` points into `arr`.
/// assert_eq!(unsafe { *p.get() }, 30);
///
/// let mut q = OffsetPtr::<u32>::null();
/// q.set(&p);
/// assert_eq!(p, q);
/// assert_ne!(p.offset(), q.offset());
/// ```
///
/// Copying by value does not compile:
///
/// ```compile_fail,E0599
/// use selfrel::OffsetPtr;
///
/// let mut x = 1u32;
/// let mut p = OffsetPtr::<u32>::null();
/// p.set(&raw mut x);
/// let q = p.clone();
/// ```
#[repr(transparent)]
pub struct OffsetPtr<T> {
  raw: RawOffsetPtr,
  _type: PhantomData<*mut T>,
}

// SAFETY: OffsetPtr holds a single integer. Sending or sharing it is as safe as
// sending or sharing the `T` it may be used to reach.
unsafe impl<T: Send + Sync> Send for OffsetPtr<T> {}
// SAFETY: See above. Mutation through `&OffsetPtr` is impossible.
unsafe impl<T: Send + Sync> Sync for OffsetPtr<T> {}

impl<T> OffsetPtr<T> {
  /// A null pointer.
  #[must_use]
  pub const fn null() -> Self {
    Self { raw: RawOffsetPtr::null(), _type: PhantomData }
  }

  /// Returns `true` if the pointer is null.
  #[must_use]
  pub const fn is_null(&self) -> bool {
    self.raw.is_null()
  }

  /// The raw stored displacement in bytes, relative to this slot.
  #[must_use]
  pub const fn offset(&self) -> isize {
    self.raw.offset()
  }

  /// The type-erased view of this slot.
  #[must_use]
  pub const fn as_raw(&self) -> &RawOffsetPtr {
    &self.raw
  }

  /// Mutable type-erased view of this slot.
  #[must_use]
  pub const fn as_raw_mut(&mut self) -> &mut RawOffsetPtr {
    &mut self.raw
  }

  /// Resolve to an absolute pointer: this slot's address plus the stored
  /// offset, or null. Never dereferences anything.
  #[inline]
  #[must_use]
  pub fn get(&self) -> *mut T {
    raw::resolve(self.raw.addr())
  }

  /// Resolve to a `NonNull`, or `None` for a null pointer.
  #[must_use]
  pub fn as_non_null(&self) -> Option<NonNull<T>> {
    NonNull::new(self.get())
  }

  /// Resolve with the element type erased.
  #[must_use]
  pub fn to_void_ptr(&self) -> *mut () {
    self.raw.to_void_ptr()
  }

  /// Borrow the target.
  ///
  /// # Safety
  ///
  /// A non-null pointer must resolve to a live, initialized `T` that is not
  /// mutated for the returned lifetime.
  #[must_use]
  pub unsafe fn as_ref(&self) -> Option<&T> {
    // SAFETY: Caller guarantees the target is valid for reads.
    unsafe { self.get().as_ref() }
  }

  /// Mutably borrow the target.
  ///
  /// # Safety
  ///
  /// A non-null pointer must resolve to a live, initialized `T` with no other
  /// reference to it for the returned lifetime.
  #[must_use]
  pub unsafe fn as_mut(&mut self) -> Option<&mut T> {
    // SAFETY: Caller guarantees exclusive access to the target.
    unsafe { self.get().as_mut() }
  }

  /// Point at `target`, encoding it relative to this slot.
  ///
  /// `target` may be a raw pointer, a reference, or another self-relative
  /// pointer of the same or a derived type (see [`Target`]).
  ///
  /// # Errors
  ///
  /// Returns [`OffsetError::InsideSlot`] if the target is one byte past the
  /// start of this slot. The pointer is left unchanged.
  pub fn try_set(&mut self, target: impl Target<T>) -> Result<(), OffsetError> {
    self.raw.try_set_raw(target.into_target().cast())
  }

  /// Point at `target`, encoding it relative to this slot.
  ///
  /// # Panics
  ///
  /// Panics if the target is one byte past the start of this slot.
  ///
  /// # Examples
  ///
  /// ```
  /// use selfrel::OffsetPtr;
  ///
  /// let mut x = 1u64;
  /// let mut a = OffsetPtr::<u64>::null();
  /// let mut b = OffsetPtr::<u64>::null();
  ///
  /// a.set(&mut x);
  /// b.set(&a); // copy: re-encoded against `b`'s own address
  /// assert_eq!(b.get(), &raw mut x);
  /// ```
  pub fn set(&mut self, target: impl Target<T>) {
    if let Err(err) = self.try_set(target) {
      panic!("{err}");
    }
  }

  /// Reset to null.
  pub const fn set_null(&mut self) {
    self.raw.set_null();
  }

  /// Point at `target` and return the previously resolved target.
  ///
  /// # Panics
  ///
  /// Panics if the target is one byte past the start of this slot.
  pub fn replace(&mut self, target: impl Target<T>) -> *mut T {
    let old = self.get();
    self.set(target);
    old
  }

  /// Exchange resolved targets with `other`. Both offsets are recomputed
  /// against their own slots; the raw bits are not swapped.
  ///
  /// # Panics
  ///
  /// Panics if either pointer resolves to the inside of the other's slot.
  pub fn swap(&mut self, other: &mut Self) {
    self.raw.swap(&mut other.raw);
  }

  /// Resolve and adjust to the `B` subobject of the target. Null stays null.
  #[must_use]
  pub fn upcast<B>(&self) -> *mut B
  where
    T: Subobject<B>,
  {
    <T as Subobject<B>>::upcast(self.get())
  }

  /// Resolve and adjust from a `T` subobject back to its enclosing `D`.
  ///
  /// # Safety
  ///
  /// A non-null pointer must resolve to the `T` subobject of a live `D`.
  #[must_use]
  pub unsafe fn downcast<D>(&self) -> *mut D
  where
    D: Subobject<T>,
  {
    // SAFETY: Forwarded to the caller.
    unsafe { <D as Subobject<T>>::downcast(self.get()) }
  }

  /// Resolved address moved by `count` elements. `self` is unchanged.
  ///
  /// Same as `&self + count`.
  #[inline]
  #[must_use]
  pub fn wrapping_offset(&self, count: isize) -> *mut T {
    self.get().wrapping_offset(count)
  }

  /// Distance in elements from `origin`'s resolved address to `self`'s.
  ///
  /// Same as `&self - origin`. A byte distance that is not a whole number of
  /// elements is truncated toward zero. Rejected at compile time for
  /// zero-sized `T`.
  ///
  /// # Examples
  ///
  /// ```
  /// use selfrel::OffsetPtr;
  ///
  /// let mut arr = [0u16; 8];
  /// let mut begin = OffsetPtr::<u16>::null();
  /// let mut end = OffsetPtr::<u16>::null();
  /// begin.set(&raw mut arr[0]);
  /// end.set(begin.wrapping_offset(8));
  ///
  /// assert_eq!(end.offset_from(&begin), 8);
  /// assert_eq!(&begin - &end, -8);
  /// ```
  #[must_use]
  pub fn offset_from(&self, origin: &Self) -> isize {
    const { assert!(size_of::<T>() != 0, "element distance of a zero-sized type") };
    let bytes = self.raw.addr().wrapping_sub(origin.raw.addr()).cast_signed();
    bytes / size_of::<T>().cast_signed()
  }

  /// Pre-increment: advance by one element, then return `self`.
  pub fn inc(&mut self) -> &mut Self {
    *self += 1;
    self
  }

  /// Pre-decrement: step back by one element, then return `self`.
  pub fn dec(&mut self) -> &mut Self {
    *self -= 1;
    self
  }

  /// Post-increment: advance by one element and return the previous resolved
  /// address.
  pub fn post_inc(&mut self) -> *mut T {
    let old = self.get();
    *self += 1;
    old
  }

  /// Post-decrement: step back by one element and return the previous
  /// resolved address.
  pub fn post_dec(&mut self) -> *mut T {
    let old = self.get();
    *self -= 1;
    old
  }
}

impl<T> Default for OffsetPtr<T> {
  fn default() -> Self {
    Self::null()
  }
}

impl<T> AddAssign<isize> for OffsetPtr<T> {
  /// # Panics
  ///
  /// Panics if the result lands one byte past the start of this slot, which
  /// only an out-of-bounds step over `u8`-sized elements can reach.
  fn add_assign(&mut self, count: isize) {
    let target = self.wrapping_offset(count);
    self.set(target);
  }
}

impl<T> SubAssign<isize> for OffsetPtr<T> {
  /// # Panics
  ///
  /// Panics if the result lands one byte past the start of this slot, which
  /// only an out-of-bounds step over `u8`-sized elements can reach.
  fn sub_assign(&mut self, count: isize) {
    let target = self.wrapping_offset(count.wrapping_neg());
    self.set(target);
  }
}

impl<T> Add<isize> for &OffsetPtr<T> {
  type Output = *mut T;

  fn add(self, count: isize) -> *mut T {
    self.wrapping_offset(count)
  }
}

impl<T> Sub<isize> for &OffsetPtr<T> {
  type Output = *mut T;

  fn sub(self, count: isize) -> *mut T {
    self.wrapping_offset(count.wrapping_neg())
  }
}

impl<T> Sub for &OffsetPtr<T> {
  type Output = isize;

  fn sub(self, origin: Self) -> isize {
    self.offset_from(origin)
  }
}

// --- Comparisons: always by resolved address, never by raw offset ---

impl<T> PartialEq for OffsetPtr<T> {
  fn eq(&self, other: &Self) -> bool {
    self.raw.addr() == other.raw.addr()
  }
}

impl<T> Eq for OffsetPtr<T> {}

impl<T> PartialOrd for OffsetPtr<T> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl<T> Ord for OffsetPtr<T> {
  fn cmp(&self, other: &Self) -> Ordering {
    self.raw.addr().cmp(&other.raw.addr())
  }
}

impl<T> Hash for OffsetPtr<T> {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.raw.addr().hash(state);
  }
}

impl<T> PartialEq<*mut T> for OffsetPtr<T> {
  fn eq(&self, other: &*mut T) -> bool {
    self.raw.addr() == other.addr()
  }
}

impl<T> PartialEq<OffsetPtr<T>> for *mut T {
  fn eq(&self, other: &OffsetPtr<T>) -> bool {
    self.addr() == other.raw.addr()
  }
}

impl<T> PartialOrd<*mut T> for OffsetPtr<T> {
  fn partial_cmp(&self, other: &*mut T) -> Option<Ordering> {
    Some(self.raw.addr().cmp(&other.addr()))
  }
}

impl<T> PartialOrd<OffsetPtr<T>> for *mut T {
  fn partial_cmp(&self, other: &OffsetPtr<T>) -> Option<Ordering> {
    Some(self.addr().cmp(&other.raw.addr()))
  }
}

impl<T> fmt::Debug for OffsetPtr<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Pointer::fmt(&self.get(), f)
  }
}

impl<T> fmt::Pointer for OffsetPtr<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Pointer::fmt(&self.get(), f)
  }
}
