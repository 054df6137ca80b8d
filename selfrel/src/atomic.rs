use core::{
  fmt,
  marker::{PhantomData, PhantomPinned},
  sync::atomic::{AtomicIsize, Ordering},
};

use crate::{OffsetPtr, Target, raw};

/// A self-relative pointer stored in an atomic word.
///
/// # Layout
///
/// `#[repr(transparent)]` over `AtomicIsize`: the same single-word
/// representation as [`OffsetPtr<T>`], naturally aligned, so no load ever
/// observes a torn offset.
///
/// # Relocation
///
/// The stored offset is relative to the atomic cell. Every read resolves the
/// offset against the cell before handing out an address ([`load`](Self::load)
/// returns it raw, [`load_into`](Self::load_into) re-encodes it into a caller
/// slot). Every write encodes the incoming target against the cell. The same
/// rule applies to the old values returned by [`exchange`](Self::exchange),
/// the `fetch_*` family, and a failed compare-exchange.
///
/// # Ordering
///
/// Each operation takes an explicit [`Ordering`] and adds no fencing of its
/// own. The usual publication pattern is `Release` on the store or successful
/// CAS that publishes a node and `Acquire` on the load that reads it.
///
/// # Examples
///
/// A lock-free stack push: link the new node to the observed head, then
/// publish it with a weak compare-exchange, retrying on contention.
///
/// ```
/// use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
///
/// use selfrel::{AtomicOffsetPtr, OffsetPtr};
///
/// struct Node {
///   value: u32,
///   next: OffsetPtr<Node>,
/// }
///
/// let head = AtomicOffsetPtr::<Node>::null();
/// let node = Box::into_raw(Box::new(Node { value: 7, next: OffsetPtr::null() }));
///
/// let mut observed = head.load(Acquire);
/// loop {
///   // SAFETY: `node` is not yet published, so this thread owns it.
///   unsafe { (*node).next.set(observed) };
///   match head.compare_exchange_weak(observed, node, Release, Relaxed) {
///     Ok(_) => break,
///     Err(actual) => observed = actual,
///   }
/// }
///
/// let top = head.load(Acquire);
/// // SAFETY: `top` is the node pushed above.
/// assert_eq!(unsafe { (*top).value }, 7);
/// // SAFETY: reclaim the node; nothing else references it.
/// drop(unsafe { Box::from_raw(top) });
/// ```
#[repr(transparent)]
pub struct AtomicOffsetPtr<T> {
  offset: AtomicIsize,
  _type: PhantomData<*mut T>,
  _pin: PhantomPinned,
}

// SAFETY: All access to the offset word is atomic. Like `AtomicPtr<T>`, the
// cell only hands out raw pointers, so no bound on `T` is needed.
unsafe impl<T> Send for AtomicOffsetPtr<T> {}
// SAFETY: See above.
unsafe impl<T> Sync for AtomicOffsetPtr<T> {}

impl<T> AtomicOffsetPtr<T> {
  /// A null atomic pointer.
  #[must_use]
  pub const fn null() -> Self {
    Self { offset: AtomicIsize::new(0), _type: PhantomData, _pin: PhantomPinned }
  }

  /// Whether atomic operations on the backing word are lock-free on this
  /// target.
  #[must_use]
  pub const fn is_lock_free() -> bool {
    cfg!(target_has_atomic = "ptr")
  }

  #[inline]
  fn slot(&self) -> usize {
    core::ptr::from_ref(&self.offset).addr()
  }

  /// Encode a target relative to this cell.
  ///
  /// Panics on a target inside the cell, like [`OffsetPtr::set`].
  #[inline]
  fn encode(&self, target: impl Target<T>) -> isize {
    let addr = target.into_target().expose_provenance();
    match raw::encode(self.slot(), addr) {
      Ok(offset) => offset,
      Err(err) => panic!("{err}"),
    }
  }

  #[inline]
  fn decode(&self, offset: isize) -> *mut T {
    raw::resolve(raw::decode(self.slot(), offset))
  }

  /// Atomically read the resolved target.
  #[must_use]
  pub fn load(&self, order: Ordering) -> *mut T {
    self.decode(self.offset.load(order))
  }

  /// Atomically read the target and store it into `dst`, re-encoded relative
  /// to `dst`'s own address.
  ///
  /// # Panics
  ///
  /// Panics if the loaded target is one byte past the start of `dst`.
  pub fn load_into(&self, dst: &mut OffsetPtr<T>, order: Ordering) {
    dst.set(self.load(order));
  }

  /// Atomically store `target`, encoded relative to this cell.
  ///
  /// # Panics
  ///
  /// Panics if `target` is one byte past the start of this cell.
  pub fn store(&self, target: impl Target<T>, order: Ordering) {
    self.offset.store(self.encode(target), order);
  }

  /// Atomically store `target` and return the previous resolved target.
  ///
  /// # Panics
  ///
  /// Panics if `target` is one byte past the start of this cell.
  pub fn exchange(&self, target: impl Target<T>, order: Ordering) -> *mut T {
    self.decode(self.offset.swap(self.encode(target), order))
  }

  /// Store `new` if the cell currently resolves to the same address as
  /// `current`.
  ///
  /// Both sides are compared as resolved addresses. Since the cell's address
  /// is fixed, that is the same as comparing their offsets relative to the
  /// cell, which is what the hardware CAS does.
  ///
  /// # Errors
  ///
  /// On mismatch returns `Err` with the cell's actual resolved target. The
  /// caller can write it back into its own expected slot and retry.
  ///
  /// # Panics
  ///
  /// Panics if `current` or `new` is one byte past the start of this cell.
  pub fn compare_exchange(
    &self,
    current: impl Target<T>,
    new: impl Target<T>,
    success: Ordering,
    failure: Ordering,
  ) -> Result<*mut T, *mut T> {
    self
      .offset
      .compare_exchange(self.encode(current), self.encode(new), success, failure)
      .map(|old| self.decode(old))
      .map_err(|actual| self.decode(actual))
  }

  /// Like [`compare_exchange`](Self::compare_exchange) but may fail
  /// spuriously even when the addresses match. Use in a retry loop.
  ///
  /// # Errors
  ///
  /// On failure returns `Err` with the cell's actual resolved target.
  ///
  /// # Panics
  ///
  /// Panics if `current` or `new` is one byte past the start of this cell.
  pub fn compare_exchange_weak(
    &self,
    current: impl Target<T>,
    new: impl Target<T>,
    success: Ordering,
    failure: Ordering,
  ) -> Result<*mut T, *mut T> {
    self
      .offset
      .compare_exchange_weak(self.encode(current), self.encode(new), success, failure)
      .map(|old| self.decode(old))
      .map_err(|actual| self.decode(actual))
  }

  /// [`compare_exchange`](Self::compare_exchange) with the expected value held
  /// in a self-relative slot. Returns whether `desired` was installed.
  ///
  /// On failure `expected` is overwritten with the cell's actual target,
  /// re-encoded against `expected`'s own address, ready for the next attempt.
  ///
  /// # Panics
  ///
  /// Panics if `desired` is one byte past the start of this cell, or if the
  /// actual target is one byte past the start of `expected`.
  pub fn compare_exchange_in_place(
    &self,
    expected: &mut OffsetPtr<T>,
    desired: impl Target<T>,
    success: Ordering,
    failure: Ordering,
  ) -> bool {
    match self.compare_exchange(&*expected, desired, success, failure) {
      Ok(_) => true,
      Err(actual) => {
        expected.set(actual);
        false
      }
    }
  }

  /// Weak form of [`compare_exchange_in_place`](Self::compare_exchange_in_place).
  /// May fail spuriously, in which case `expected` is rewritten with the same
  /// target it already held.
  ///
  /// # Panics
  ///
  /// Same as [`compare_exchange_in_place`](Self::compare_exchange_in_place).
  pub fn compare_exchange_weak_in_place(
    &self,
    expected: &mut OffsetPtr<T>,
    desired: impl Target<T>,
    success: Ordering,
    failure: Ordering,
  ) -> bool {
    match self.compare_exchange_weak(&*expected, desired, success, failure) {
      Ok(_) => true,
      Err(actual) => {
        expected.set(actual);
        false
      }
    }
  }

  /// Atomically advance by `count` elements of `T`, returning the previous
  /// resolved target.
  ///
  /// Moving the target does not move the cell, so this is a plain atomic add
  /// on the offset. Landing on the cell's own address, as a cursor over an
  /// array that directly precedes the cell does at one past the end, is a
  /// regular position. Not bounds-checked: a null cell becomes a dangling
  /// non-null address, and stepping byte-sized elements onto `cell + 1` reads
  /// back as null.
  pub fn fetch_add(&self, count: isize, order: Ordering) -> *mut T {
    let bytes = count.wrapping_mul(size_of::<T>().cast_signed());
    self.decode(self.offset.fetch_add(bytes, order))
  }

  /// Atomically step back by `count` elements of `T`, returning the previous
  /// resolved target.
  pub fn fetch_sub(&self, count: isize, order: Ordering) -> *mut T {
    let bytes = count.wrapping_mul(size_of::<T>().cast_signed());
    self.decode(self.offset.fetch_sub(bytes, order))
  }

  /// Apply `f` to the resolved target until the result is installed with a
  /// weak compare-exchange, or `f` returns `None`.
  ///
  /// # Errors
  ///
  /// Returns `Err` with the last observed target if `f` returned `None`.
  ///
  /// # Panics
  ///
  /// Panics if `f` returns one byte past the start of this cell.
  pub fn fetch_update<F>(
    &self,
    set_order: Ordering,
    fetch_order: Ordering,
    mut f: F,
  ) -> Result<*mut T, *mut T>
  where
    F: FnMut(*mut T) -> Option<*mut T>,
  {
    let mut prev = self.load(fetch_order);
    while let Some(next) = f(prev) {
      match self.compare_exchange_weak(prev, next, set_order, fetch_order) {
        Ok(old) => return Ok(old),
        Err(actual) => prev = actual,
      }
    }
    Err(prev)
  }

  /// Exclusive, non-atomic access to the pointer.
  ///
  /// The returned `OffsetPtr` lives at the same address as the atomic word,
  /// so its offset stays valid as is.
  pub fn get_mut(&mut self) -> &mut OffsetPtr<T> {
    let word = core::ptr::from_mut(self.offset.get_mut());
    // SAFETY: `OffsetPtr<T>` is `repr(transparent)` over `RawOffsetPtr`, which
    // is `repr(transparent)` over `isize`. `AtomicIsize::get_mut` yields the
    // same word, and `&mut self` guarantees no concurrent access.
    unsafe { &mut *word.cast::<OffsetPtr<T>>() }
  }
}

impl<T> Default for AtomicOffsetPtr<T> {
  fn default() -> Self {
    Self::null()
  }
}

impl<T> fmt::Debug for AtomicOffsetPtr<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    fmt::Pointer::fmt(&self.load(Ordering::Relaxed), f)
  }
}
