//! Self-relative pointers for relocatable data structures.
//!
//! `selfrel` provides [`OffsetPtr<T>`], a pointer whose stored value is the
//! signed byte offset from the pointer's own address to its target, biased
//! by one. A block of
//! memory holding both a pointer and its target can be mapped at a different
//! base address on every run (persistent memory, shared memory, a file mapped
//! with `mmap`) and every internal link still resolves, with no swizzling pass
//! at load time.
//!
//! # Types
//!
//! | Type                   | Role                                                    |
//! |------------------------|---------------------------------------------------------|
//! | [`OffsetPtr<T>`]       | Typed pointer: resolve, assign, arithmetic, comparisons |
//! | [`RawOffsetPtr`]       | Type-erased slot for heterogeneous pointer arrays       |
//! | [`AtomicOffsetPtr<T>`] | Atomic word for lock-free structures                    |
//! | [`Subobject<Base>`]    | Layout query for base/derived pointer adjustment        |
//! | [`Target<T>`]          | Anything that names a target address                    |
//!
//! # Relocation model
//!
//! The reference point of a self-relative pointer is its own slot, which moves
//! whenever the pointer is copied. Copying the raw offset to a new slot is
//! **wrong** unless both slots share an address. So the pointer types are not
//! `Copy` or `Clone`; a copy is written in place with [`OffsetPtr::set`],
//! which resolves the source and re-encodes it against the destination.
//! Moving the *whole* region that holds both ends of a link is always fine.
//!
//! The stored word is `target - slot - 1`, so `0` encodes null and a pointer
//! may target its own slot, which is where a one-past-the-end cursor lands when
//! it is the field right after its array. The one address left out is
//! `slot + 1`, inside the pointer itself.
//!
//! # Safety model
//!
//! Resolving a pointer is safe and yields a raw `*mut T`. Dereferencing is the
//! caller's obligation, exactly as with native raw pointers: null targets and
//! arithmetic past the end of an object are undefined behavior, not errors.
//!
//! **Provenance**: `&self.offset` has provenance over only one word, while the
//! target may be anywhere. Every store exposes the target's provenance with
//! `expose_provenance`, and every resolve recovers it with
//! `with_exposed_provenance_mut`.
//!
//! **Casts**: Rust has no inheritance. A "base" is a field embedded in the
//! derived struct, declared with `#[derive(Bases)]` and `#[base]`. The
//! displacement comes from `offset_of!`, so whatever layout the compiler
//! chooses is honored. Casting between types with no [`Subobject`] relation
//! does not compile.
//!
//! # Example
//!
//! ```
//! use selfrel::{Bases, OffsetPtr, RawOffsetPtr};
//!
//! #[repr(C)]
//! struct A { a: u64 }
//! #[repr(C)]
//! struct B { b: u64 }
//!
//! #[derive(Bases)]
//! #[repr(C)]
//! struct C {
//!   #[base]
//!   a: A,
//!   #[base]
//!   b: B,
//!   c: u64,
//! }
//!
//! let mut c = C { a: A { a: 1 }, b: B { b: 2 }, c: 3 };
//! let mut cptr = OffsetPtr::<C>::null();
//! let mut bptr = OffsetPtr::<B>::null();
//!
//! cptr.set(&mut c);
//! bptr.set(&cptr); // upcast: adds the displacement of `b` inside `C`
//!
//! assert_eq!(bptr.get(), &raw mut c.b);
//! assert_eq!(RawOffsetPtr::distance_between(cptr.as_raw(), bptr.as_raw()), 8);
//! ```

#![cfg_attr(not(test), no_std)]
#![deny(missing_docs)]

extern crate self as selfrel;

mod atomic;
mod error;
mod ptr;
mod raw;
mod subobject;
mod target;

pub use atomic::AtomicOffsetPtr;
pub use error::OffsetError;
pub use ptr::OffsetPtr;
pub use raw::RawOffsetPtr;
#[cfg(feature = "derive")]
pub use selfrel_derive::Bases;
pub use subobject::Subobject;
pub use target::Target;
