use core::fmt;

/// Error returned by [`OffsetPtr::try_set`](crate::OffsetPtr::try_set) and
/// [`RawOffsetPtr::try_set_raw`](crate::RawOffsetPtr::try_set_raw).
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OffsetError {
  /// The target is the byte right after the start of the pointer's own slot.
  /// Its encoding collides with null, so it cannot be stored. No object can
  /// start there: those bytes belong to the pointer itself.
  InsideSlot {
    /// Address of the pointer slot.
    slot: usize,
  },
}

impl fmt::Display for OffsetError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::InsideSlot { slot } => {
        write!(f, "self-relative pointer at {slot:#x} cannot target the inside of its own slot")
      }
    }
  }
}

impl core::error::Error for OffsetError {}
