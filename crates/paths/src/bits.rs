//! Bit-rounding primitives.

/// Largest power of two `<= value`, or `0` for `0`.
///
/// Total over `u8`: the empty set rounds to the empty set.
#[inline]
#[must_use]
pub(crate) const fn round_down_pot(value: u8) -> u8 {
  if value == 0 {
    0
  } else {
    1u8 << (u8::BITS - 1 - value.leading_zeros())
  }
}
