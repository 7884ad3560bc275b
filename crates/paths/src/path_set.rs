//! The [`PathSet`] bitmask and the per-target [`ALL_PATHS`] table.

use core::fmt;

use crate::bits::round_down_pot;

// ─────────────────────────────────────────────────────────────────────────────
// Core Path Type
// ─────────────────────────────────────────────────────────────────────────────

/// A set of implementation paths, one bit per path.
///
/// A single-bit value names one path; any other value is a set of candidates.
/// [`PathSet::NONE`] is the empty set and is never the same thing as
/// [`ALL_PATHS`].
///
/// `PathSet` is `Copy` and all operations are pure bitwise computations.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PathSet(u8);

impl PathSet {
  /// No path at all.
  pub const NONE: Self = Self(0);

  /// Minimal standalone implementation, used to check the others against.
  ///
  /// Bypasses almost all of the machinery the optimized paths share.
  pub const REFERENCE: Self = Self(0x1);

  /// Portable implementation of the architecture-specific parts.
  ///
  /// Structurally identical to the optimized paths, so it exercises the same
  /// blocking and packing logic. Fallback when no SIMD path is available.
  pub const PORTABLE: Self = Self(0x2);

  /// Create a set from raw bits.
  ///
  /// Bits that name no path on this target are kept as-is; they take part in
  /// the set algebra like any other bit.
  #[inline]
  #[must_use]
  pub const fn from_bits(bits: u8) -> Self {
    Self(bits)
  }

  /// Raw bits of the set.
  #[inline]
  #[must_use]
  pub const fn bits(self) -> u8 {
    self.0
  }

  /// Union of two sets.
  #[inline]
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  /// Intersection of two sets.
  #[inline]
  #[must_use]
  pub const fn intersection(self, other: Self) -> Self {
    Self(self.0 & other.0)
  }

  /// Symmetric difference of two sets.
  #[inline]
  #[must_use]
  pub const fn symmetric_difference(self, other: Self) -> Self {
    Self(self.0 ^ other.0)
  }

  /// Complement within the 8-bit representation.
  #[inline]
  #[must_use]
  pub const fn complement(self) -> Self {
    Self(!self.0)
  }

  /// Check if every path in `other` is also in `self`.
  #[inline(always)]
  #[must_use]
  pub const fn contains(self, other: Self) -> bool {
    (self.0 & other.0) == other.0
  }

  #[inline]
  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }

  /// True when the set names exactly one path.
  #[inline]
  #[must_use]
  pub const fn is_single(self) -> bool {
    self.0.is_power_of_two()
  }

  /// Number of paths in the set.
  #[inline]
  #[must_use]
  pub const fn count(self) -> u32 {
    self.0.count_ones()
  }

  /// The highest-priority path in the set.
  ///
  /// Returns the highest set bit: within each architecture's enumeration a
  /// higher bit is a more specialized path, so this is the one to run.
  ///
  /// The empty set maps to [`PathSet::NONE`]. Callers are expected to
  /// intersect with a set that always contains a universal path, so an
  /// empty input means a dispatch bug upstream.
  ///
  /// # Example
  ///
  /// ```
  /// use paths::PathSet;
  ///
  /// let set = PathSet::REFERENCE | PathSet::PORTABLE;
  /// assert_eq!(set.most_significant(), PathSet::PORTABLE);
  /// assert_eq!(PathSet::NONE.most_significant(), PathSet::NONE);
  /// ```
  #[inline]
  #[must_use]
  pub const fn most_significant(self) -> Self {
    Self(round_down_pot(self.0))
  }

  /// Iterate over the single-path members, lowest bit first.
  #[inline]
  pub const fn iter(self) -> Iter {
    Iter { remaining: self.0 }
  }

  /// Name of a single path, or `None` for sets and unknown bits.
  #[must_use]
  pub const fn name(self) -> Option<&'static str> {
    match self.0 {
      0x1 => Some("reference"),
      0x2 => Some("portable"),
      #[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
      0x4 => Some("neon"),
      #[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
      0x8 => Some("neon_dotprod"),
      #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
      0x4 => Some("sse42"),
      #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
      0x8 => Some("avx2"),
      #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
      0x10 => Some("avx512"),
      #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
      0x20 => Some("avx_vnni"),
      _ => None,
    }
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// ARM Paths (bits 2-3)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
impl PathSet {
  /// Widely available subset of NEON.
  pub const NEON: Self = Self(0x4);
  /// NEON plus the dot-product instructions of newer cores.
  pub const NEON_DOTPROD: Self = Self(0x8);
}

// ─────────────────────────────────────────────────────────────────────────────
// x86 Paths (bits 2-5)
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
impl PathSet {
  /// SSE 4.2 kernels. Block dimensions are still provisional.
  pub const SSE42: Self = Self(0x4);
  pub const AVX2: Self = Self(0x8);
  /// AVX-512 F+DQ+CD+BW+VL.
  pub const AVX512: Self = Self(0x10);
  /// AVX-512 VNNI kernels. Block dimensions are still provisional.
  pub const AVX_VNNI: Self = Self(0x20);
}

// ─────────────────────────────────────────────────────────────────────────────
// Operators
// ─────────────────────────────────────────────────────────────────────────────

impl core::ops::BitOr for PathSet {
  type Output = Self;

  #[inline]
  fn bitor(self, rhs: Self) -> Self::Output {
    self.union(rhs)
  }
}

impl core::ops::BitAnd for PathSet {
  type Output = Self;

  #[inline]
  fn bitand(self, rhs: Self) -> Self::Output {
    self.intersection(rhs)
  }
}

impl core::ops::BitXor for PathSet {
  type Output = Self;

  #[inline]
  fn bitxor(self, rhs: Self) -> Self::Output {
    self.symmetric_difference(rhs)
  }
}

impl core::ops::Not for PathSet {
  type Output = Self;

  #[inline]
  fn not(self) -> Self::Output {
    self.complement()
  }
}

impl core::ops::BitOrAssign for PathSet {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    *self = self.union(rhs);
  }
}

impl core::ops::BitAndAssign for PathSet {
  #[inline]
  fn bitand_assign(&mut self, rhs: Self) {
    *self = self.intersection(rhs);
  }
}

impl IntoIterator for PathSet {
  type Item = PathSet;
  type IntoIter = Iter;

  #[inline]
  fn into_iter(self) -> Iter {
    self.iter()
  }
}

/// Iterator over the single-path members of a [`PathSet`].
#[derive(Clone, Debug)]
pub struct Iter {
  remaining: u8,
}

impl Iterator for Iter {
  type Item = PathSet;

  #[inline]
  fn next(&mut self) -> Option<PathSet> {
    if self.remaining == 0 {
      return None;
    }
    let lowest = self.remaining & self.remaining.wrapping_neg();
    self.remaining &= !lowest;
    Some(PathSet(lowest))
  }

  #[inline]
  fn size_hint(&self) -> (usize, Option<usize>) {
    let n = self.remaining.count_ones() as usize;
    (n, Some(n))
  }
}

impl ExactSizeIterator for Iter {}

// ─────────────────────────────────────────────────────────────────────────────
// Formatting
// ─────────────────────────────────────────────────────────────────────────────

/// Renders `reference|portable|avx2`; unnamed bits print as hex.
impl fmt::Display for PathSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_empty() {
      return f.write_str("none");
    }
    for (i, path) in self.iter().enumerate() {
      if i > 0 {
        f.write_str("|")?;
      }
      match path.name() {
        Some(name) => f.write_str(name)?,
        None => write!(f, "{:#x}", path.0)?,
      }
    }
    Ok(())
  }
}

impl fmt::Debug for PathSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "PathSet({self})")
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// All Paths (per target)
// ─────────────────────────────────────────────────────────────────────────────
//
// Dot-product detection needs the Linux auxiliary vector, so NEON_DOTPROD is
// only part of the table on Linux/Android.

const UNIVERSAL: PathSet = PathSet::REFERENCE.union(PathSet::PORTABLE);

/// Every path that makes sense on the current target.
///
/// This is the starting set a dispatcher intersects with the paths the
/// running CPU supports.
#[cfg(all(target_arch = "aarch64", any(target_os = "linux", target_os = "android")))]
pub const ALL_PATHS: PathSet = UNIVERSAL.union(PathSet::NEON).union(PathSet::NEON_DOTPROD);

/// Every path that makes sense on the current target.
#[cfg(all(target_arch = "aarch64", not(any(target_os = "linux", target_os = "android"))))]
pub const ALL_PATHS: PathSet = UNIVERSAL.union(PathSet::NEON);

/// Every path that makes sense on the current target.
#[cfg(all(target_arch = "arm", target_feature = "neon"))]
pub const ALL_PATHS: PathSet = UNIVERSAL.union(PathSet::NEON);

/// Every path that makes sense on the current target.
#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
pub const ALL_PATHS: PathSet = UNIVERSAL
  .union(PathSet::SSE42)
  .union(PathSet::AVX2)
  .union(PathSet::AVX512)
  .union(PathSet::AVX_VNNI);

/// Every path that makes sense on the current target.
#[cfg(not(any(
  target_arch = "aarch64",
  all(target_arch = "arm", target_feature = "neon"),
  target_arch = "x86",
  target_arch = "x86_64"
)))]
pub const ALL_PATHS: PathSet = UNIVERSAL;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────


// ─────────────────────────────────────────────────────────────────────────────
// Property-Based Tests (proptest)
// Note: proptest uses filesystem for failure persistence, which Miri doesn't support.
// ─────────────────────────────────────────────────────────────────────────────
