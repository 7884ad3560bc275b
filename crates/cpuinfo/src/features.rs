//! SIMD feature flags reported by a [`Provider`](crate::Provider).
//!
//! [`Features`] is a 64-bit bitset. Each bit is one ISA extension the
//! oracle's feature groups are built from. Providers fill it in once; the
//! oracle only ever asks `has()`.
//!
//! # Bit Layout
//!
//! - Bits 0-31: x86/x86_64 features
//! - Bits 32-63: ARM features
//!
//! # Usage
//!
//! ```
//! use cpuinfo::features::{Features, x86};
//!
//! let f = x86::AVX2 | x86::SSE42;
//! assert!(f.has(x86::AVX2));
//! assert!(!f.has(x86::AVX512_READY));
//! ```

use core::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Core Feature Type
// ─────────────────────────────────────────────────────────────────────────────

/// A set of SIMD features.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Features(u64);

impl Features {
  /// Empty feature set.
  pub const NONE: Self = Self(0);

  /// Create a feature set with a single bit set.
  #[inline]
  #[must_use]
  pub const fn bit(bit: u8) -> Self {
    Self(1u64 << (bit % 64))
  }

  /// Create a feature set from a raw word.
  #[inline]
  #[must_use]
  pub const fn from_raw(word: u64) -> Self {
    Self(word)
  }

  #[inline]
  #[must_use]
  pub const fn as_raw(self) -> u64 {
    self.0
  }

  /// Check if all features in `required` are present.
  ///
  /// A combined mask passes only when every one of its bits is present.
  #[inline(always)]
  #[must_use]
  pub const fn has(self, required: Self) -> bool {
    (self.0 & required.0) == required.0
  }

  #[inline]
  #[must_use]
  pub const fn union(self, other: Self) -> Self {
    Self(self.0 | other.0)
  }

  #[inline]
  #[must_use]
  pub const fn intersection(self, other: Self) -> Self {
    Self(self.0 & other.0)
  }

  /// Remove every feature in `other`.
  #[inline]
  #[must_use]
  pub const fn difference(self, other: Self) -> Self {
    Self(self.0 & !other.0)
  }

  #[inline]
  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }

  #[inline]
  #[must_use]
  pub const fn count(self) -> u32 {
    self.0.count_ones()
  }
}

impl core::ops::BitOr for Features {
  type Output = Self;

  #[inline]
  fn bitor(self, rhs: Self) -> Self::Output {
    self.union(rhs)
  }
}

impl core::ops::BitAnd for Features {
  type Output = Self;

  #[inline]
  fn bitand(self, rhs: Self) -> Self::Output {
    self.intersection(rhs)
  }
}

impl core::ops::BitOrAssign for Features {
  #[inline]
  fn bitor_assign(&mut self, rhs: Self) {
    *self = self.union(rhs);
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// x86/x86_64 Features (bits 0-31)
// ─────────────────────────────────────────────────────────────────────────────

/// x86/x86_64 features.
pub mod x86 {
  use super::Features;

  pub const SSE42: Features = Features::bit(0);
  pub const AVX2: Features = Features::bit(1);

  // ─── AVX-512 Foundation ───
  pub const AVX512F: Features = Features::bit(2);
  pub const AVX512DQ: Features = Features::bit(3);
  pub const AVX512CD: Features = Features::bit(4);
  pub const AVX512BW: Features = Features::bit(5);
  pub const AVX512VL: Features = Features::bit(6);

  pub const AVX512VNNI: Features = Features::bit(7);

  // ─── Combined Masks ───

  /// AVX-512 group: F + DQ + CD + BW + VL, all required.
  pub const AVX512_READY: Features = AVX512F.union(AVX512DQ).union(AVX512CD).union(AVX512BW).union(AVX512VL);
}

// ─────────────────────────────────────────────────────────────────────────────
// ARM Features (bits 32-63)
// ─────────────────────────────────────────────────────────────────────────────

/// ARM features.
pub mod arm {
  use super::Features;

  /// NEON dot-product instructions (`sdot`/`udot`).
  pub const NEON_DOTPROD: Features = Features::bit(32);
}

// ─────────────────────────────────────────────────────────────────────────────
// Feature Name Lookup (for diagnostics)
// ─────────────────────────────────────────────────────────────────────────────

const NAMES: &[(Features, &str)] = &[
  (x86::SSE42, "sse4.2"),
  (x86::AVX2, "avx2"),
  (x86::AVX512F, "avx512f"),
  (x86::AVX512DQ, "avx512dq"),
  (x86::AVX512CD, "avx512cd"),
  (x86::AVX512BW, "avx512bw"),
  (x86::AVX512VL, "avx512vl"),
  (x86::AVX512VNNI, "avx512vnni"),
  (arm::NEON_DOTPROD, "dotprod"),
];

/// Iterate over the names of the features present in `features`.
pub fn names(features: Features) -> impl Iterator<Item = &'static str> {
  NAMES
    .iter()
    .filter(move |(bit, _)| features.has(*bit))
    .map(|(_, name)| *name)
}

impl fmt::Debug for Features {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(names(*self)).finish()
  }
}
