//! Aggregated data-cache sizes.

use core::fmt;

/// Data-cache sizes in bytes, each the minimum over all cores.
///
/// Both fields are `0` when unset, meaning "unknown". The oracle never hands
/// out unset values: it returns either real aggregates or [`CacheSizes::DUMMY`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CacheSizes {
  /// Size of the outermost cache level private to a single core.
  ///
  /// If L1 and L2 are per-core and L3 is shared, this is the L2 size.
  pub local: usize,
  /// Size of the outermost cache level, shared or not.
  ///
  /// If L1 and L2 are per-core and L3 is shared, this is the L3 size.
  pub last_level: usize,
}

impl CacheSizes {
  /// Conservative values for when detection is unavailable or failed.
  ///
  /// 32 KiB local, 512 KiB last-level: representative of low-end hardware,
  /// so tiling decisions made with them stay safe everywhere.
  pub const DUMMY: Self = Self {
    local: 32 * 1024,
    last_level: 512 * 1024,
  };

  #[inline]
  #[must_use]
  pub const fn new(local: usize, last_level: usize) -> Self {
    Self { local, last_level }
  }

  /// True when neither field has been set.
  #[inline]
  #[must_use]
  pub const fn is_unknown(&self) -> bool {
    self.local == 0 && self.last_level == 0
  }
}

impl fmt::Display for CacheSizes {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "local={}K last_level={}K", self.local / 1024, self.last_level / 1024)
  }
}
