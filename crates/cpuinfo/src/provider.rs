//! The detection backend behind [`CpuInfo`](crate::CpuInfo).
//!
//! A [`Provider`] exposes per-processor descriptors and a feature set. It has
//! an at-most-once lifecycle: [`Provider::initialize`] is called at most once,
//! and [`Provider::deinitialize`] only after a successful initialize.

use crate::features::Features;

// ─────────────────────────────────────────────────────────────────────────────
// Descriptors
// ─────────────────────────────────────────────────────────────────────────────

/// One cache instance.
///
/// Covers the logical processors `processor_start .. processor_start + processor_count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Cache {
  /// Size in bytes.
  pub size: usize,
  pub processor_start: usize,
  pub processor_count: usize,
}

impl Cache {
  #[inline]
  #[must_use]
  pub const fn new(size: usize, processor_start: usize, processor_count: usize) -> Self {
    Self {
      size,
      processor_start,
      processor_count,
    }
  }

  /// Index of the last processor this cache covers.
  ///
  /// `None` when the cache covers no processors or the range overflows.
  #[inline]
  #[must_use]
  pub const fn processor_end(&self) -> Option<usize> {
    if self.processor_count == 0 {
      return None;
    }
    match self.processor_start.checked_add(self.processor_count - 1) {
      Some(end) => Some(end),
      None => None,
    }
  }
}

/// One logical processor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Processor {
  /// Physical core identifier. Processors with equal `core` are SMT siblings.
  pub core: usize,
  pub l1d: Option<Cache>,
  pub l2: Option<Cache>,
  pub l3: Option<Cache>,
  pub l4: Option<Cache>,
}

impl Processor {
  #[inline]
  #[must_use]
  pub const fn new(core: usize) -> Self {
    Self {
      core,
      l1d: None,
      l2: None,
      l3: None,
      l4: None,
    }
  }

  #[inline]
  #[must_use]
  pub const fn with_l1d(mut self, cache: Cache) -> Self {
    self.l1d = Some(cache);
    self
  }

  #[inline]
  #[must_use]
  pub const fn with_l2(mut self, cache: Cache) -> Self {
    self.l2 = Some(cache);
    self
  }

  #[inline]
  #[must_use]
  pub const fn with_l3(mut self, cache: Cache) -> Self {
    self.l3 = Some(cache);
    self
  }

  #[inline]
  #[must_use]
  pub const fn with_l4(mut self, cache: Cache) -> Self {
    self.l4 = Some(cache);
    self
  }

  /// Data caches from innermost to outermost, L4 excluded.
  ///
  /// An L4, where present, is slower than staying in L3, so it never counts
  /// as last-level.
  #[inline]
  #[must_use]
  pub const fn data_caches(&self) -> [Option<Cache>; 3] {
    [self.l1d, self.l2, self.l3]
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Provider Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Hardware feature and topology source.
pub trait Provider {
  /// `false` for providers that cannot work on this target at all.
  ///
  /// The oracle checks this at compile time and never touches such a provider.
  const AVAILABLE: bool = true;

  /// Acquire whatever the provider needs. Returns `false` on failure.
  fn initialize(&mut self) -> bool;

  /// Release what [`initialize`](Provider::initialize) acquired.
  fn deinitialize(&mut self);

  /// Number of logical processors. Must be positive after initialize.
  fn processor_count(&self) -> usize;

  /// Descriptor of processor `index`, `None` when out of range.
  fn processor(&self, index: usize) -> Option<Processor>;

  /// SIMD features of the machine.
  fn features(&self) -> Features;
}

// ─────────────────────────────────────────────────────────────────────────────
// Unavailable
// ─────────────────────────────────────────────────────────────────────────────

/// Provider for targets without any detection mechanism.
///
/// [`CpuInfo`](crate::CpuInfo) over this provider answers `false` to every
/// query and hands out dummy cache sizes, with no runtime branching.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unavailable;

impl Provider for Unavailable {
  const AVAILABLE: bool = false;

  #[inline]
  fn initialize(&mut self) -> bool {
    false
  }

  #[inline]
  fn deinitialize(&mut self) {}

  #[inline]
  fn processor_count(&self) -> usize {
    0
  }

  #[inline]
  fn processor(&self, _index: usize) -> Option<Processor> {
    None
  }

  #[inline]
  fn features(&self) -> Features {
    Features::NONE
  }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native Provider Selection
// ─────────────────────────────────────────────────────────────────────────────

/// The provider [`CpuInfo::new`](crate::CpuInfo::new) uses on this target.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub type NativeProvider = crate::native::SysfsProvider;

/// The provider [`CpuInfo::new`](crate::CpuInfo::new) uses on this target.
#[cfg(all(target_arch = "x86_64", not(any(target_os = "linux", target_os = "android"))))]
pub type NativeProvider = crate::cpuid::CpuidProvider;

/// The provider [`CpuInfo::new`](crate::CpuInfo::new) uses on this target.
#[cfg(not(any(target_os = "linux", target_os = "android", target_arch = "x86_64")))]
pub type NativeProvider = Unavailable;

// ─────────────────────────────────────────────────────────────────────────────
// Static Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Provider over a fixed, caller-supplied topology.
///
/// Useful where the CPU is known at deployment and runtime detection is not
/// wanted, and for exercising the oracle against synthetic topologies.
///
/// # Example
///
/// ```
/// use cpuinfo::{Cache, CpuInfo, Processor, StaticProvider, features::x86};
///
/// let l1 = Cache::new(32 * 1024, 0, 1);
/// let provider = StaticProvider::new(vec![Processor::new(0).with_l1d(l1)], x86::AVX2);
/// let cpuinfo = CpuInfo::with_provider(provider);
/// assert!(cpuinfo.avx2());
/// assert_eq!(cpuinfo.cache_sizes().local, 32 * 1024);
/// ```
#[derive(Clone, Debug, Default)]
pub struct StaticProvider {
  processors: Vec<Processor>,
  features: Features,
  fail: bool,
  initialized: bool,
}

impl StaticProvider {
  #[must_use]
  pub fn new(processors: Vec<Processor>, features: Features) -> Self {
    Self {
      processors,
      features,
      fail: false,
      initialized: false,
    }
  }

  /// A provider whose initialization always fails.
  #[must_use]
  pub fn failing() -> Self {
    Self {
      fail: true,
      ..Self::default()
    }
  }

  /// True between a successful initialize and the matching deinitialize.
  #[inline]
  #[must_use]
  pub fn is_initialized(&self) -> bool {
    self.initialized
  }
}

impl Provider for StaticProvider {
  fn initialize(&mut self) -> bool {
    self.initialized = !self.fail;
    self.initialized
  }

  fn deinitialize(&mut self) {
    self.initialized = false;
  }

  fn processor_count(&self) -> usize {
    self.processors.len()
  }

  fn processor(&self, index: usize) -> Option<Processor> {
    self.processors.get(index).copied()
  }

  fn features(&self) -> Features {
    self.features
  }
}
