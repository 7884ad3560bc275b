//! Runtime path selection.

use std::sync::OnceLock;

use cpuinfo::{CpuInfo, NativeProvider, Provider};
use paths::{ALL_PATHS, PathSet};

use crate::config::paths_from_env;

/// Chooses which compiled path runs on this machine.
///
/// Owns the [`CpuInfo`] oracle it asks about SIMD support. The set of
/// runtime-enabled paths is resolved once, on first use, from
/// `SIMDPATH_PATHS` or from detection over [`ALL_PATHS`].
///
/// # Example
///
/// ```
/// use simdpath::{PathSelector, PathSet};
///
/// let selector = PathSelector::new();
/// // A kernel compiled with only the universal paths always resolves to the portable one.
/// let compiled = PathSet::REFERENCE | PathSet::PORTABLE;
/// assert_eq!(selector.select_path(compiled), PathSet::PORTABLE);
/// ```
pub struct PathSelector<P: Provider = NativeProvider> {
  cpuinfo: CpuInfo<P>,
  runtime_enabled: OnceLock<PathSet>,
}

impl PathSelector<NativeProvider> {
  /// Selector over the native CPU oracle.
  #[must_use]
  pub fn new() -> Self {
    Self::with_cpuinfo(CpuInfo::new())
  }
}

impl Default for PathSelector<NativeProvider> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P: Provider> PathSelector<P> {
  #[must_use]
  pub fn with_cpuinfo(cpuinfo: CpuInfo<P>) -> Self {
    Self {
      cpuinfo,
      runtime_enabled: OnceLock::new(),
    }
  }

  /// The oracle behind this selector, for cache-size queries.
  #[inline]
  #[must_use]
  pub fn cpuinfo(&self) -> &CpuInfo<P> {
    &self.cpuinfo
  }

  /// Paths among `candidates` this CPU can run, plus the universal ones.
  ///
  /// The oracle is only consulted for bits present in `candidates`.
  #[must_use]
  pub fn detect_supported_paths(&self, candidates: PathSet) -> PathSet {
    PathSet::REFERENCE | PathSet::PORTABLE | self.arch_paths(candidates)
  }

  #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
  fn arch_paths(&self, candidates: PathSet) -> PathSet {
    let mut paths = PathSet::NONE;
    if candidates.contains(PathSet::SSE42) && self.cpuinfo.sse42() {
      paths |= PathSet::SSE42;
    }
    if candidates.contains(PathSet::AVX2) && self.cpuinfo.avx2() {
      paths |= PathSet::AVX2;
    }
    if candidates.contains(PathSet::AVX512) && self.cpuinfo.avx512() {
      paths |= PathSet::AVX512;
    }
    if candidates.contains(PathSet::AVX_VNNI) && self.cpuinfo.avx_vnni() {
      paths |= PathSet::AVX_VNNI;
    }
    paths
  }

  #[cfg(any(target_arch = "arm", target_arch = "aarch64"))]
  fn arch_paths(&self, candidates: PathSet) -> PathSet {
    // NEON needs no runtime check wherever it is compiled in.
    let neon = cfg!(any(target_arch = "aarch64", target_feature = "neon"));
    let mut paths = PathSet::NONE;
    if neon && candidates.contains(PathSet::NEON) {
      paths |= PathSet::NEON;
    }
    if candidates.contains(PathSet::NEON_DOTPROD) && self.cpuinfo.neon_dotprod() {
      paths |= PathSet::NEON_DOTPROD;
    }
    paths
  }

  #[cfg(not(any(
    target_arch = "x86",
    target_arch = "x86_64",
    target_arch = "arm",
    target_arch = "aarch64"
  )))]
  fn arch_paths(&self, _candidates: PathSet) -> PathSet {
    PathSet::NONE
  }

  /// Paths allowed to run, resolved on first call.
  pub fn runtime_enabled_paths(&self) -> PathSet {
    *self.runtime_enabled.get_or_init(|| match paths_from_env() {
      Some(paths) => paths,
      None => self.detect_supported_paths(ALL_PATHS),
    })
  }

  /// Pin the runtime-enabled paths.
  ///
  /// [`PathSet::NONE`] drops any pin, so the next query detects again.
  pub fn set_runtime_enabled_paths(&mut self, paths: PathSet) {
    self.runtime_enabled = if paths.is_empty() {
      OnceLock::new()
    } else {
      OnceLock::from(paths)
    };
  }

  /// The single path to run among `compiled`.
  ///
  /// [`PathSet::NONE`] when nothing compiled is enabled, which cannot happen
  /// for a `compiled` set that includes a universal path.
  #[must_use]
  pub fn select_path(&self, compiled: PathSet) -> PathSet {
    (compiled & self.runtime_enabled_paths()).most_significant()
  }
}

impl<P: Provider> core::fmt::Debug for PathSelector<P> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PathSelector")
      .field("cpuinfo", &self.cpuinfo)
      .field("runtime_enabled", &self.runtime_enabled.get())
      .finish()
  }
}
