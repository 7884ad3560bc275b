//! The [`CpuInfo`] oracle.
//!
//! # Lifecycle
//!
//! ```text
//! NotYetAttempted ──first query──> Initialized   (provider initialized, sizes aggregated)
//!                         └──────> Failed        (provider failed; never retried)
//! ```
//!
//! The transition happens once, inside a mutex scoped to the oracle, so two
//! threads racing on the first query never both initialize the provider and
//! never see half-written cache sizes. Contended callers block on the mutex;
//! nothing spins or retries.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
  aggregate::aggregate,
  cache_sizes::CacheSizes,
  features::{Features, arm, x86},
  provider::{NativeProvider, Provider},
};

/// Initialization state of a [`CpuInfo`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum InitStatus {
  #[default]
  NotYetAttempted,
  Initialized,
  Failed,
}

struct Inner<P> {
  status: InitStatus,
  cache_sizes: CacheSizes,
  provider: P,
}

/// Lazily initialized CPU feature and cache-size oracle.
///
/// Construct one and hand it to whatever needs capability queries; there is
/// no hidden global instance. `CpuInfo` is `Sync` when its provider is
/// `Send`, so it can be shared behind an `Arc` or a `static`.
///
/// Every query triggers initialization on first use. Failure is sticky and
/// silent: features report `false` and cache sizes report
/// [`CacheSizes::DUMMY`].
pub struct CpuInfo<P: Provider = NativeProvider> {
  inner: Mutex<Inner<P>>,
}

impl CpuInfo<NativeProvider> {
  /// Oracle over this target's native provider.
  #[must_use]
  pub fn new() -> Self {
    Self::with_provider(NativeProvider::default())
  }
}

impl Default for CpuInfo<NativeProvider> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P: Provider> CpuInfo<P> {
  /// Oracle over an explicit provider. The provider is not touched until the
  /// first query.
  #[must_use]
  pub fn with_provider(provider: P) -> Self {
    Self {
      inner: Mutex::new(Inner {
        status: InitStatus::NotYetAttempted,
        cache_sizes: CacheSizes::default(),
        provider,
      }),
    }
  }

  /// Current initialization state. Does not trigger initialization.
  #[must_use]
  pub fn status(&self) -> InitStatus {
    if !P::AVAILABLE {
      return InitStatus::NotYetAttempted;
    }
    self.lock().status
  }

  /// Initialize on first call; report whether the provider is usable.
  ///
  /// Idempotent: the provider's `initialize` runs at most once per oracle,
  /// and every call returns what the first one did.
  pub fn ensure_initialized(&self) -> bool {
    if !P::AVAILABLE {
      return false;
    }
    Self::ensure(&mut self.lock())
  }

  /// Aggregated cache sizes, or [`CacheSizes::DUMMY`] if detection failed.
  #[must_use]
  pub fn cache_sizes(&self) -> CacheSizes {
    if !P::AVAILABLE {
      return Self::dummy_cache_sizes();
    }
    let mut inner = self.lock();
    if Self::ensure(&mut inner) {
      inner.cache_sizes
    } else {
      Self::dummy_cache_sizes()
    }
  }

  /// The values [`cache_sizes`](Self::cache_sizes) falls back to.
  #[inline]
  #[must_use]
  pub const fn dummy_cache_sizes() -> CacheSizes {
    CacheSizes::DUMMY
  }

  /// NEON dot-product instructions.
  #[must_use]
  pub fn neon_dotprod(&self) -> bool {
    self.has(arm::NEON_DOTPROD)
  }

  #[must_use]
  pub fn sse42(&self) -> bool {
    self.has(x86::SSE42)
  }

  #[must_use]
  pub fn avx2(&self) -> bool {
    self.has(x86::AVX2)
  }

  /// AVX-512 F, DQ, CD, BW and VL, all together. Partial AVX-512 is `false`.
  #[must_use]
  pub fn avx512(&self) -> bool {
    self.has(x86::AVX512_READY)
  }

  /// AVX-512 VNNI.
  #[must_use]
  pub fn avx_vnni(&self) -> bool {
    self.has(x86::AVX512VNNI)
  }

  fn has(&self, required: Features) -> bool {
    if !P::AVAILABLE {
      return false;
    }
    let mut inner = self.lock();
    Self::ensure(&mut inner) && inner.provider.features().has(required)
  }

  fn lock(&self) -> MutexGuard<'_, Inner<P>> {
    // A panic mid-initialization has already left the status `Failed`.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn ensure(inner: &mut Inner<P>) -> bool {
    if inner.status == InitStatus::NotYetAttempted {
      // Stays `Failed` if anything below unwinds, so the provider is never
      // initialized twice.
      inner.status = InitStatus::Failed;
      inner.status = Self::initialize(inner);
    }
    inner.status == InitStatus::Initialized
  }

  #[cold]
  fn initialize(inner: &mut Inner<P>) -> InitStatus {
    if !inner.provider.initialize() {
      return InitStatus::Failed;
    }
    let guard = DeinitGuard {
      provider: &mut inner.provider,
      armed: true,
    };
    let sizes = aggregate(&*guard.provider);
    guard.finish(sizes, &mut inner.cache_sizes)
  }
}

/// Deinitializes a freshly initialized provider unless aggregation succeeds,
/// including when aggregation unwinds.
struct DeinitGuard<'a, P: Provider> {
  provider: &'a mut P,
  armed: bool,
}

impl<P: Provider> DeinitGuard<'_, P> {
  fn finish(mut self, sizes: Option<CacheSizes>, slot: &mut CacheSizes) -> InitStatus {
    let Some(sizes) = sizes else {
      return InitStatus::Failed;
    };
    log::debug!(
      "cpuinfo: {} processors, {sizes}, features {:?}",
      self.provider.processor_count(),
      self.provider.features()
    );
    *slot = sizes;
    self.armed = false;
    InitStatus::Initialized
  }
}

impl<P: Provider> Drop for DeinitGuard<'_, P> {
  fn drop(&mut self) {
    if self.armed {
      self.provider.deinitialize();
    }
  }
}

impl<P: Provider> Drop for CpuInfo<P> {
  fn drop(&mut self) {
    let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
    if inner.status == InitStatus::Initialized {
      inner.provider.deinitialize();
    }
  }
}

impl<P: Provider> core::fmt::Debug for CpuInfo<P> {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("CpuInfo").field("status", &self.status()).finish_non_exhaustive()
  }
}
