//! Oracle lifecycle against instrumented providers.
//!
//! These tests pin down the at-most-once contract: a provider is initialized
//! at most once per oracle, even under concurrent first queries, and
//! deinitialized on drop only when that initialization succeeded.

use std::{
  panic::{AssertUnwindSafe, catch_unwind},
  sync::{
    Arc, Barrier,
    atomic::{AtomicUsize, Ordering},
  },
  thread,
};

use cpuinfo::{Cache, CacheSizes, CpuInfo, Features, InitStatus, Processor, Provider, features::x86};

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

// ─────────────────────────────────────────────────────────────────────────────
// Counting Provider
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Counters {
  initialize: AtomicUsize,
  deinitialize: AtomicUsize,
}

struct CountingProvider {
  counters: Arc<Counters>,
  processors: Vec<Processor>,
  features: Features,
  succeed: bool,
  panic_on_initialize: bool,
}

impl CountingProvider {
  fn new(counters: &Arc<Counters>, succeed: bool) -> Self {
    let processors = (0..2)
      .map(|i| {
        Processor::new(i)
          .with_l1d(Cache::new(32 * KIB, i, 1))
          .with_l2(Cache::new(256 * KIB, i, 1))
          .with_l3(Cache::new(2 * MIB, 0, 2))
      })
      .collect();
    Self {
      counters: Arc::clone(counters),
      processors,
      features: x86::SSE42 | x86::AVX2,
      succeed,
      panic_on_initialize: false,
    }
  }

  /// One processor without caches: aggregation cannot produce sizes.
  fn cacheless(counters: &Arc<Counters>) -> Self {
    Self {
      processors: vec![Processor::new(0)],
      ..Self::new(counters, true)
    }
  }

  fn panicking(counters: &Arc<Counters>) -> Self {
    Self {
      panic_on_initialize: true,
      ..Self::new(counters, true)
    }
  }
}

impl Provider for CountingProvider {
  fn initialize(&mut self) -> bool {
    self.counters.initialize.fetch_add(1, Ordering::SeqCst);
    assert!(!self.panic_on_initialize, "provider initialize panicked");
    self.succeed
  }

  fn deinitialize(&mut self) {
    self.counters.deinitialize.fetch_add(1, Ordering::SeqCst);
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

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn construction_does_not_initialize() {
  let counters = Arc::new(Counters::default());
  let cpuinfo = CpuInfo::with_provider(CountingProvider::new(&counters, true));
  assert_eq!(cpuinfo.status(), InitStatus::NotYetAttempted);
  drop(cpuinfo);
  assert_eq!(counters.initialize.load(Ordering::SeqCst), 0);
  assert_eq!(counters.deinitialize.load(Ordering::SeqCst), 0);
}

#[test]
fn repeated_queries_initialize_once() {
  let counters = Arc::new(Counters::default());
  let cpuinfo = CpuInfo::with_provider(CountingProvider::new(&counters, true));

  assert!(cpuinfo.sse42());
  assert!(cpuinfo.avx2());
  assert!(!cpuinfo.avx512());
  assert_eq!(cpuinfo.cache_sizes(), CacheSizes::new(256 * KIB, 2 * MIB));
  assert!(cpuinfo.ensure_initialized());

  assert_eq!(counters.initialize.load(Ordering::SeqCst), 1);
  drop(cpuinfo);
  assert_eq!(counters.deinitialize.load(Ordering::SeqCst), 1);
}

#[test]
fn failure_is_sticky_and_not_deinitialized() {
  let counters = Arc::new(Counters::default());
  let cpuinfo = CpuInfo::with_provider(CountingProvider::new(&counters, false));

  assert!(!cpuinfo.ensure_initialized());
  assert!(!cpuinfo.ensure_initialized());
  assert!(!cpuinfo.sse42());
  assert_eq!(cpuinfo.cache_sizes(), CpuInfo::<CountingProvider>::dummy_cache_sizes());
  assert_eq!(cpuinfo.status(), InitStatus::Failed);

  assert_eq!(counters.initialize.load(Ordering::SeqCst), 1);
  drop(cpuinfo);
  assert_eq!(counters.deinitialize.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_first_queries_initialize_once() {
  const THREADS: usize = 8;

  let counters = Arc::new(Counters::default());
  let cpuinfo = Arc::new(CpuInfo::with_provider(CountingProvider::new(&counters, true)));
  let barrier = Arc::new(Barrier::new(THREADS));

  let handles: Vec<_> = (0..THREADS)
    .map(|i| {
      let cpuinfo = Arc::clone(&cpuinfo);
      let barrier = Arc::clone(&barrier);
      thread::spawn(move || {
        barrier.wait();
        if i % 2 == 0 {
          (cpuinfo.avx2(), cpuinfo.cache_sizes())
        } else {
          let sizes = cpuinfo.cache_sizes();
          (cpuinfo.avx2(), sizes)
        }
      })
    })
    .collect();

  for handle in handles {
    let (avx2, sizes) = handle.join().unwrap();
    assert!(avx2);
    assert_eq!(sizes, CacheSizes::new(256 * KIB, 2 * MIB));
  }
  assert_eq!(counters.initialize.load(Ordering::SeqCst), 1);

  let cpuinfo = Arc::try_unwrap(cpuinfo).ok().unwrap();
  drop(cpuinfo);
  assert_eq!(counters.deinitialize.load(Ordering::SeqCst), 1);
}

#[test]
fn unusable_topology_is_not_retried() {
  let counters = Arc::new(Counters::default());
  let cpuinfo = CpuInfo::with_provider(CountingProvider::cacheless(&counters));

  // Debug builds panic on the contract violation; release builds fail quietly.
  let first = catch_unwind(AssertUnwindSafe(|| cpuinfo.ensure_initialized()));
  let second = catch_unwind(AssertUnwindSafe(|| cpuinfo.ensure_initialized()));
  assert!(!first.unwrap_or(false));
  assert_eq!(second.ok(), Some(false));

  assert_eq!(cpuinfo.status(), InitStatus::Failed);
  assert_eq!(cpuinfo.cache_sizes(), CacheSizes::DUMMY);
  assert_eq!(counters.initialize.load(Ordering::SeqCst), 1);
  assert_eq!(counters.deinitialize.load(Ordering::SeqCst), 1);
  drop(cpuinfo);
  assert_eq!(counters.deinitialize.load(Ordering::SeqCst), 1);
}

#[test]
fn panicking_provider_is_not_retried() {
  let counters = Arc::new(Counters::default());
  let cpuinfo = CpuInfo::with_provider(CountingProvider::panicking(&counters));

  assert!(catch_unwind(AssertUnwindSafe(|| cpuinfo.avx2())).is_err());
  assert_eq!(catch_unwind(AssertUnwindSafe(|| cpuinfo.avx2())).ok(), Some(false));

  assert_eq!(cpuinfo.status(), InitStatus::Failed);
  assert_eq!(counters.initialize.load(Ordering::SeqCst), 1);
  drop(cpuinfo);
  assert_eq!(counters.deinitialize.load(Ordering::SeqCst), 0);
}

#[test]
fn shared_through_a_static() {
  use std::sync::LazyLock;

  static SHARED: LazyLock<CpuInfo<cpuinfo::StaticProvider>> = LazyLock::new(|| {
    let processors = vec![Processor::new(0).with_l1d(Cache::new(64 * KIB, 0, 1))];
    CpuInfo::with_provider(cpuinfo::StaticProvider::new(processors, x86::AVX512_READY))
  });

  assert!(SHARED.avx512());
  assert!(!SHARED.avx_vnni());
  assert_eq!(SHARED.cache_sizes(), CacheSizes::new(64 * KIB, 64 * KIB));
}
