//! Cache-size aggregation seen through the public oracle.

use cpuinfo::{Cache, CacheSizes, CpuInfo, Features, Processor, StaticProvider, features::x86};

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

fn oracle(processors: Vec<Processor>) -> CpuInfo<StaticProvider> {
  CpuInfo::with_provider(StaticProvider::new(processors, Features::NONE))
}

#[test]
fn private_l2_shared_l3() {
  let processors = (0..2)
    .map(|i| {
      Processor::new(i)
        .with_l1d(Cache::new(32 * KIB, i, 1))
        .with_l2(Cache::new(256 * KIB, i, 1))
        .with_l3(Cache::new(2 * MIB, 0, 2))
    })
    .collect();
  assert_eq!(oracle(processors).cache_sizes(), CacheSizes::new(256 * KIB, 2 * MIB));
}

#[test]
fn big_little_uses_the_little_core() {
  // Two big cores with 512K L2 and two little cores sharing one 256K L2.
  let processors = vec![
    Processor::new(0)
      .with_l1d(Cache::new(64 * KIB, 0, 1))
      .with_l2(Cache::new(512 * KIB, 0, 1))
      .with_l3(Cache::new(4 * MIB, 0, 4)),
    Processor::new(1)
      .with_l1d(Cache::new(64 * KIB, 1, 1))
      .with_l2(Cache::new(512 * KIB, 1, 1))
      .with_l3(Cache::new(4 * MIB, 0, 4)),
    Processor::new(2)
      .with_l1d(Cache::new(32 * KIB, 2, 1))
      .with_l2(Cache::new(256 * KIB, 2, 2))
      .with_l3(Cache::new(4 * MIB, 0, 4)),
    Processor::new(3)
      .with_l1d(Cache::new(32 * KIB, 3, 1))
      .with_l2(Cache::new(256 * KIB, 2, 2))
      .with_l3(Cache::new(4 * MIB, 0, 4)),
  ];
  // The little cluster's L2 spans two cores, so its local size is the L1d.
  assert_eq!(oracle(processors).cache_sizes(), CacheSizes::new(32 * KIB, 4 * MIB));
}

#[test]
fn no_local_cache_uses_last_level_for_both() {
  let processors = (0..4)
    .map(|i| Processor::new(i).with_l1d(Cache::new(16 * KIB, 0, 4)).with_l2(Cache::new(MIB, 0, 4)))
    .collect();
  assert_eq!(oracle(processors).cache_sizes(), CacheSizes::new(MIB, MIB));
}

#[test]
fn failed_provider_reports_dummy_and_no_features() {
  let cpuinfo = CpuInfo::with_provider(StaticProvider::failing());
  assert_eq!(cpuinfo.cache_sizes(), CacheSizes::new(32 * KIB, 512 * KIB));
  assert!(!cpuinfo.neon_dotprod());
  assert!(!cpuinfo.sse42());
  assert!(!cpuinfo.avx2());
  assert!(!cpuinfo.avx512());
  assert!(!cpuinfo.avx_vnni());
}

#[test]
fn avx512_is_a_conjunction() {
  let processors = || vec![Processor::new(0).with_l1d(Cache::new(32 * KIB, 0, 1))];
  for missing in [x86::AVX512F, x86::AVX512DQ, x86::AVX512CD, x86::AVX512BW, x86::AVX512VL] {
    let features = x86::AVX512_READY.difference(missing);
    let cpuinfo = CpuInfo::with_provider(StaticProvider::new(processors(), features));
    assert!(!cpuinfo.avx512(), "avx512 reported without {missing:?}");
  }
  let cpuinfo = CpuInfo::with_provider(StaticProvider::new(processors(), x86::AVX512_READY));
  assert!(cpuinfo.avx512());
}
