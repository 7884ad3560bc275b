//! CPUID cache-topology provider for x86_64.
//!
//! Cache descriptors come from the deterministic cache parameter leaf: leaf 4
//! on Intel, `0x8000_001D` on AMD parts with TOPOEXT. CPUID only describes the
//! calling processor, so the topology is synthesized from it:
//!
//! - every logical processor has the same caches
//! - SMT siblings are numbered next to each other (`smt` wide)
//! - a cache shared by `k` logical processors covers `k` consecutive indices
//!
//! The sharing counts are the leaf's "maximum addressable IDs", which can
//! round the real thread count up to a power of two. Only sizes and locality
//! feed the aggregation, and neither changes with that rounding.

use core::arch::x86_64::{__cpuid_count, CpuidResult};

use crate::{
  aggregate,
  features::Features,
  provider::{Cache, Processor, Provider},
};

/// Sub-leaves walked before giving up on a terminating null descriptor.
const MAX_SUBLEAVES: u32 = 16;

// Cache type field (EAX[4:0]) of the cache parameter leaves.
const TYPE_NULL: u32 = 0;
const TYPE_INSTRUCTION: u32 = 2;

// ─────────────────────────────────────────────────────────────────────────────
// Provider
// ─────────────────────────────────────────────────────────────────────────────

/// Provider reading cache parameters from CPUID.
///
/// The native provider on x86_64 targets without sysfs. When CPUID describes
/// no usable data caches, initialization still succeeds over
/// [`CacheSizes::DUMMY`](crate::CacheSizes::DUMMY)-sized caches so the
/// feature answers stay available.
#[derive(Clone, Debug, Default)]
pub struct CpuidProvider {
  processors: Vec<Processor>,
  features: Features,
}

impl CpuidProvider {
  #[must_use]
  pub const fn new() -> Self {
    Self {
      processors: Vec::new(),
      features: Features::NONE,
    }
  }
}

impl Provider for CpuidProvider {
  fn initialize(&mut self) -> bool {
    self.processors = read_topology().unwrap_or_else(|| {
      log::debug!("cpuinfo: CPUID describes no usable data caches, assuming defaults");
      aggregate::fallback_topology(available_processors())
    });
    self.features = crate::detect::detect();
    true
  }

  fn deinitialize(&mut self) {
    self.processors = Vec::new();
    self.features = Features::NONE;
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

fn available_processors() -> usize {
  std::thread::available_parallelism().map_or(1, core::num::NonZeroUsize::get)
}

// ─────────────────────────────────────────────────────────────────────────────
// Topology
// ─────────────────────────────────────────────────────────────────────────────

/// One descriptor of a deterministic cache parameter leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CacheLeaf {
  kind: u32,
  level: u32,
  size: usize,
  /// Logical processors sharing this cache, at least 1.
  sharing: usize,
}

/// The synthesized topology of this machine, if CPUID describes one that
/// aggregates cleanly.
pub(crate) fn read_topology() -> Option<Vec<Processor>> {
  let ids = LeafIds::query();
  let leaves = ids.cache_leaves();
  let processors = synthesize(&leaves, ids.smt_width());
  aggregate::is_consistent(&processors).then_some(processors)
}

/// Which optional leaves this CPU implements.
struct LeafIds {
  max_basic: u32,
  max_extended: u32,
  topoext: bool,
}

impl LeafIds {
  fn query() -> Self {
    let max_basic = cpuid(0, 0).eax;
    let max_extended = cpuid(0x8000_0000, 0).eax;
    let topoext = max_extended >= 0x8000_0001 && cpuid(0x8000_0001, 0).ecx & (1 << 22) != 0;
    Self {
      max_basic,
      max_extended,
      topoext,
    }
  }

  fn cache_leaves(&self) -> Vec<CacheLeaf> {
    let leaf = if self.topoext && self.max_extended >= 0x8000_001D {
      0x8000_001D
    } else if self.max_basic >= 4 {
      4
    } else {
      return Vec::new();
    };
    (0..MAX_SUBLEAVES)
      .map(|subleaf| decode(cpuid(leaf, subleaf)))
      .take_while(|cache| cache.kind != TYPE_NULL)
      .collect()
  }

  /// Logical processors per core.
  fn smt_width(&self) -> usize {
    if self.max_basic >= 0xB {
      let width = cpuid(0xB, 0).ebx & 0xFFFF;
      if width > 0 {
        return width as usize;
      }
    }
    if self.topoext && self.max_extended >= 0x8000_001E {
      return ((cpuid(0x8000_001E, 0).ebx >> 8) & 0xFF) as usize + 1;
    }
    1
  }
}

#[allow(unused_unsafe)]
#[inline]
fn cpuid(leaf: u32, subleaf: u32) -> CpuidResult {
  // SAFETY: CPUID is always available on x86_64
  unsafe { __cpuid_count(leaf, subleaf) }
}

fn decode(regs: CpuidResult) -> CacheLeaf {
  let line = (regs.ebx & 0xFFF) as usize + 1;
  let partitions = ((regs.ebx >> 12) & 0x3FF) as usize + 1;
  let ways = ((regs.ebx >> 22) & 0x3FF) as usize + 1;
  let sets = regs.ecx as usize + 1;
  let size = [partitions, ways, sets]
    .into_iter()
    .try_fold(line, usize::checked_mul)
    .unwrap_or(0);
  CacheLeaf {
    kind: regs.eax & 0x1F,
    level: (regs.eax >> 5) & 0x7,
    size,
    sharing: ((regs.eax >> 14) & 0xFFF) as usize + 1,
  }
}

/// Lay out identical processors, `smt` per core, each covered by every data
/// or unified cache in `leaves`. The first descriptor of a level wins.
fn synthesize(leaves: &[CacheLeaf], smt: usize) -> Vec<Processor> {
  let smt = smt.max(1);
  let data: Vec<&CacheLeaf> = leaves
    .iter()
    .filter(|cache| cache.kind != TYPE_INSTRUCTION && cache.size > 0)
    .collect();
  let logical = data.iter().map(|cache| cache.sharing).max().unwrap_or(1).max(smt);

  (0..logical)
    .map(|index| {
      let mut processor = Processor::new(index / smt);
      for cache in &data {
        let start = index - index % cache.sharing;
        let covered = Cache::new(cache.size, start, cache.sharing.min(logical - start));
        let slot = match cache.level {
          1 => &mut processor.l1d,
          2 => &mut processor.l2,
          3 => &mut processor.l3,
          4 => &mut processor.l4,
          _ => continue,
        };
        if slot.is_none() {
          *slot = Some(covered);
        }
      }
      processor
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{aggregate::aggregate, cache_sizes::CacheSizes, provider::StaticProvider};

  const KIB: usize = 1024;
  const MIB: usize = 1024 * 1024;

  /// Raw registers of a cache descriptor with 64-byte lines and one partition.
  fn regs(kind: u32, level: u32, ways: u32, sets: u32, sharing: u32) -> CpuidResult {
    CpuidResult {
      eax: kind | (level << 5) | ((sharing - 1) << 14),
      ebx: 63 | ((ways - 1) << 22),
      ecx: sets - 1,
      edx: 0,
    }
  }

  fn leaf(kind: u32, level: u32, size: usize, sharing: usize) -> CacheLeaf {
    CacheLeaf {
      kind,
      level,
      size,
      sharing,
    }
  }

  fn sizes(processors: Vec<Processor>) -> Option<CacheSizes> {
    aggregate(&StaticProvider::new(processors, Features::NONE))
  }

  #[test]
  fn decodes_l1d() {
    // 8 ways * 64 sets * 64-byte lines, shared by 2 SMT threads.
    assert_eq!(decode(regs(1, 1, 8, 64, 2)), leaf(1, 1, 32 * KIB, 2));
  }

  #[test]
  fn decodes_shared_l3() {
    // 16 ways * 16384 sets * 64-byte lines.
    assert_eq!(decode(regs(3, 3, 16, 16384, 32)), leaf(3, 3, 16 * MIB, 32));
  }

  #[test]
  fn decodes_terminator() {
    let end = CpuidResult {
      eax: 0,
      ebx: 0,
      ecx: 0,
      edx: 0,
    };
    assert_eq!(decode(end).kind, TYPE_NULL);
  }

  #[test]
  fn decode_saturates_impossible_sizes() {
    let huge = CpuidResult {
      eax: 3 | (3 << 5),
      ebx: u32::MAX,
      ecx: u32::MAX,
      edx: 0,
    };
    assert_eq!(decode(huge).size, 0);
  }

  #[test]
  fn smt_machine() {
    // Two threads per core share L1d/L2; eight threads share the L3.
    let leaves = [
      leaf(1, 1, 48 * KIB, 2),
      leaf(TYPE_INSTRUCTION, 1, 32 * KIB, 2),
      leaf(3, 2, 2 * MIB, 2),
      leaf(3, 3, 24 * MIB, 8),
    ];
    let processors = synthesize(&leaves, 2);
    assert_eq!(processors.len(), 8);
    assert_eq!(processors[5].core, 2);
    assert_eq!(processors[5].l1d, Some(Cache::new(48 * KIB, 4, 2)));
    assert_eq!(processors[5].l3, Some(Cache::new(24 * MIB, 0, 8)));
    assert!(aggregate::is_consistent(&processors));
    assert_eq!(sizes(processors), Some(CacheSizes::new(2 * MIB, 24 * MIB)));
  }

  #[test]
  fn cluster_shared_l2() {
    // Four single-threaded cores per L2 cluster, two clusters under one L3.
    let leaves = [leaf(1, 1, 32 * KIB, 1), leaf(3, 2, 4 * MIB, 4), leaf(3, 3, 30 * MIB, 8)];
    let processors = synthesize(&leaves, 1);
    assert_eq!(processors.len(), 8);
    assert_eq!(processors[6].l2, Some(Cache::new(4 * MIB, 4, 4)));
    assert_eq!(sizes(processors), Some(CacheSizes::new(32 * KIB, 30 * MIB)));
  }

  #[test]
  fn first_descriptor_of_a_level_wins() {
    let leaves = [leaf(1, 1, 48 * KIB, 1), leaf(1, 1, 64 * KIB, 1)];
    let processors = synthesize(&leaves, 1);
    assert_eq!(processors[0].l1d, Some(Cache::new(48 * KIB, 0, 1)));
  }

  #[test]
  fn no_data_caches_is_inconsistent() {
    let processors = synthesize(&[leaf(TYPE_INSTRUCTION, 1, 32 * KIB, 1)], 2);
    assert_eq!(processors.len(), 2);
    assert!(!aggregate::is_consistent(&processors));
    assert!(!aggregate::is_consistent(&synthesize(&[], 1)));
  }

  #[test]
  #[cfg(not(miri))]
  fn provider_always_initializes() {
    let mut provider = CpuidProvider::new();
    assert!(provider.initialize());
    assert!(provider.processor_count() > 0);
    assert!(aggregate(&provider).is_some());
    assert_eq!(provider.features(), crate::detect::detect());
    provider.deinitialize();
    assert_eq!(provider.processor_count(), 0);
  }
}
