//! Cache-size aggregation over a provider's topology.
//!
//! Per processor, walk L1d -> L2 -> L3 (absent levels skipped, not
//! terminating). A cache is *local* when the first and last processors it
//! covers sit on the same physical core. The processor's local size is the
//! outermost local cache; its last-level size is the outermost cache of any
//! locality. Across processors, keep the minimum of each, so tiling stays safe
//! on the most constrained core of a heterogeneous topology.

use crate::{
  cache_sizes::CacheSizes,
  provider::{Cache, Processor, Provider},
};

/// Aggregate cache sizes over every processor of an initialized provider.
///
/// Returns `None` when the topology is unusable (no processors, or nothing
/// but zero sizes). Debug builds treat self-contradictory topologies as
/// provider bugs and panic.
pub(crate) fn aggregate<P: Provider + ?Sized>(provider: &P) -> Option<CacheSizes> {
  let count = provider.processor_count();
  debug_assert!(count > 0, "provider reported {count} processors");
  let lookup = |index: usize| provider.processor(index);

  let mut overall: Option<CacheSizes> = None;
  for index in 0..count {
    let processor = provider.processor(index);
    debug_assert!(processor.is_some(), "provider has no descriptor for processor {index}");
    let Some(processor) = processor else {
      continue;
    };

    let sizes = processor_cache_sizes(&lookup, &processor);
    debug_assert!(sizes.local > 0, "processor {index}: local cache size is 0");
    debug_assert!(sizes.last_level > 0, "processor {index}: last-level cache size is 0");
    debug_assert!(
      sizes.last_level >= sizes.local,
      "processor {index}: last-level {} < local {}",
      sizes.last_level,
      sizes.local
    );

    overall = Some(match overall {
      None => sizes,
      Some(acc) => CacheSizes::new(acc.local.min(sizes.local), acc.last_level.min(sizes.last_level)),
    });
  }

  overall.filter(|sizes| sizes.local > 0 && sizes.last_level > 0)
}

/// True when [`aggregate`] over `processors` would hold every invariant:
/// at least one processor, and for each a positive local size no larger than
/// its positive last-level size.
///
/// Providers run this over a freshly read topology before committing to it.
#[cfg_attr(
  not(any(target_os = "linux", target_os = "android", target_arch = "x86_64")),
  allow(dead_code)
)]
pub(crate) fn is_consistent(processors: &[Processor]) -> bool {
  let lookup = |index: usize| processors.get(index).copied();
  let in_range = |cache: &Cache| cache.processor_end().is_some_and(|end| end < processors.len());
  !processors.is_empty()
    && processors.iter().all(|processor| {
      processor.data_caches().iter().flatten().all(|cache| in_range(cache)) && {
        let sizes = processor_cache_sizes(&lookup, processor);
        sizes.local > 0 && sizes.last_level >= sizes.local
      }
    })
}

/// `count` single-threaded cores, each with a private L1d of
/// [`CacheSizes::DUMMY`]'s local size, under one L2 of its last-level size.
///
/// Stands in for a topology the platform would not describe, so a provider
/// can still report features. Aggregates to [`CacheSizes::DUMMY`] for two or
/// more processors; a lone processor sees its L2 as local.
#[cfg_attr(
  not(any(target_os = "linux", target_os = "android", target_arch = "x86_64")),
  allow(dead_code)
)]
pub(crate) fn fallback_topology(count: usize) -> Vec<Processor> {
  let count = count.max(1);
  (0..count)
    .map(|core| {
      Processor::new(core)
        .with_l1d(Cache::new(CacheSizes::DUMMY.local, core, 1))
        .with_l2(Cache::new(CacheSizes::DUMMY.last_level, 0, count))
    })
    .collect()
}

/// Local and last-level sizes of one processor.
fn processor_cache_sizes<F>(lookup: &F, processor: &Processor) -> CacheSizes
where
  F: Fn(usize) -> Option<Processor>,
{
  let mut local = 0;
  let mut last_level = 0;
  for cache in processor.data_caches().into_iter().flatten() {
    if is_local(lookup, &cache) {
      local = cache.size;
    }
    last_level = cache.size;
  }
  // Every level shared: the last level is as local as it gets.
  if local == 0 {
    local = last_level;
  }
  CacheSizes::new(local, last_level)
}

/// True when every processor sharing `cache` is on one physical core.
fn is_local<F>(lookup: &F, cache: &Cache) -> bool
where
  F: Fn(usize) -> Option<Processor>,
{
  debug_assert!(cache.processor_count > 0, "cache of {} bytes covers no processors", cache.size);
  let first = lookup(cache.processor_start);
  let last = cache.processor_end().and_then(lookup);
  debug_assert!(
    first.is_some() && last.is_some(),
    "cache covers {} processors from {} outside the topology",
    cache.processor_count,
    cache.processor_start
  );
  match (first, last) {
    (Some(first), Some(last)) => first.core == last.core,
    _ => false,
  }
}
