//! Native provider for Linux and Android.
//!
//! Topology comes from sysfs (`/sys/devices/system/cpu`); SIMD features come
//! from CPUID on x86 and from the ELF auxiliary vector on aarch64. When sysfs
//! lists the CPUs but not a usable set of caches, the topology comes from
//! CPUID on x86_64 and from default sizes elsewhere.

use std::path::PathBuf;

use crate::{
  aggregate, detect,
  features::Features,
  provider::{Processor, Provider},
};

mod sysfs;

pub use sysfs::TopologyError;

/// Default sysfs root for CPU topology.
const SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Provider reading the CPU topology from sysfs.
///
/// [`initialize`](Provider::initialize) reads every online CPU's core id and
/// data caches in one pass and snapshots the SIMD feature set; the queries
/// afterwards are served from memory. It fails only when the CPU list itself
/// cannot be read. Missing or contradictory cache entries are replaced by a
/// fallback topology, and the feature answers are kept.
#[derive(Clone, Debug)]
pub struct SysfsProvider {
  root: PathBuf,
  processors: Vec<Processor>,
  features: Features,
}

impl SysfsProvider {
  /// Provider over the live system's sysfs.
  #[must_use]
  pub fn new() -> Self {
    Self::with_root(SYSFS_CPU_ROOT)
  }

  /// Provider over a sysfs-shaped directory tree rooted at `root`.
  ///
  /// `root` plays the role of `/sys/devices/system/cpu`.
  #[must_use]
  pub fn with_root(root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      processors: Vec::new(),
      features: Features::NONE,
    }
  }
}

impl Default for SysfsProvider {
  fn default() -> Self {
    Self::new()
  }
}

impl Provider for SysfsProvider {
  fn initialize(&mut self) -> bool {
    let processors = match sysfs::read_topology(&self.root) {
      Ok(processors) if aggregate::is_consistent(&processors) => processors,
      Ok(processors) => {
        log::debug!("cpuinfo: sysfs cache topology unusable, falling back");
        fallback_topology(processors.len())
      }
      Err(err) => {
        log::debug!("cpuinfo: sysfs topology unavailable: {err}");
        return false;
      }
    };
    self.processors = processors;
    self.features = detect::detect();
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

/// Topology for `count` online CPUs whose caches sysfs does not describe.
fn fallback_topology(count: usize) -> Vec<Processor> {
  #[cfg(target_arch = "x86_64")]
  {
    if let Some(processors) = crate::cpuid::read_topology() {
      return processors;
    }
  }
  aggregate::fallback_topology(count)
}
