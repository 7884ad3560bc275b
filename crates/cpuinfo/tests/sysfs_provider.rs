//! `SysfsProvider` over fake sysfs trees.

#![cfg(any(target_os = "linux", target_os = "android"))]

use std::{fs, path::Path};

use cpuinfo::{CacheSizes, CpuInfo, InitStatus, Provider, SysfsProvider};

const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

fn write(root: &Path, relative: &str, contents: &str) {
  let path = root.join(relative);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(path, format!("{contents}\n")).unwrap();
}

fn cache(root: &Path, cpu: usize, index: usize, level: u8, kind: &str, size: &str, shared: &str) {
  let dir = format!("cpu{cpu}/cache/index{index}");
  write(root, &format!("{dir}/level"), &level.to_string());
  write(root, &format!("{dir}/type"), kind);
  write(root, &format!("{dir}/size"), size);
  write(root, &format!("{dir}/shared_cpu_list"), shared);
}

/// Four cores without SMT: private L1d/L2, one L3 over all of them.
fn desktop(root: &Path) {
  write(root, "online", "0-3");
  for cpu in 0..4 {
    write(root, &format!("cpu{cpu}/topology/physical_package_id"), "0");
    write(root, &format!("cpu{cpu}/topology/core_id"), &cpu.to_string());
    let own = cpu.to_string();
    cache(root, cpu, 0, 1, "Data", "32K", &own);
    cache(root, cpu, 1, 1, "Instruction", "32K", &own);
    cache(root, cpu, 2, 2, "Unified", "512K", &own);
    cache(root, cpu, 3, 3, "Unified", "16384K", "0-3");
  }
}

#[test]
fn oracle_over_fake_sysfs() {
  let dir = tempfile::tempdir().unwrap();
  desktop(dir.path());

  let cpuinfo = CpuInfo::with_provider(SysfsProvider::with_root(dir.path()));
  assert_eq!(cpuinfo.cache_sizes(), CacheSizes::new(512 * KIB, 16 * MIB));
  assert_eq!(cpuinfo.status(), InitStatus::Initialized);
}

#[test]
fn offline_cpus_are_skipped() {
  let dir = tempfile::tempdir().unwrap();
  desktop(dir.path());
  write(dir.path(), "online", "0,2-3");

  let mut provider = SysfsProvider::with_root(dir.path());
  assert!(provider.initialize());
  assert_eq!(provider.processor_count(), 3);
  // cpu3 is the third online CPU; the shared L3 range "0-3" maps onto positions 0..=2.
  let l3 = provider.processor(2).and_then(|p| p.l3).unwrap();
  assert_eq!((l3.processor_start, l3.processor_count), (0, 3));
  provider.deinitialize();
  assert_eq!(provider.processor_count(), 0);
}

#[test]
fn missing_tree_fails_quietly() {
  let dir = tempfile::tempdir().unwrap();
  let cpuinfo = CpuInfo::with_provider(SysfsProvider::with_root(dir.path().join("absent")));
  assert!(!cpuinfo.ensure_initialized());
  assert_eq!(cpuinfo.status(), InitStatus::Failed);
  assert_eq!(cpuinfo.cache_sizes(), CacheSizes::DUMMY);
  assert!(!cpuinfo.avx2());
}

#[test]
fn smaller_private_l2_is_accepted() {
  // 64K L1d and 32K L2 per core, 8M L3 over both: local is the L2.
  let dir = tempfile::tempdir().unwrap();
  write(dir.path(), "online", "0-1");
  for cpu in 0..2 {
    write(dir.path(), &format!("cpu{cpu}/topology/core_id"), &cpu.to_string());
    let own = cpu.to_string();
    cache(dir.path(), cpu, 0, 1, "Data", "64K", &own);
    cache(dir.path(), cpu, 1, 2, "Unified", "32K", &own);
    cache(dir.path(), cpu, 2, 3, "Unified", "8M", "0-1");
  }

  let cpuinfo = CpuInfo::with_provider(SysfsProvider::with_root(dir.path()));
  assert_eq!(cpuinfo.cache_sizes(), CacheSizes::new(32 * KIB, 8 * MIB));
  assert_eq!(cpuinfo.status(), InitStatus::Initialized);
}

/// Sizes a provider falls back to when sysfs describes no usable caches.
fn fallback_sizes() -> CacheSizes {
  #[cfg(target_arch = "x86_64")]
  let sizes = CpuInfo::with_provider(cpuinfo::CpuidProvider::new()).cache_sizes();
  #[cfg(not(target_arch = "x86_64"))]
  let sizes = CacheSizes::DUMMY;
  sizes
}

#[test]
fn missing_cache_directories_keep_features() {
  // ARM boards and some VMs list CPUs without any cache/ directory.
  let dir = tempfile::tempdir().unwrap();
  write(dir.path(), "online", "0-1");
  for cpu in 0..2 {
    write(dir.path(), &format!("cpu{cpu}/topology/core_id"), &cpu.to_string());
  }

  let cpuinfo = CpuInfo::with_provider(SysfsProvider::with_root(dir.path()));
  assert!(cpuinfo.ensure_initialized());
  assert_eq!(cpuinfo.status(), InitStatus::Initialized);
  assert_eq!(cpuinfo.cache_sizes(), fallback_sizes());
  #[cfg(target_arch = "x86_64")]
  assert_eq!(cpuinfo.avx2(), std::arch::is_x86_feature_detected!("avx2"));
}

#[test]
fn caches_without_sizes_fall_back() {
  // Some virtual machines expose cache directories with no size attribute.
  let dir = tempfile::tempdir().unwrap();
  write(dir.path(), "online", "0-1");
  for cpu in 0..2 {
    write(dir.path(), &format!("cpu{cpu}/cache/index0/level"), "1");
    write(dir.path(), &format!("cpu{cpu}/cache/index0/type"), "Data");
  }

  let mut provider = SysfsProvider::with_root(dir.path());
  assert!(provider.initialize());
  assert!(provider.processor_count() > 0);
  assert!(provider.processor(0).and_then(|p| p.l1d).is_some());
}
