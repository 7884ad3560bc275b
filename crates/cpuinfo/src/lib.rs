//! CPU feature and cache-topology oracle.
//!
//! Answers two questions for kernel selection and tiling:
//!
//! - "does this processor support SIMD feature group F?"
//! - "how large are this processor's local and last-level data caches?"
//!
//! # Core Types
//!
//! - [`CpuInfo`]: the oracle. Initializes its [`Provider`] lazily, at most once.
//! - [`CacheSizes`]: the aggregated cache snapshot.
//! - [`Provider`]: the detection backend the oracle queries.
//!
//! # Main Entry Point
//!
//! ```
//! use cpuinfo::CpuInfo;
//!
//! let cpuinfo = CpuInfo::new();
//! let sizes = cpuinfo.cache_sizes();
//! assert!(sizes.last_level >= sizes.local);
//!
//! if cpuinfo.avx2() {
//!     // AVX2 kernels are safe to run
//! }
//! ```
//!
//! # Degradation
//!
//! Detection never fails loudly. When no native provider exists for the
//! target, or the provider fails to initialize, every feature query answers
//! `false` and [`CpuInfo::cache_sizes`] returns [`CacheSizes::DUMMY`].
//!
//! # Providers
//!
//! - [`NativeProvider`]: sysfs + auxv/CPUID on Linux and Android, CPUID on
//!   other x86_64 targets, [`Unavailable`] elsewhere
//! - [`StaticProvider`]: a fixed topology, for known deployments and tests

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]

// ─────────────────────────────────────────────────────────────────────────────
// Core modules
// ─────────────────────────────────────────────────────────────────────────────

mod aggregate;
mod cache_sizes;
pub mod features;
mod oracle;
pub mod provider;

// ─────────────────────────────────────────────────────────────────────────────
// Native providers
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(any(target_os = "linux", target_os = "android", target_arch = "x86_64"))]
mod detect;

#[cfg(any(target_os = "linux", target_os = "android"))]
mod native;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub use native::{SysfsProvider, TopologyError};

#[cfg(target_arch = "x86_64")]
mod cpuid;

#[cfg(target_arch = "x86_64")]
pub use cpuid::CpuidProvider;

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

pub use cache_sizes::CacheSizes;
pub use features::Features;
pub use oracle::{CpuInfo, InitStatus};
pub use provider::{Cache, NativeProvider, Processor, Provider, StaticProvider, Unavailable};
