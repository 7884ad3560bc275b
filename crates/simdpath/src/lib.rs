//! SIMD kernel path selection.
//!
//! Ties together the two halves of kernel dispatch:
//!
//! - [`paths`]: which implementation paths exist and how they are ranked
//! - [`cpuinfo`]: what this CPU supports and how large its caches are
//!
//! A kernel is compiled for some [`PathSet`]; [`PathSelector::select_path`]
//! intersects it with the paths enabled at runtime and returns the most
//! specialized survivor.
//!
//! # Main Entry Point
//!
//! ```
//! use simdpath::{ALL_PATHS, PathSelector, PathSet};
//!
//! let selector = PathSelector::new();
//! let path = selector.select_path(ALL_PATHS);
//! assert!(path.is_single());
//!
//! // Tiling decisions use the same oracle.
//! let caches = selector.cpuinfo().cache_sizes();
//! assert!(caches.last_level >= caches.local);
//! ```
//!
//! # Configuration
//!
//! | Variable         | Effect                                                   |
//! |------------------|----------------------------------------------------------|
//! | `SIMDPATH_PATHS` | Hex [`PathSet`] replacing detection (`0x3` = universal only) |
//!
//! Detection events are reported through the [`log`] facade.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]

mod config;
mod selector;

pub use config::{PATHS_ENV, PathsEnvError, parse_paths};
pub use cpuinfo::{self, CacheSizes, CpuInfo};
pub use paths::{self, ALL_PATHS, PathSet};
pub use selector::PathSelector;
