//! Implementation paths for SIMD kernel dispatch.
//!
//! A *path* is one architecture-targeted implementation of a computation.
//! Paths are single bits; OR-ing them forms a [`PathSet`], read as "compile
//! all of these, decide at runtime which one runs".
//!
//! # Core Types
//!
//! - [`PathSet`]: bitmask of paths with set algebra (`|`, `&`, `^`, `!`)
//! - [`ALL_PATHS`]: every path that makes sense for this build target
//!
//! # Resolution
//!
//! ```
//! use paths::{ALL_PATHS, PathSet};
//!
//! // Whatever the runtime reports as supported...
//! let supported = PathSet::REFERENCE | PathSet::PORTABLE;
//! // ...intersected with what was compiled, resolved to one path.
//! let selected = (ALL_PATHS & supported).most_significant();
//! assert_eq!(selected, PathSet::PORTABLE);
//! ```
//!
//! # Bit Layout
//!
//! Bits 0 and 1 are the universal paths ([`PathSet::REFERENCE`] and
//! [`PathSet::PORTABLE`]). Higher bits are architecture-local: on ARM bit 2
//! is NEON, on x86 bit 2 is SSE 4.2. Only one architecture's bits exist in a
//! given build, so the overlap is never observable.
//!
//! Within an architecture, bit order follows specialization: the numerically
//! highest supported bit is always the fastest path, which is why
//! [`PathSet::most_significant`] is the whole priority rule.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::indexing_slicing))]
#![no_std]

// ─────────────────────────────────────────────────────────────────────────────
// Core modules
// ─────────────────────────────────────────────────────────────────────────────

mod bits;
mod path_set;

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

pub use path_set::{ALL_PATHS, Iter, PathSet};
